//! # Appliance Orchestrator
//!
//! One loop owns every component and drives them from three sources:
//! coordinator link events, wireless events and the [`TimerQueue`]. Each
//! turn waits for one wake-up, then runs exactly one handler to
//! completion. Handlers never overlap, so components are used without
//! locks.
//!
//! ## Timer Choreography
//!
//! ```text
//! Reconnect ──ok──→ resume link timers ──→ ReplenishTick
//!                                              │
//!                 ┌─────────── Started/Busy ───┤
//!                 ▼                            │ Exhausted + deadline armed
//!          GenerationStep ──Completed──→ ReplenishTick        │
//!            ↺ Progress/Rejected                               ▼
//! RoundDeadline ─────────────────────────────────────→ commit round
//!                                        (finalize, send, restart pipeline)
//!
//! RevealPending ──→ PacketStreamTick (0 ms) + PacketIdleTimeout (2 s)
//! ```
//!
//! Link-bound timers (replenish, generation, deadline) are suspended when
//! the link drops and resumed once a reconnect succeeds.

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use shared_types::{ArtifactKey, DeviceId};

use qr_01_slot_ledger::{ArtifactStore, SharedArtifactStore};
use qr_02_key_manager::{KeyManager, SlotReport};
use qr_03_randomness::{RandomnessPipeline, StepOutcome, TickOutcome};
use qr_04_provisioning::{HandlerOutcome, ProvisioningHandler, ResponseSink, WirelessEvent};
use qr_05_lottery_client::{ClientEvent, LinkEvent, LotteryClient, LotteryClientError};
use qr_06_status_indicator::{StatusIndicator, StatusPhase};

use crate::adapters::{UpdateAgent, UpdateStatus};
use crate::container::Subsystems;
use crate::wiring::timers::{TimerId, TimerQueue};

/// Why the event loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exit {
    /// The shutdown future resolved.
    Shutdown,
    /// A new firmware build is staged and must be started.
    UpdateStaged,
}

enum Wake {
    Link(LinkEvent),
    Wireless(Option<WirelessEvent>),
    Timer,
}

pub struct Appliance {
    device_id: DeviceId,
    store: SharedArtifactStore,
    keys: Arc<KeyManager>,
    pipeline: RandomnessPipeline,
    client: LotteryClient,
    provisioning: ProvisioningHandler,
    responder: Box<dyn ResponseSink>,
    status: StatusIndicator,
    updater: Option<Arc<dyn UpdateAgent>>,
    update_interval: Duration,
    link_events: mpsc::Receiver<LinkEvent>,
    wireless_events: mpsc::Receiver<WirelessEvent>,
    wireless_open: bool,

    timers: TimerQueue,
    /// Secure module unreachable during the last provisioning or signing.
    hardware_fault: bool,
    /// Last connect attempt failed or the link dropped.
    link_failed: bool,
    exit: Option<Exit>,
}

impl Appliance {
    pub fn new(subsystems: Subsystems) -> Self {
        Self {
            device_id: subsystems.device_id,
            store: subsystems.store,
            keys: subsystems.keys,
            pipeline: subsystems.pipeline,
            client: subsystems.client,
            provisioning: subsystems.provisioning,
            responder: subsystems.responder,
            status: subsystems.status,
            updater: subsystems.updater,
            update_interval: subsystems.update_interval,
            link_events: subsystems.link_events,
            wireless_events: subsystems.wireless_events,
            wireless_open: true,
            timers: TimerQueue::new(),
            hardware_fault: false,
            link_failed: false,
            exit: None,
        }
    }

    pub fn timers(&self) -> &TimerQueue {
        &self.timers
    }

    pub fn client(&self) -> &LotteryClient {
        &self.client
    }

    pub fn pipeline(&self) -> &RandomnessPipeline {
        &self.pipeline
    }

    pub fn status_phase(&self) -> Option<StatusPhase> {
        self.status.phase()
    }

    /// Set once the loop has decided to stop.
    pub fn exit(&self) -> Option<Exit> {
        self.exit
    }

    // =========================================================================
    // LIFECYCLE
    // =========================================================================

    /// Startup sequence: version marker, identities, registration
    /// signatures, first connect and update schedule.
    pub async fn bootstrap(&mut self) -> anyhow::Result<()> {
        if !self
            .store
            .exists(ArtifactKey::VersionMarker)
            .context("checking version marker")?
        {
            self.store
                .write(
                    ArtifactKey::VersionMarker,
                    env!("CARGO_PKG_VERSION").as_bytes(),
                )
                .context("writing version marker")?;
        }
        info!(
            version = env!("CARGO_PKG_VERSION"),
            device = %self.device_id,
            "[qr-runtime] starting"
        );
        self.show_phase(StatusPhase::Booting);

        let provisioned = self.keys.provision_all().await;
        self.note_slot_report("provisioning", &provisioned);
        let signed = self.keys.sign_batch(&self.device_id).await;
        self.note_slot_report("registration signing", &signed);

        info!(
            ready = self.pipeline.ledger().ready_slots().len(),
            "[qr-runtime] slot ledger loaded"
        );

        if self.client.coordinator().is_some() {
            self.connect().await;
        } else {
            info!("[qr-runtime] no coordinator configured, waiting for provisioning");
        }

        if self.updater.is_some() {
            self.timers.arm(TimerId::UpdateCheck, Duration::ZERO);
        }
        self.refresh_status();
        Ok(())
    }

    /// Run until `shutdown` resolves or an update is staged.
    pub async fn run<F>(&mut self, shutdown: F) -> Exit
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            if let Some(exit) = self.exit {
                return exit;
            }
            tokio::select! {
                biased;
                _ = &mut shutdown => return Exit::Shutdown,
                _ = self.turn() => {}
            }
        }
    }

    /// Wait for one wake-up and handle it.
    pub async fn turn(&mut self) {
        let wake = tokio::select! {
            Some(event) = self.link_events.recv() => Wake::Link(event),
            event = self.wireless_events.recv(), if self.wireless_open => Wake::Wireless(event),
            _ = self.timers.wait() => Wake::Timer,
        };

        match wake {
            Wake::Link(event) => {
                let events = self.client.on_link_event(event).await;
                for event in events {
                    self.on_client_event(event).await;
                }
            }
            Wake::Wireless(Some(event)) => self.on_wireless_event(event).await,
            Wake::Wireless(None) => {
                warn!("[qr-runtime] wireless reader stopped");
                self.wireless_open = false;
            }
            Wake::Timer => {
                if let Some(id) = self.timers.pop_due(Instant::now()) {
                    self.fire(id).await;
                }
            }
        }
    }

    /// Outputs to their safe state before an abrupt exit.
    pub fn safe_state(&mut self) {
        if let Err(e) = self.status.safe_state() {
            error!(error = %e, "[qr-runtime] failed to set safe outputs");
        }
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    async fn fire(&mut self, id: TimerId) {
        debug!(timer = %id, "[qr-runtime] timer fired");
        match id {
            TimerId::Reconnect => self.connect().await,
            TimerId::ReplenishTick => self.on_replenish_tick().await,
            TimerId::GenerationStep => self.on_generation_step().await,
            TimerId::RoundDeadline => self.commit_round().await,
            TimerId::PacketStreamTick => self.on_stream_tick().await,
            TimerId::PacketIdleTimeout => {
                self.client.cancel_reveal();
                self.timers.cancel(TimerId::PacketStreamTick);
            }
            TimerId::StatusBlink => match self.status.toggle_blink() {
                Ok(Some(period)) => self.timers.arm(TimerId::StatusBlink, period),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "[qr-runtime] status blink failed"),
            },
            TimerId::UpdateCheck => self.check_for_update().await,
        }
    }

    async fn on_replenish_tick(&mut self) {
        match self.pipeline.replenish_tick() {
            TickOutcome::Started(_) | TickOutcome::Busy(_) => {
                self.timers.arm(TimerId::GenerationStep, Duration::ZERO);
            }
            TickOutcome::Exhausted => {
                if self.timers.cancel(TimerId::RoundDeadline) {
                    info!("[qr-runtime] all slots ready before the deadline, committing now");
                    self.commit_round().await;
                }
            }
        }
    }

    async fn on_generation_step(&mut self) {
        let tick_interval = self.pipeline.config().tick_interval;
        match self.pipeline.generation_step().await {
            Ok(StepOutcome::Progress { .. } | StepOutcome::Rejected { .. }) => {
                self.timers.arm(TimerId::GenerationStep, Duration::ZERO);
            }
            Ok(StepOutcome::Completed { .. } | StepOutcome::Idle) => {
                self.timers.arm(TimerId::ReplenishTick, tick_interval);
            }
            Err(e) => {
                let backoff = self.pipeline.config().retry_backoff;
                warn!(
                    error = %e,
                    retry_ms = backoff.as_millis() as u64,
                    "[qr-runtime] generation step failed"
                );
                self.timers.arm(TimerId::GenerationStep, backoff);
            }
        }
    }

    /// Start the pipeline while the link is up, unless one of its timers is
    /// already armed or parked.
    fn kick_pipeline(&mut self) {
        if !self.client.is_connected()
            || TimerId::LINK_BOUND
                .iter()
                .any(|id| self.timers.is_suspended(*id))
        {
            return;
        }
        if !self.timers.is_armed(TimerId::ReplenishTick)
            && !self.timers.is_armed(TimerId::GenerationStep)
        {
            self.timers.arm(TimerId::ReplenishTick, Duration::ZERO);
        }
    }

    /// Finalize the batch, submit the commitment and restart the pipeline
    /// so claimed slots are refilled.
    async fn commit_round(&mut self) {
        self.timers.cancel(TimerId::RoundDeadline);

        match self.pipeline.finalize_batch().await {
            Ok(commitment) => {
                if commitment.is_joining() {
                    self.hardware_fault = false;
                }
                match self
                    .client
                    .send_commitment(commitment.signature.as_deref())
                    .await
                {
                    Ok(entries) => debug!(entries, "[qr-runtime] round committed"),
                    Err(e) => self.on_client_error("commitment", e),
                }
            }
            Err(e) => {
                error!(error = %e, "[qr-runtime] batch finalize failed, skipping commitment");
                if e.is_transport() {
                    self.hardware_fault = true;
                }
            }
        }

        self.kick_pipeline();
        self.refresh_status();
    }

    async fn on_stream_tick(&mut self) {
        match self.client.stream_tick().await {
            Ok(Some(chunk)) if chunk.is_last() => {
                self.timers.cancel(TimerId::PacketIdleTimeout);
            }
            Ok(_) => {}
            Err(e) => self.on_client_error("reveal chunk", e),
        }
    }

    async fn check_for_update(&mut self) {
        let Some(updater) = self.updater.clone() else {
            return;
        };
        match updater.check().await {
            Ok(UpdateStatus::UpToDate) => {
                debug!("[qr-runtime] firmware up to date");
                self.timers.arm(TimerId::UpdateCheck, self.update_interval);
            }
            Ok(UpdateStatus::Staged) => {
                info!("[qr-runtime] firmware update staged, halting");
                self.show_phase(StatusPhase::Updating);
                self.exit = Some(Exit::UpdateStaged);
            }
            Err(e) => {
                warn!(error = %e, "[qr-runtime] update check failed");
                self.timers.arm(TimerId::UpdateCheck, self.update_interval);
            }
        }
    }

    // =========================================================================
    // COORDINATOR LINK
    // =========================================================================

    async fn connect(&mut self) {
        match self.client.connect().await {
            Ok(()) => {
                self.link_failed = false;
                self.timers.cancel(TimerId::Reconnect);
                for id in TimerId::LINK_BOUND {
                    self.timers.resume(id);
                }
                self.kick_pipeline();
            }
            Err(LotteryClientError::NoCoordinator) => {
                debug!("[qr-runtime] connect skipped, no coordinator configured");
            }
            Err(e) => self.on_link_lost(&e.to_string()),
        }
        self.refresh_status();
    }

    fn on_link_lost(&mut self, reason: &str) {
        for id in TimerId::LINK_BOUND {
            self.timers.suspend(id);
        }
        self.timers.cancel(TimerId::PacketStreamTick);
        self.timers.cancel(TimerId::PacketIdleTimeout);

        let retry = self.client.config().reconnect_interval;
        self.timers.arm(TimerId::Reconnect, retry);
        self.link_failed = true;
        warn!(
            reason = %reason,
            retry_secs = retry.as_secs(),
            "[qr-runtime] coordinator unreachable"
        );
        self.refresh_status();
    }

    /// A failed client operation may have taken the link down with it.
    fn on_client_error(&mut self, operation: &str, e: LotteryClientError) {
        warn!(operation, error = %e, "[qr-runtime] coordinator operation failed");
        if !self.client.is_connected() {
            self.on_link_lost(&e.to_string());
        }
    }

    async fn on_client_event(&mut self, event: ClientEvent) {
        match event {
            ClientEvent::Disconnected { reason } => self.on_link_lost(&reason),
            ClientEvent::RoundScheduled { delay } => {
                if self.pipeline.is_exhausted() {
                    info!("[qr-runtime] slots already full, committing now");
                    self.commit_round().await;
                } else {
                    self.timers.arm(TimerId::RoundDeadline, delay);
                }
            }
            ClientEvent::RoundConcluded { delay } => {
                self.timers.cancel(TimerId::ReplenishTick);
                self.timers.cancel(TimerId::GenerationStep);
                if let Err(e) = self.pipeline.begin_new_round() {
                    error!(error = %e, "[qr-runtime] clearing last round failed");
                }
                match delay {
                    Some(delay) => self.timers.arm(TimerId::RoundDeadline, delay),
                    None => {
                        self.timers.cancel(TimerId::RoundDeadline);
                    }
                }
                self.kick_pipeline();
            }
            ClientEvent::RevealPending => {
                let idle = self.client.config().packet_idle_timeout;
                self.timers.arm(TimerId::PacketStreamTick, Duration::ZERO);
                self.timers.arm(TimerId::PacketIdleTimeout, idle);
            }
        }
    }

    // =========================================================================
    // WIRELESS PROVISIONING
    // =========================================================================

    async fn on_wireless_event(&mut self, event: WirelessEvent) {
        match event {
            WirelessEvent::Data(bytes) => {
                let outcomes = self.provisioning.on_bytes(&bytes).await;
                for outcome in outcomes {
                    self.on_provisioning_outcome(outcome).await;
                }
            }
            WirelessEvent::Closed { reason } => {
                debug!(reason = %reason, "[qr-runtime] wireless peer gone");
                self.provisioning.on_closed();
            }
        }
    }

    async fn on_provisioning_outcome(&mut self, outcome: HandlerOutcome) {
        let reply = match outcome {
            HandlerOutcome::Reply(envelope) => envelope,
            HandlerOutcome::ConnectCoordinator { ip } => {
                let connected = self.reconfigure_coordinator(ip).await;
                match ProvisioningHandler::coordinator_reply(connected) {
                    Ok(envelope) => envelope,
                    Err(e) => {
                        warn!(error = %e, "[qr-runtime] coordinator reply not encodable");
                        return;
                    }
                }
            }
        };

        let bytes = match reply.to_vec() {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "[qr-runtime] provisioning reply not encodable");
                return;
            }
        };
        if let Err(e) = self.responder.send(&bytes).await {
            warn!(error = %e, "[qr-runtime] provisioning reply not delivered");
        }
    }

    /// Store the new coordinator, drop the old link and connect now.
    async fn reconfigure_coordinator(&mut self, ip: IpAddr) -> bool {
        if let Err(e) = self.client.set_coordinator(ip).await {
            warn!(%ip, error = %e, "[qr-runtime] storing coordinator address failed");
            return false;
        }
        for id in TimerId::LINK_BOUND {
            self.timers.suspend(id);
        }
        self.timers.cancel(TimerId::PacketStreamTick);
        self.timers.cancel(TimerId::PacketIdleTimeout);

        self.connect().await;
        self.client.is_connected()
    }

    // =========================================================================
    // STATUS
    // =========================================================================

    fn note_slot_report(&mut self, stage: &str, report: &SlotReport) {
        if report.has_transport_failure() {
            self.hardware_fault = true;
        }
        if report.is_clean() {
            debug!(
                stage,
                completed = report.completed.len(),
                "[qr-runtime] slot pass complete"
            );
        } else {
            warn!(
                stage,
                completed = report.completed.len(),
                failed = report.failed.len(),
                "[qr-runtime] slot pass incomplete"
            );
        }
    }

    fn refresh_status(&mut self) {
        if matches!(
            self.status.phase(),
            Some(StatusPhase::Updating | StatusPhase::SafeShutdown)
        ) {
            return;
        }
        let phase = if self.hardware_fault {
            StatusPhase::HardwareFault
        } else if self.client.is_connected() {
            StatusPhase::Online
        } else if self.link_failed {
            StatusPhase::CoordinatorUnreachable
        } else {
            StatusPhase::Booting
        };
        self.show_phase(phase);
    }

    fn show_phase(&mut self, phase: StatusPhase) {
        if self.status.phase() == Some(phase) {
            return;
        }
        match self.status.show(phase) {
            Ok(Some(period)) => self.timers.arm(TimerId::StatusBlink, period),
            Ok(None) => {
                self.timers.cancel(TimerId::StatusBlink);
            }
            Err(e) => warn!(%phase, error = %e, "[qr-runtime] status update failed"),
        }
    }
}
