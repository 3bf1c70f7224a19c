//! # Lottery Client Service
//!
//! Owns the coordinator connection and speaks the round protocol over it.
//! Timers live with the caller: every handler returns [`ClientEvent`]s that
//! say what to schedule next.
//!
//! ```text
//! connect ──→ loginVqr ──resp──→ registerWallet ──resp──→ getLotteryTime
//!                                                              │
//!                                      RoundScheduled ←── resp ┘
//!
//! deadline ──→ lotteryStart          luckyWallet ──→ RoundConcluded
//! lotteryResult (ours) ──→ RevealPending ──tick──→ chunk ... last chunk
//! ```

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use shared_types::{ArtifactKey, DeviceId, Envelope, SlotArtifact, SlotId};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use qr_01_slot_ledger::{ArtifactStore, SharedArtifactStore};

use crate::config::LotteryClientConfig;
use crate::domain::{
    commitment_request, deadline_delay, encode_frame, login_request, parse_round_time,
    register_request, reveal_response, schedule_request, seconds_until, CommitmentEntry,
    FrameDecoder, InboundMessage, LotteryPhase, PacketStreamer, RegisteredWallet, RequestOutcome,
    RevealChunk, StreamerState,
};
use crate::error::{LotteryClientError, LotteryClientResult};
use crate::ports::{ConnectionId, CoordinatorConnector, CoordinatorLink, LinkEvent, WallClock};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected { conn: ConnectionId },
}

/// What the caller should schedule after a client operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// Link lost; retry later.
    Disconnected { reason: String },
    /// Collecting round announced; the commitment is due after `delay`.
    RoundScheduled { delay: Duration },
    /// Round drawn. Claims must be cleared; `delay` is the next
    /// commitment deadline when the announced start time parsed.
    RoundConcluded { delay: Option<Duration> },
    /// A reveal chunk is waiting for the packet-stream tick.
    RevealPending,
}

pub struct LotteryClient {
    config: LotteryClientConfig,
    device_id: DeviceId,
    store: SharedArtifactStore,
    connector: Arc<dyn CoordinatorConnector>,
    clock: Arc<dyn WallClock>,
    events: mpsc::Sender<LinkEvent>,
    link: Option<Box<dyn CoordinatorLink>>,
    state: ConnectionState,
    next_conn: ConnectionId,
    coordinator: Option<IpAddr>,
    decoder: FrameDecoder,
    round_deadline: Option<String>,
    streamer: PacketStreamer,
}

impl LotteryClient {
    /// Build the client, loading the persisted coordinator address.
    pub fn new(
        config: LotteryClientConfig,
        device_id: DeviceId,
        store: SharedArtifactStore,
        connector: Arc<dyn CoordinatorConnector>,
        clock: Arc<dyn WallClock>,
        events: mpsc::Sender<LinkEvent>,
    ) -> LotteryClientResult<Self> {
        let coordinator = match store.read_text(ArtifactKey::CoordinatorAddress)? {
            Some(text) if !text.is_empty() => match text.parse::<IpAddr>() {
                Ok(ip) => Some(ip),
                Err(_) => {
                    warn!(address = %text, "[qr-05] ignoring invalid stored coordinator address");
                    None
                }
            },
            _ => None,
        };

        Ok(Self {
            decoder: FrameDecoder::new(config.max_frame),
            streamer: PacketStreamer::new(config.chunk_chars, config.packet_idle_timeout),
            config,
            device_id,
            store,
            connector,
            clock,
            events,
            link: None,
            state: ConnectionState::Disconnected,
            next_conn: 0,
            coordinator,
            round_deadline: None,
        })
    }

    pub fn config(&self) -> &LotteryClientConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, ConnectionState::Connected { .. })
    }

    pub fn coordinator(&self) -> Option<IpAddr> {
        self.coordinator
    }

    pub fn coordinator_addr(&self) -> Option<SocketAddr> {
        self.coordinator
            .map(|ip| SocketAddr::new(ip, self.config.port))
    }

    /// Deadline text of the current round, as announced.
    pub fn round_deadline(&self) -> Option<&str> {
        self.round_deadline.as_deref()
    }

    pub fn reveal_state(&self) -> StreamerState {
        self.streamer.state()
    }

    /// Persist a new coordinator address. A live link to the old address
    /// is closed; the caller connects again.
    pub async fn set_coordinator(&mut self, ip: IpAddr) -> LotteryClientResult<()> {
        if self.link.is_some() {
            self.drop_link("coordinator reconfigured").await;
        }
        self.store
            .write(ArtifactKey::CoordinatorAddress, ip.to_string().as_bytes())?;
        self.coordinator = Some(ip);
        info!(%ip, "[qr-05] coordinator address stored");
        Ok(())
    }

    /// Open a link to the coordinator and log in.
    pub async fn connect(&mut self) -> LotteryClientResult<()> {
        let addr = self
            .coordinator_addr()
            .ok_or(LotteryClientError::NoCoordinator)?;
        if self.link.is_some() {
            self.drop_link("reconnecting").await;
        }

        self.next_conn += 1;
        let conn = self.next_conn;
        self.state = ConnectionState::Connecting;

        match self
            .connector
            .connect(addr, conn, self.events.clone())
            .await
        {
            Ok(link) => {
                self.link = Some(link);
                self.state = ConnectionState::Connected { conn };
                self.decoder.reset();
                info!(%addr, conn, "[qr-05] connected to coordinator");
            }
            Err(e) => {
                self.state = ConnectionState::Disconnected;
                warn!(%addr, error = %e, "[qr-05] coordinator connect failed");
                return Err(e);
            }
        }

        self.send_login().await
    }

    /// Close the link, if any.
    pub async fn disconnect(&mut self, reason: &str) {
        self.drop_link(reason).await;
    }

    /// Handle traffic forwarded by a link's reader task.
    pub async fn on_link_event(&mut self, event: LinkEvent) -> Vec<ClientEvent> {
        let current = match self.state {
            ConnectionState::Connected { conn } => Some(conn),
            _ => None,
        };

        match event {
            LinkEvent::Data { conn, bytes } => {
                if current != Some(conn) {
                    debug!(conn, "[qr-05] dropping data from stale link");
                    return Vec::new();
                }
                self.on_bytes(&bytes).await
            }
            LinkEvent::Closed { conn, reason } => {
                if current != Some(conn) {
                    return Vec::new();
                }
                warn!(conn, reason = %reason, "[qr-05] coordinator link lost");
                self.drop_link(&reason).await;
                vec![ClientEvent::Disconnected { reason }]
            }
        }
    }

    /// Send the `lotteryStart` commitment for the current round. Slots are
    /// listed when both a wallet and a claimed hash exist.
    pub async fn send_commitment(&mut self, signature: Option<&[u8]>) -> LotteryClientResult<usize> {
        let entries = self.commitment_entries()?;
        let deadline = self.round_deadline.clone().unwrap_or_default();
        let envelope = commitment_request(&self.device_id, &deadline, signature, &entries)?;
        self.send(&envelope).await?;

        info!(
            joining = signature.is_some(),
            entries = entries.len(),
            round = %deadline,
            "[qr-05] commitment sent"
        );
        Ok(entries.len())
    }

    /// Send the pending reveal chunk, if any.
    pub async fn stream_tick(&mut self) -> LotteryClientResult<Option<RevealChunk>> {
        let Some(chunk) = self.streamer.take_pending() else {
            return Ok(None);
        };
        let envelope =
            reveal_response(&chunk.data, chunk.total, chunk.index, &chunk.winner_wallet)?;
        self.send(&envelope).await?;

        if chunk.is_last() {
            info!(slot = chunk.slot.get(), total = chunk.total, "[qr-05] reveal complete");
        } else {
            debug!(index = chunk.index, total = chunk.total, "[qr-05] reveal chunk sent");
        }
        Ok(Some(chunk))
    }

    /// No chunk request arrived within the idle timeout.
    pub fn cancel_reveal(&mut self) -> bool {
        let cancelled = self.streamer.cancel();
        if cancelled {
            info!("[qr-05] reveal session timed out");
        }
        cancelled
    }

    async fn on_bytes(&mut self, bytes: &[u8]) -> Vec<ClientEvent> {
        let mut events = Vec::new();
        for decoded in self.decoder.push(bytes) {
            let message = match decoded.and_then(|envelope| InboundMessage::decode(&envelope)) {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "[qr-05] dropping malformed frame");
                    continue;
                }
            };

            match self.dispatch(message).await {
                Ok(Some(event)) => events.push(event),
                Ok(None) => {}
                Err(e) if e.is_transport() || matches!(e, LotteryClientError::NotConnected) => {
                    events.push(ClientEvent::Disconnected {
                        reason: e.to_string(),
                    });
                    break;
                }
                Err(e) => warn!(error = %e, "[qr-05] message handling failed"),
            }
        }
        events
    }

    async fn dispatch(&mut self, message: InboundMessage) -> LotteryClientResult<Option<ClientEvent>> {
        match message {
            InboundMessage::LoginAccepted => {
                self.send_registration().await?;
                Ok(None)
            }
            InboundMessage::WalletsRegistered => {
                self.send(&schedule_request()?).await?;
                Ok(None)
            }
            InboundMessage::Schedule {
                phase: LotteryPhase::Collecting,
                deadline,
            } => {
                let delay = self.delay_until(&deadline);
                let event = match delay {
                    Some(delay) => {
                        info!(
                            round = %deadline,
                            delay_ms = delay.as_millis() as u64,
                            "[qr-05] round scheduled"
                        );
                        Some(ClientEvent::RoundScheduled { delay })
                    }
                    None => {
                        warn!(round = %deadline, "[qr-05] round deadline unreadable");
                        None
                    }
                };
                self.round_deadline = Some(deadline);
                Ok(event)
            }
            InboundMessage::Schedule {
                phase: LotteryPhase::Other(phase),
                ..
            } => {
                info!(phase = %phase, "[qr-05] round not collecting");
                Ok(None)
            }
            InboundMessage::CommitmentAcknowledged => {
                debug!("[qr-05] commitment acknowledged");
                Ok(None)
            }
            InboundMessage::RoundConcluded {
                winner_wallet,
                next_round_start,
            } => {
                let delay = self.delay_until(&next_round_start);
                info!(
                    winner = %winner_wallet,
                    next_round = %next_round_start,
                    "[qr-05] round concluded"
                );
                self.round_deadline = Some(next_round_start);
                Ok(Some(ClientEvent::RoundConcluded { delay }))
            }
            InboundMessage::RevealRequest {
                winner_wallet,
                current_packet,
                ..
            } => self.on_reveal_request(&winner_wallet, current_packet),
            InboundMessage::Unrecognized { name } => {
                debug!(message = %name, "[qr-05] ignoring unrecognized message");
                Ok(None)
            }
        }
    }

    fn on_reveal_request(
        &mut self,
        winner_wallet: &str,
        current_packet: u32,
    ) -> LotteryClientResult<Option<ClientEvent>> {
        let now = Instant::now();
        if self.streamer.expire_if_idle(now) {
            info!("[qr-05] stale reveal session dropped");
        }

        if !self.streamer.serves(winner_wallet) {
            let Some(slot) = self.winning_slot(winner_wallet)? else {
                debug!(winner = %winner_wallet, "[qr-05] winner is not held here");
                return Ok(None);
            };
            let Some(block) = self
                .store
                .read(ArtifactKey::slot(slot, SlotArtifact::ClaimedRandomBlock))?
            else {
                warn!(slot = slot.get(), "[qr-05] winning slot has no claimed block");
                return Ok(None);
            };
            let total = self
                .streamer
                .begin(slot, winner_wallet, hex::encode(block), now);
            info!(slot = slot.get(), total, "[qr-05] reveal started");
        }

        match self.streamer.request(current_packet.max(1), now) {
            RequestOutcome::Scheduled { .. } => Ok(Some(ClientEvent::RevealPending)),
            RequestOutcome::Ignored => {
                debug!(index = current_packet, "[qr-05] reveal index out of range");
                Ok(None)
            }
        }
    }

    fn winning_slot(&self, winner_wallet: &str) -> LotteryClientResult<Option<SlotId>> {
        for slot in SlotId::all() {
            let wallet = self
                .store
                .read_text(ArtifactKey::slot(slot, SlotArtifact::WalletAddress))?;
            if wallet.is_some_and(|w| !w.is_empty() && w.eq_ignore_ascii_case(winner_wallet)) {
                return Ok(Some(slot));
            }
        }
        Ok(None)
    }

    fn delay_until(&self, deadline: &str) -> Option<Duration> {
        let deadline = parse_round_time(deadline)?;
        let remaining = seconds_until(self.clock.now(), deadline);
        Some(deadline_delay(
            remaining,
            self.config.deadline_lead,
            self.config.deadline_threshold,
        ))
    }

    async fn send_login(&mut self) -> LotteryClientResult<()> {
        let primary = match self.registered_wallet(SlotId::PRIMARY)? {
            Some(wallet) => wallet,
            None => {
                warn!("[qr-05] primary slot has no identity, logging in without one");
                RegisteredWallet {
                    wallet_address: String::new(),
                    public_key: String::new(),
                    signature: String::new(),
                }
            }
        };
        let envelope = login_request(&self.device_id, &primary)?;
        self.send(&envelope).await
    }

    async fn send_registration(&mut self) -> LotteryClientResult<()> {
        let mut wallets = Vec::new();
        for slot in SlotId::all().filter(|slot| !slot.is_primary()) {
            if let Some(wallet) = self.registered_wallet(slot)? {
                wallets.push(wallet);
            }
        }
        let envelope = register_request(&self.device_id, &wallets)?;
        self.send(&envelope).await
    }

    fn registered_wallet(&self, slot: SlotId) -> LotteryClientResult<Option<RegisteredWallet>> {
        let text = |artifact: SlotArtifact| self.store.read_text(ArtifactKey::slot(slot, artifact));
        let (Some(wallet_address), Some(public_key)) = (
            text(SlotArtifact::WalletAddress)?,
            text(SlotArtifact::PublicKey)?,
        ) else {
            return Ok(None);
        };
        let signature = self
            .store
            .read(ArtifactKey::slot(slot, SlotArtifact::RegistrationSignature))?
            .map(hex::encode)
            .unwrap_or_default();

        Ok(Some(RegisteredWallet {
            wallet_address,
            public_key,
            signature,
        }))
    }

    fn commitment_entries(&self) -> LotteryClientResult<Vec<CommitmentEntry>> {
        let mut entries = Vec::new();
        for slot in SlotId::all() {
            let wallet = self
                .store
                .read_text(ArtifactKey::slot(slot, SlotArtifact::WalletAddress))?;
            let hash = self
                .store
                .read_text(ArtifactKey::slot(slot, SlotArtifact::ClaimedBlockHash))?;
            if let (Some(wallet_addr), Some(random_hash)) = (wallet, hash) {
                if !wallet_addr.is_empty() && !random_hash.is_empty() {
                    entries.push(CommitmentEntry {
                        wallet_addr,
                        random_hash,
                    });
                }
            }
        }
        Ok(entries)
    }

    async fn send(&mut self, envelope: &Envelope) -> LotteryClientResult<()> {
        let bytes = encode_frame(envelope)?;
        let link = self.link.as_mut().ok_or(LotteryClientError::NotConnected)?;
        let sent = link.send(&bytes).await;
        if let Err(e) = sent {
            warn!(
                message = %envelope.header.message_name,
                error = %e,
                "[qr-05] send failed, dropping link"
            );
            self.drop_link("send failed").await;
            return Err(e);
        }
        debug!(message = %envelope.header.message_name, "[qr-05] sent");
        Ok(())
    }

    async fn drop_link(&mut self, reason: &str) {
        if let Some(mut link) = self.link.take() {
            link.close().await;
            debug!(reason = %reason, "[qr-05] link closed");
        }
        self.state = ConnectionState::Disconnected;
        self.decoder.reset();
        self.streamer.cancel();
    }
}
