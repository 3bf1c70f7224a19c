use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDateTime};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use shared_types::{ArtifactKey, DeviceId, Envelope, MessageName, SlotArtifact, SlotId, SlotStatus};

use qr_01_slot_ledger::{ArtifactStore, MemoryArtifactStore};
use qr_02_key_manager::adapters::{ModuleProbe, SimulatedSecureModule};
use qr_02_key_manager::KeyManagerConfig;
use qr_03_randomness::adapters::{ScriptedEntropySource, ScriptedEvaluator};
use qr_03_randomness::{PipelineConfig, PipelineState};
use qr_04_provisioning::adapters::{RecordingNetworkConfigurator, RecordingSink};
use qr_04_provisioning::WirelessEvent;
use qr_05_lottery_client::adapters::{FixedClock, MockConnector};
use qr_05_lottery_client::domain::ROUND_TIME_FORMAT;
use qr_05_lottery_client::{LotteryClientConfig, StreamerState};
use qr_06_status_indicator::{LedPins, RecordingGpio, StatusPhase};

use super::*;
use crate::adapters::{ScriptedUpdateAgent, UpdateAgent, UpdateStatus};
use crate::container::{Adapters, ApplianceConfig, Subsystems};

const COORDINATOR: &str = "10.0.0.5";

struct Harness {
    app: Appliance,
    store: Arc<MemoryArtifactStore>,
    coordinator: MockConnector,
    module: ModuleProbe,
    entropy: Arc<ScriptedEntropySource>,
    gpio: RecordingGpio,
    replies: RecordingSink,
    updates: ScriptedUpdateAgent,
    wireless: mpsc::Sender<WirelessEvent>,
}

#[derive(Clone, Copy)]
struct Setup {
    coordinator: Option<&'static str>,
    updates: bool,
    module_available: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            coordinator: Some(COORDINATOR),
            updates: false,
            module_available: true,
        }
    }
}

fn start_time() -> NaiveDateTime {
    NaiveDateTime::parse_from_str("20260314 09:00:00", ROUND_TIME_FORMAT).unwrap()
}

fn round_time(offset_secs: i64) -> String {
    (start_time() + ChronoDuration::seconds(offset_secs))
        .format(ROUND_TIME_FORMAT)
        .to_string()
}

fn slot(n: u8) -> SlotId {
    SlotId::new(n).unwrap()
}

fn test_config() -> ApplianceConfig {
    let mut config = ApplianceConfig::default();
    config.serial.key_manager = KeyManagerConfig::for_testing();
    config.coordinator = LotteryClientConfig::for_testing();
    config.randomness.pipeline = PipelineConfig::for_testing();
    config
}

fn harness_with(setup: Setup) -> Harness {
    let store = Arc::new(MemoryArtifactStore::new());
    if let Some(ip) = setup.coordinator {
        store
            .write(ArtifactKey::CoordinatorAddress, ip.as_bytes())
            .unwrap();
    }
    let (module, probe) = SimulatedSecureModule::new();
    probe.set_available(setup.module_available);
    let coordinator = MockConnector::new();
    let entropy = Arc::new(ScriptedEntropySource::new(16));
    let gpio = RecordingGpio::new();
    let replies = RecordingSink::new();
    let updates = ScriptedUpdateAgent::new();

    let adapters = Adapters {
        store: store.clone(),
        serial: Box::new(module),
        entropy: entropy.clone(),
        evaluator: Arc::new(ScriptedEvaluator::passing()),
        connector: Arc::new(coordinator.clone()),
        clock: Arc::new(FixedClock::new(start_time())),
        network: Arc::new(RecordingNetworkConfigurator::new()),
        gpio: Box::new(gpio.clone()),
        responder: Box::new(replies.clone()),
        updater: setup
            .updates
            .then(|| Arc::new(updates.clone()) as Arc<dyn UpdateAgent>),
    };
    let (subsystems, wireless) = Subsystems::assemble(
        &test_config(),
        DeviceId::new("b8:27:eb:aa:bb:cc"),
        adapters,
    )
    .unwrap();

    Harness {
        app: Appliance::new(subsystems),
        store,
        coordinator,
        module: probe,
        entropy,
        gpio,
        replies,
        updates,
        wireless,
    }
}

async fn booted(setup: Setup) -> Harness {
    let mut h = harness_with(setup);
    h.app.bootstrap().await.unwrap();
    h
}

/// Drive the loop until `duration` of (paused) time has passed.
async fn run_for(app: &mut Appliance, duration: Duration) {
    let _ = tokio::time::timeout(duration, async {
        loop {
            app.turn().await;
        }
    })
    .await;
}

fn response(name: MessageName, body: Value) -> Envelope {
    Envelope::response(name, &body).unwrap()
}

fn wireless_request(name: MessageName, body: Value) -> WirelessEvent {
    WirelessEvent::Data(Envelope::request(name, &body).unwrap().to_vec().unwrap())
}

fn sent_named(h: &Harness, name: &str) -> Vec<Envelope> {
    h.coordinator
        .sent_envelopes()
        .into_iter()
        .filter(|e| e.header.message_name == name)
        .collect()
}

/// Feed the login/registration exchange and a collecting schedule.
async fn schedule_round(h: &Harness, offset_secs: i64) {
    assert!(h.coordinator.deliver(&response(MessageName::LoginVqr, json!({}))).await);
    assert!(h.coordinator.deliver(&response(MessageName::RegisterWallet, json!({}))).await);
    assert!(
        h.coordinator
            .deliver(&response(
                MessageName::GetLotteryTime,
                json!({"lotteryPhase": "COLLECTING", "lotteryTime": round_time(offset_secs)}),
            ))
            .await
    );
}

fn reply_bodies(h: &Harness) -> Vec<Value> {
    h.replies
        .sent()
        .iter()
        .map(|bytes| Envelope::from_slice(bytes).unwrap().body)
        .collect()
}

// =============================================================================
// STARTUP
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_bootstrap_provisions_and_connects() {
    let h = booted(Setup::default()).await;

    assert_eq!(
        h.store.read_text(ArtifactKey::VersionMarker).unwrap().as_deref(),
        Some(env!("CARGO_PKG_VERSION"))
    );
    for n in 1..=10 {
        let key = ArtifactKey::slot(slot(n), SlotArtifact::RegistrationSignature);
        assert!(h.store.exists(key).unwrap(), "slot {} unsigned", n);
    }
    assert!(h.app.client().is_connected());
    assert_eq!(h.coordinator.sent_names(), vec!["loginVqr"]);
    assert_eq!(h.app.status_phase(), Some(StatusPhase::Online));
    assert!(h.app.timers().is_armed(TimerId::ReplenishTick));
    assert!(!h.app.timers().is_armed(TimerId::Reconnect));
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_keeps_existing_version_marker() {
    let h = harness_with(Setup::default());
    h.store.write(ArtifactKey::VersionMarker, b"0.0.1").unwrap();
    let mut app = h.app;

    app.bootstrap().await.unwrap();

    assert_eq!(
        h.store.read_text(ArtifactKey::VersionMarker).unwrap().as_deref(),
        Some("0.0.1")
    );
}

#[tokio::test(start_paused = true)]
async fn test_bootstrap_without_coordinator_waits() {
    let h = booted(Setup {
        coordinator: None,
        ..Setup::default()
    })
    .await;

    assert!(h.coordinator.connect_attempts().is_empty());
    assert_eq!(h.app.status_phase(), Some(StatusPhase::Booting));
    for id in TimerId::LINK_BOUND {
        assert!(!h.app.timers().is_armed(id));
    }
    assert!(!h.app.timers().is_armed(TimerId::Reconnect));
}

#[tokio::test(start_paused = true)]
async fn test_missing_module_shows_hardware_fault() {
    let h = booted(Setup {
        module_available: false,
        ..Setup::default()
    })
    .await;
    let pins = LedPins::default();

    assert_eq!(h.app.status_phase(), Some(StatusPhase::HardwareFault));
    assert!(h.gpio.level(pins.red));
    assert!(!h.gpio.level(pins.green));
    assert!(h.app.timers().is_armed(TimerId::StatusBlink));
    assert!(h.module.signed_digests().is_empty());
}

// =============================================================================
// COORDINATOR LINK
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_connect_failure_arms_reconnect() {
    let mut h = harness_with(Setup::default());
    h.coordinator.set_refusing(true);
    h.app.bootstrap().await.unwrap();

    assert!(h.app.timers().is_armed(TimerId::Reconnect));
    assert_eq!(
        h.app.status_phase(),
        Some(StatusPhase::CoordinatorUnreachable)
    );
    assert!(h.app.timers().is_armed(TimerId::StatusBlink));

    run_for(&mut h.app, Duration::from_millis(4900)).await;
    assert_eq!(h.coordinator.connect_attempts().len(), 1);

    h.coordinator.set_refusing(false);
    run_for(&mut h.app, Duration::from_millis(200)).await;

    assert_eq!(h.coordinator.connect_attempts().len(), 2);
    assert!(h.app.client().is_connected());
    assert!(!h.app.timers().is_armed(TimerId::Reconnect));
    assert_eq!(h.app.status_phase(), Some(StatusPhase::Online));
}

#[tokio::test(start_paused = true)]
async fn test_link_loss_suspends_and_reconnect_resumes_once() {
    let mut h = booted(Setup::default()).await;
    h.entropy.fail_next(100_000);
    run_for(&mut h.app, Duration::from_millis(50)).await;
    assert!(h.app.timers().is_armed(TimerId::GenerationStep));

    assert!(h.coordinator.drop_link("peer reset").await);
    run_for(&mut h.app, Duration::from_secs(1)).await;

    assert!(!h.app.client().is_connected());
    assert!(h.app.timers().is_suspended(TimerId::GenerationStep));
    assert!(!h.app.timers().is_armed(TimerId::GenerationStep));
    assert!(!h.app.timers().is_armed(TimerId::ReplenishTick));
    assert!(h.app.timers().is_armed(TimerId::Reconnect));
    assert_eq!(
        h.app.status_phase(),
        Some(StatusPhase::CoordinatorUnreachable)
    );

    run_for(&mut h.app, Duration::from_secs(5)).await;

    assert!(h.app.client().is_connected());
    assert_eq!(h.coordinator.connect_attempts().len(), 2);
    assert!(h.app.timers().is_armed(TimerId::GenerationStep));
    assert!(!h.app.timers().is_suspended(TimerId::GenerationStep));
    assert!(!h.app.timers().is_armed(TimerId::ReplenishTick));
    assert!(!h.app.timers().is_armed(TimerId::Reconnect));
    assert_eq!(sent_named(&h, "loginVqr").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_send_failure_drops_link_and_retries() {
    let mut h = booted(Setup::default()).await;
    h.coordinator.set_failing_sends(true);

    assert!(h.coordinator.deliver(&response(MessageName::LoginVqr, json!({}))).await);
    run_for(&mut h.app, Duration::from_millis(100)).await;

    assert!(!h.app.client().is_connected());
    assert!(h.app.timers().is_armed(TimerId::Reconnect));
}

#[tokio::test(start_paused = true)]
async fn test_failed_commitment_keeps_pipeline_paused_until_reconnect() {
    let mut h = booted(Setup::default()).await;
    h.entropy.fail_next(100_000);
    run_for(&mut h.app, Duration::from_millis(50)).await;
    assert!(h.app.timers().is_armed(TimerId::GenerationStep));

    assert!(h.coordinator.deliver(&response(MessageName::LoginVqr, json!({}))).await);
    run_for(&mut h.app, Duration::from_millis(10)).await;
    assert!(h.coordinator.deliver(&response(MessageName::RegisterWallet, json!({}))).await);
    run_for(&mut h.app, Duration::from_millis(10)).await;

    // Deadline lands inside the lead time, so the commitment goes out at once.
    h.coordinator.set_failing_sends(true);
    assert!(
        h.coordinator
            .deliver(&response(
                MessageName::GetLotteryTime,
                json!({"lotteryPhase": "COLLECTING", "lotteryTime": round_time(20)}),
            ))
            .await
    );
    run_for(&mut h.app, Duration::from_millis(100)).await;

    assert!(!h.app.client().is_connected());
    assert!(h.app.timers().is_armed(TimerId::Reconnect));
    assert!(!h.app.timers().is_armed(TimerId::ReplenishTick));
    assert!(!h.app.timers().is_armed(TimerId::GenerationStep));
    assert!(!h.app.timers().is_armed(TimerId::RoundDeadline));
    assert!(h.app.timers().is_suspended(TimerId::GenerationStep));

    h.coordinator.set_failing_sends(false);
    run_for(&mut h.app, Duration::from_secs(5)).await;

    assert!(h.app.client().is_connected());
    assert!(!h.app.timers().is_suspended(TimerId::GenerationStep));
    assert!(
        h.app.timers().is_armed(TimerId::GenerationStep)
            || h.app.timers().is_armed(TimerId::ReplenishTick)
    );
}

// =============================================================================
// ROUNDS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_full_slots_commit_as_soon_as_round_is_scheduled() {
    let mut h = booted(Setup::default()).await;
    run_for(&mut h.app, Duration::from_secs(1)).await;
    assert!(h.app.pipeline().is_exhausted());

    schedule_round(&h, 600).await;
    run_for(&mut h.app, Duration::from_millis(100)).await;

    let commitments = sent_named(&h, "lotteryStart");
    assert_eq!(commitments.len(), 1);
    let body = &commitments[0].body;
    assert_eq!(body["isJoin"], "yes");
    assert_eq!(body["lotteryStart"], round_time(600));
    assert_eq!(body["lotteryList"].as_array().unwrap().len(), 10);
    assert!(!body["signature"].as_str().unwrap().is_empty());
    assert!(!h.app.timers().is_armed(TimerId::RoundDeadline));
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_before_deadline_commits_early() {
    let mut h = booted(Setup::default()).await;
    schedule_round(&h, 3600).await;

    run_for(&mut h.app, Duration::from_secs(1)).await;

    let commitments = sent_named(&h, "lotteryStart");
    assert_eq!(commitments.len(), 1);
    assert_eq!(commitments[0].body["isJoin"], "yes");
    assert!(!h.app.timers().is_armed(TimerId::RoundDeadline));
    // Claimed slots were refilled after the commitment.
    assert_eq!(h.app.pipeline().ledger().ready_slots().len(), 10);
}

#[tokio::test(start_paused = true)]
async fn test_generation_in_flight_survives_the_deadline() {
    let mut h = booted(Setup::default()).await;
    h.entropy.fail_next(100_000);
    run_for(&mut h.app, Duration::from_millis(50)).await;
    assert!(matches!(
        h.app.pipeline().state(),
        PipelineState::Generating { slot: s, .. } if s == slot(1)
    ));

    schedule_round(&h, 20).await;
    run_for(&mut h.app, Duration::from_millis(100)).await;

    assert_eq!(sent_named(&h, "lotteryStart").len(), 1);
    assert!(matches!(
        h.app.pipeline().state(),
        PipelineState::Generating { slot: s, .. } if s == slot(1)
    ));
    assert!(h.app.timers().is_armed(TimerId::GenerationStep));
}

#[tokio::test(start_paused = true)]
async fn test_round_deadline_fires_lead_time_before_start() {
    let mut h = booted(Setup::default()).await;
    h.entropy.fail_next(100_000);
    schedule_round(&h, 40).await;

    run_for(&mut h.app, Duration::from_millis(4900)).await;
    assert!(h.app.timers().is_armed(TimerId::RoundDeadline));
    assert!(sent_named(&h, "lotteryStart").is_empty());

    run_for(&mut h.app, Duration::from_millis(200)).await;

    let commitments = sent_named(&h, "lotteryStart");
    assert_eq!(commitments.len(), 1);
    assert_eq!(commitments[0].body["isJoin"], "no");
    assert_eq!(commitments[0].body["signature"], "");
}

#[tokio::test(start_paused = true)]
async fn test_lucky_wallet_clears_claims_and_schedules_next_round() {
    let mut h = booted(Setup::default()).await;
    run_for(&mut h.app, Duration::from_secs(1)).await;
    h.entropy.fail_next(100_000);
    schedule_round(&h, 600).await;
    run_for(&mut h.app, Duration::from_millis(100)).await;
    assert!(h.store.exists(ArtifactKey::BatchSignature).unwrap());

    assert!(
        h.coordinator
            .deliver(&response(
                MessageName::LuckyWallet,
                json!({
                    "walletAddr": "0x0000000000000000000000000000000000000001",
                    "nextLotteryStart": round_time(3600),
                    "lotteryTime": round_time(0),
                }),
            ))
            .await
    );
    run_for(&mut h.app, Duration::from_millis(5)).await;

    for n in 1..=10 {
        for artifact in [SlotArtifact::ClaimedBlockHash, SlotArtifact::ClaimedRandomBlock] {
            assert!(!h.store.exists(ArtifactKey::slot(slot(n), artifact)).unwrap());
        }
        assert_eq!(h.app.pipeline().ledger().status(slot(n)), SlotStatus::Empty);
    }
    assert!(!h.store.exists(ArtifactKey::BatchSignature).unwrap());
    assert!(h.app.timers().is_armed(TimerId::RoundDeadline));
    assert_eq!(h.app.client().round_deadline(), Some(round_time(3600).as_str()));
}

// =============================================================================
// REVEAL
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_reveal_request_streams_and_times_out() {
    let mut h = booted(Setup::default()).await;
    run_for(&mut h.app, Duration::from_secs(1)).await;
    h.entropy.fail_next(100_000);
    schedule_round(&h, 600).await;
    run_for(&mut h.app, Duration::from_millis(100)).await;

    let winner = h
        .store
        .read_text(ArtifactKey::slot(slot(3), SlotArtifact::WalletAddress))
        .unwrap()
        .unwrap();
    let block = h
        .store
        .read(ArtifactKey::slot(slot(3), SlotArtifact::ClaimedRandomBlock))
        .unwrap()
        .unwrap();
    h.coordinator.clear_sent();

    assert!(
        h.coordinator
            .deliver(&response(
                MessageName::LotteryResult,
                json!({"winnerWallet": winner, "totalPackets": 0, "currentPacket": 1}),
            ))
            .await
    );
    run_for(&mut h.app, Duration::from_millis(100)).await;

    let chunks = sent_named(&h, "lotteryResult");
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].body["currentPacket"], 1);
    assert_eq!(chunks[0].body["totalPackets"], 16);
    assert_eq!(chunks[0].body["random"], hex::encode(&block[..4]));
    assert!(h.app.timers().is_armed(TimerId::PacketIdleTimeout));

    run_for(&mut h.app, Duration::from_secs(3)).await;

    assert_eq!(h.app.client().reveal_state(), StreamerState::Idle);
    assert!(!h.app.timers().is_armed(TimerId::PacketIdleTimeout));
    assert_eq!(sent_named(&h, "lotteryResult").len(), 1);
}

// =============================================================================
// WIRELESS PROVISIONING
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_wireless_coordinator_address_connects() {
    let mut h = booted(Setup {
        coordinator: None,
        ..Setup::default()
    })
    .await;

    h.wireless
        .send(wireless_request(
            MessageName::CoordinatorIpConf,
            json!({"ipAddr": "10.0.0.9"}),
        ))
        .await
        .unwrap();
    run_for(&mut h.app, Duration::from_millis(100)).await;

    assert_eq!(
        h.coordinator.connect_attempts(),
        vec!["10.0.0.9:8080".parse::<SocketAddr>().unwrap()]
    );
    assert!(h.app.client().is_connected());
    assert_eq!(
        h.store
            .read_text(ArtifactKey::CoordinatorAddress)
            .unwrap()
            .as_deref(),
        Some("10.0.0.9")
    );
    assert_eq!(reply_bodies(&h), vec![json!({"status": "success"})]);
    assert_eq!(h.app.status_phase(), Some(StatusPhase::Online));
}

#[tokio::test(start_paused = true)]
async fn test_wireless_coordinator_address_reports_failed_connect() {
    let mut h = booted(Setup::default()).await;
    h.coordinator.set_refusing(true);

    h.wireless
        .send(wireless_request(
            MessageName::CoordinatorIpConf,
            json!({"ipAddr": "10.0.0.9"}),
        ))
        .await
        .unwrap();
    run_for(&mut h.app, Duration::from_millis(100)).await;

    assert_eq!(reply_bodies(&h), vec![json!({"status": "fail"})]);
    assert!(h.app.timers().is_armed(TimerId::Reconnect));
    assert_eq!(h.coordinator.closed().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_wireless_wallet_lookup_answers_from_key_manager() {
    let mut h = booted(Setup::default()).await;
    let expected = h
        .store
        .read_text(ArtifactKey::slot(slot(4), SlotArtifact::WalletAddress))
        .unwrap()
        .unwrap();

    h.wireless
        .send(wireless_request(MessageName::WalletAddr, json!({"keyNo": 4})))
        .await
        .unwrap();
    run_for(&mut h.app, Duration::from_millis(100)).await;

    let replies = reply_bodies(&h);
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["status"], "success");
    assert_eq!(replies[0]["walletAddr"], expected.as_str());
}

// =============================================================================
// UPDATES & SHUTDOWN
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_staged_update_halts_loop() {
    let mut h = harness_with(Setup {
        updates: true,
        ..Setup::default()
    });
    h.updates.push(UpdateStatus::Staged);
    h.app.bootstrap().await.unwrap();

    let exit = h.app.run(std::future::pending()).await;

    assert_eq!(exit, Exit::UpdateStaged);
    assert_eq!(h.app.status_phase(), Some(StatusPhase::Updating));
    assert_eq!(h.updates.checks(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_update_check_repeats_on_interval() {
    let mut h = harness_with(Setup {
        updates: true,
        ..Setup::default()
    });
    h.updates.push_failure();
    h.app.bootstrap().await.unwrap();

    run_for(&mut h.app, Duration::from_secs(10)).await;
    assert_eq!(h.updates.checks(), 1);
    assert!(h.app.timers().is_armed(TimerId::UpdateCheck));

    run_for(&mut h.app, Duration::from_secs(24 * 60 * 60)).await;
    assert_eq!(h.updates.checks(), 2);
    assert_eq!(h.app.exit(), None);
}

#[tokio::test(start_paused = true)]
async fn test_shutdown_and_safe_state() {
    let mut h = booted(Setup::default()).await;
    let pins = LedPins::default();

    let exit = h.app.run(async {}).await;
    h.app.safe_state();

    assert_eq!(exit, Exit::Shutdown);
    assert_eq!(h.app.status_phase(), Some(StatusPhase::SafeShutdown));
    assert!(h.gpio.level(pins.red));
    assert!(!h.gpio.level(pins.yellow));
    assert!(!h.gpio.level(pins.green));
}
