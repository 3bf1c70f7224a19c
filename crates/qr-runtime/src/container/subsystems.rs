//! # Subsystem Container
//!
//! Holds every component instance and the channels that feed the event
//! loop.
//!
//! ## Construction Order
//!
//! ```text
//! Level 0: artifact store
//! Level 1: key manager (serial channel + store)
//! Level 2: randomness pipeline (signs through the key manager)
//!          provisioning handler (identities from the key manager)
//!          lottery client (reads artifacts, owns the TCP link)
//! Level 3: status indicator, update agent
//! ```
//!
//! Components are owned directly; the event loop is the only caller, so
//! nothing needs a lock. The key manager is the one shared component,
//! reached by the pipeline and the provisioning handler through port
//! adapters.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};

use shared_types::DeviceId;

use qr_01_slot_ledger::{FileArtifactStore, SharedArtifactStore};
use qr_02_key_manager::adapters::TtySerialChannel;
use qr_02_key_manager::{KeyManager, SerialChannel};
use qr_03_randomness::adapters::{ProcessEntropySource, ProcessQualityEvaluator};
use qr_03_randomness::{EntropySource, QualityEvaluator, RandomnessPipeline};
use qr_04_provisioning::adapters::{spawn_reader, RfcommWriter, WpaSupplicantConfigurator};
use qr_04_provisioning::{NetworkConfigurator, ProvisioningHandler, ResponseSink, WirelessEvent};
use qr_05_lottery_client::adapters::{SystemClock, TcpConnector};
use qr_05_lottery_client::{CoordinatorConnector, LinkEvent, LotteryClient, WallClock};
use qr_06_status_indicator::adapters::SysfsGpio;
use qr_06_status_indicator::{GpioOutput, StatusIndicator};

use crate::adapters::{CommandUpdateAgent, KeyManagerIdentities, KeyManagerSigner, UpdateAgent};
use crate::container::config::ApplianceConfig;

const LINK_EVENT_CAPACITY: usize = 256;
const WIRELESS_EVENT_CAPACITY: usize = 64;

/// Port implementations handed to [`Subsystems::assemble`].
pub struct Adapters {
    pub store: SharedArtifactStore,
    pub serial: Box<dyn SerialChannel>,
    pub entropy: Arc<dyn EntropySource>,
    pub evaluator: Arc<dyn QualityEvaluator>,
    pub connector: Arc<dyn CoordinatorConnector>,
    pub clock: Arc<dyn WallClock>,
    pub network: Arc<dyn NetworkConfigurator>,
    pub gpio: Box<dyn GpioOutput>,
    pub responder: Box<dyn ResponseSink>,
    pub updater: Option<Arc<dyn UpdateAgent>>,
}

/// Every component of the appliance.
pub struct Subsystems {
    // =========================================================================
    // IDENTITY & STORAGE
    // =========================================================================
    pub device_id: DeviceId,
    pub store: SharedArtifactStore,
    pub keys: Arc<KeyManager>,

    // =========================================================================
    // PROTOCOLS
    // =========================================================================
    pub pipeline: RandomnessPipeline,
    pub client: LotteryClient,
    pub provisioning: ProvisioningHandler,
    /// Writes provisioning replies back to the wireless peer.
    pub responder: Box<dyn ResponseSink>,

    // =========================================================================
    // PERIPHERALS
    // =========================================================================
    pub status: StatusIndicator,
    pub updater: Option<Arc<dyn UpdateAgent>>,
    pub update_interval: Duration,

    // =========================================================================
    // EVENT SOURCES
    // =========================================================================
    pub link_events: mpsc::Receiver<LinkEvent>,
    pub wireless_events: mpsc::Receiver<WirelessEvent>,
}

impl Subsystems {
    /// Build every component over the real hardware and processes, and
    /// start the wireless reader task.
    pub fn production(config: &ApplianceConfig, device_id: DeviceId) -> anyhow::Result<Self> {
        let store = FileArtifactStore::open(&config.storage.data_dir).with_context(|| {
            format!(
                "opening artifact store at {}",
                config.storage.data_dir.display()
            )
        })?;

        let adapters = Adapters {
            store: Arc::new(store),
            serial: Box::new(TtySerialChannel::new(config.serial.tty.clone())),
            entropy: Arc::new(ProcessEntropySource::new(
                config.randomness.generator_command(),
            )),
            evaluator: Arc::new(ProcessQualityEvaluator::new(
                config.randomness.evaluator_command(),
            )),
            connector: Arc::new(TcpConnector::new(config.coordinator.connect_timeout)),
            clock: Arc::new(SystemClock),
            network: Arc::new(WpaSupplicantConfigurator::new(config.network.clone())),
            gpio: Box::new(SysfsGpio::new(config.status.gpio_root.clone())),
            responder: Box::new(RfcommWriter::new(
                config.provisioning.rfcomm_device.clone(),
            )),
            updater: config
                .update
                .command
                .as_ref()
                .map(|command| {
                    Arc::new(CommandUpdateAgent::new(command.clone())) as Arc<dyn UpdateAgent>
                }),
        };

        let (subsystems, wireless_tx) = Self::assemble(config, device_id, adapters)?;
        spawn_reader(config.provisioning.clone(), wireless_tx);
        Ok(subsystems)
    }

    /// Wire components over the given adapters. Wireless traffic is fed
    /// through the returned sender.
    pub fn assemble(
        config: &ApplianceConfig,
        device_id: DeviceId,
        adapters: Adapters,
    ) -> anyhow::Result<(Self, mpsc::Sender<WirelessEvent>)> {
        let store = adapters.store;

        let keys = KeyManager::new(
            config.serial.key_manager.clone(),
            adapters.serial,
            store.clone(),
        )
        .shared();

        let pipeline = RandomnessPipeline::new(
            config.randomness.pipeline.clone(),
            store.clone(),
            adapters.entropy,
            adapters.evaluator,
            Arc::new(KeyManagerSigner::new(keys.clone())),
        )
        .context("loading slot ledger")?;

        let (link_tx, link_events) = mpsc::channel(LINK_EVENT_CAPACITY);
        let client = LotteryClient::new(
            config.coordinator.clone(),
            device_id.clone(),
            store.clone(),
            adapters.connector,
            adapters.clock,
            link_tx,
        )
        .context("loading coordinator address")?;

        let provisioning = ProvisioningHandler::new(
            &config.provisioning,
            adapters.network,
            Arc::new(KeyManagerIdentities::new(keys.clone())),
        );

        let mut status = StatusIndicator::new(config.status.clone(), adapters.gpio);
        if let Err(e) = status.init() {
            warn!(error = %e, "[qr-runtime] status outputs unavailable");
        }

        let (wireless_tx, wireless_events) = mpsc::channel(WIRELESS_EVENT_CAPACITY);

        info!(
            device = %device_id,
            coordinator = ?client.coordinator(),
            updates = adapters.updater.is_some(),
            "[qr-runtime] subsystems assembled"
        );

        Ok((
            Self {
                device_id,
                store,
                keys,
                pipeline,
                client,
                provisioning,
                responder: adapters.responder,
                status,
                updater: adapters.updater,
                update_interval: config.update.interval,
                link_events,
                wireless_events,
            },
            wireless_tx,
        ))
    }
}

