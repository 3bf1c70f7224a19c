//! # Appliance Configuration
//!
//! Unified configuration for every component, read from `QR_*` environment
//! variables with defaults for the reference hardware.

use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use qr_02_key_manager::adapters::TtyConfig;
use qr_02_key_manager::KeyManagerConfig;
use qr_03_randomness::adapters::{EvaluatorCommand, GeneratorCommand};
use qr_03_randomness::PipelineConfig;
use qr_04_provisioning::{NetworkConfig, ProvisioningConfig};
use qr_05_lottery_client::LotteryClientConfig;
use qr_06_status_indicator::{LedPins, StatusConfig};

/// Complete appliance configuration.
#[derive(Debug, Clone, Default)]
pub struct ApplianceConfig {
    pub storage: StorageConfig,
    pub serial: SerialConfig,
    pub coordinator: LotteryClientConfig,
    pub randomness: RandomnessConfig,
    pub provisioning: ProvisioningConfig,
    pub network: NetworkConfig,
    pub status: StatusConfig,
    pub update: UpdateConfig,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{name}={value} is not a valid value")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} must be greater than zero")]
    Zero { name: &'static str },

    #[error("LED pins must be distinct, got {pins:?}")]
    DuplicatePins { pins: [u32; 3] },
}

/// Where artifacts live and how the appliance identifies itself.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    /// Explicit device id; otherwise the wifi interface MAC is used.
    pub device_id: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            device_id: None,
        }
    }
}

/// Secure module serial line.
#[derive(Debug, Clone, Default)]
pub struct SerialConfig {
    pub tty: TtyConfig,
    pub key_manager: KeyManagerConfig,
}

/// Generator and evaluator executables plus block sizing.
#[derive(Debug, Clone)]
pub struct RandomnessConfig {
    pub pipeline: PipelineConfig,
    pub generator_program: PathBuf,
    pub generator_workdir: PathBuf,
    pub generator_output: PathBuf,
    pub evaluator_program: PathBuf,
}

impl Default for RandomnessConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            generator_program: PathBuf::from("./drbg"),
            generator_workdir: PathBuf::from("."),
            generator_output: PathBuf::from("drbg-output.bin"),
            evaluator_program: PathBuf::from("./assess-block"),
        }
    }
}

impl RandomnessConfig {
    pub fn generator_command(&self) -> GeneratorCommand {
        GeneratorCommand {
            program: self.generator_program.clone(),
            args: Vec::new(),
            working_dir: self.generator_workdir.clone(),
            output_file: self.generator_output.clone(),
        }
    }

    pub fn evaluator_command(&self) -> EvaluatorCommand {
        EvaluatorCommand {
            program: self.evaluator_program.clone(),
            args: Vec::new(),
            scratch_file: self.generator_workdir.join("block-under-test.bin"),
        }
    }
}

/// External update agent.
#[derive(Debug, Clone)]
pub struct UpdateConfig {
    /// Command run on every check; `None` disables update checks.
    pub command: Option<String>,
    pub interval: Duration,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            command: None,
            interval: Duration::from_secs(24 * 60 * 60),
        }
    }
}

impl ApplianceConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration from `lookup`, falling back to defaults for
    /// unset variables.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let vars = Vars { lookup: &lookup };
        let mut config = Self::default();

        let storage = &mut config.storage;
        storage.data_dir = vars.path("QR_DATA_DIR", storage.data_dir.clone());
        storage.device_id = vars.text("QR_DEVICE_ID");

        let serial = &mut config.serial;
        serial.tty.device = vars.path("QR_SERIAL_DEVICE", serial.tty.device.clone());
        serial.tty.baud_rate = vars.parse("QR_SERIAL_BAUD", serial.tty.baud_rate)?;
        serial.key_manager.response_timeout =
            vars.millis("QR_SERIAL_TIMEOUT_MS", serial.key_manager.response_timeout)?;

        let coordinator = &mut config.coordinator;
        coordinator.port = vars.parse("QR_COORDINATOR_PORT", coordinator.port)?;
        coordinator.reconnect_interval =
            vars.secs("QR_RECONNECT_SECS", coordinator.reconnect_interval)?;
        coordinator.connect_timeout =
            vars.millis("QR_CONNECT_TIMEOUT_MS", coordinator.connect_timeout)?;

        let randomness = &mut config.randomness;
        randomness.generator_program =
            vars.path("QR_GENERATOR_CMD", randomness.generator_program.clone());
        randomness.generator_workdir =
            vars.path("QR_GENERATOR_WORKDIR", randomness.generator_workdir.clone());
        randomness.generator_output =
            vars.path("QR_GENERATOR_OUTPUT", randomness.generator_output.clone());
        randomness.evaluator_program =
            vars.path("QR_EVALUATOR_CMD", randomness.evaluator_program.clone());
        randomness.pipeline.block_size =
            vars.parse("QR_BLOCK_SIZE", randomness.pipeline.block_size)?;
        randomness.pipeline.max_invocations =
            vars.parse("QR_GENERATOR_INVOCATIONS", randomness.pipeline.max_invocations)?;

        config.provisioning.rfcomm_device =
            vars.path("QR_RFCOMM_DEVICE", config.provisioning.rfcomm_device.clone());

        let network = &mut config.network;
        network.wpa_conf_path = vars.path("QR_WPA_CONF", network.wpa_conf_path.clone());
        network.country = vars.text("QR_WIFI_COUNTRY").unwrap_or_else(|| network.country.clone());
        network.interface = vars
            .text("QR_WIFI_INTERFACE")
            .unwrap_or_else(|| network.interface.clone());

        let status = &mut config.status;
        status.gpio_root = vars.path("QR_GPIO_ROOT", status.gpio_root.clone());
        status.pins = LedPins {
            red: vars.parse("QR_LED_RED", status.pins.red)?,
            yellow: vars.parse("QR_LED_YELLOW", status.pins.yellow)?,
            green: vars.parse("QR_LED_GREEN", status.pins.green)?,
        };

        config.update.command = vars.text("QR_UPDATE_CMD");
        config.update.interval = vars.secs("QR_UPDATE_INTERVAL_SECS", config.update.interval)?;

        Ok(config)
    }

    /// Reject values the appliance cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("QR_SERIAL_BAUD", u64::from(self.serial.tty.baud_rate)),
            ("QR_COORDINATOR_PORT", u64::from(self.coordinator.port)),
            ("QR_RECONNECT_SECS", self.coordinator.reconnect_interval.as_secs()),
            ("QR_BLOCK_SIZE", self.randomness.pipeline.block_size as u64),
            (
                "QR_GENERATOR_INVOCATIONS",
                u64::from(self.randomness.pipeline.max_invocations),
            ),
            ("QR_UPDATE_INTERVAL_SECS", self.update.interval.as_secs()),
        ];
        if let Some((name, _)) = nonzero.into_iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { name });
        }

        let pins = self.status.pins;
        let distinct: HashSet<u32> = [pins.red, pins.yellow, pins.green].into_iter().collect();
        if distinct.len() != 3 {
            return Err(ConfigError::DuplicatePins {
                pins: [pins.red, pins.yellow, pins.green],
            });
        }
        Ok(())
    }
}

struct Vars<'a, F> {
    lookup: &'a F,
}

impl<F> Vars<'_, F>
where
    F: Fn(&str) -> Option<String>,
{
    fn text(&self, name: &str) -> Option<String> {
        (self.lookup)(name)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn path(&self, name: &str, default: PathBuf) -> PathBuf {
        self.text(name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse<T: FromStr>(&self, name: &'static str, default: T) -> Result<T, ConfigError> {
        match self.text(name) {
            Some(value) => value
                .parse()
                .map_err(|_| ConfigError::InvalidValue { name, value }),
            None => Ok(default),
        }
    }

    fn secs(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse(name, default.as_secs()).map(Duration::from_secs)
    }

    fn millis(&self, name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse(name, default.as_millis() as u64)
            .map(Duration::from_millis)
    }
}
