//! # QR Beacon Appliance
//!
//! Entry point of the appliance firmware.
//!
//! ## Startup Sequence
//!
//! 1. Initialize logging
//! 2. Load and validate configuration from `QR_*` variables
//! 3. Resolve the device id (wifi MAC unless overridden)
//! 4. Build every component over the real hardware
//! 5. Write the version marker, provision identities, sign registrations
//! 6. Connect to the coordinator and enter the event loop
//!
//! ## Exit Status
//!
//! - `1` after a fatal signal (outputs left in the safe state)
//! - `100` when a firmware update was staged

use std::path::Path;

use anyhow::{Context, Result};
use tokio::signal::unix::{signal, Signal, SignalKind};
use tracing::{error, info};

use qr_runtime::adapters::{resolve_device_id, NET_CLASS_ROOT, STAGED_EXIT_CODE};
use qr_runtime::{Appliance, ApplianceConfig, Exit, Subsystems};
use qr_telemetry::{init_telemetry, TelemetryConfig};

/// Signals that stop the appliance.
struct FatalSignals {
    interrupt: Signal,
    terminate: Signal,
    quit: Signal,
    hangup: Signal,
}

impl FatalSignals {
    fn install() -> Result<Self> {
        Ok(Self {
            interrupt: signal(SignalKind::interrupt()).context("installing SIGINT handler")?,
            terminate: signal(SignalKind::terminate()).context("installing SIGTERM handler")?,
            quit: signal(SignalKind::quit()).context("installing SIGQUIT handler")?,
            hangup: signal(SignalKind::hangup()).context("installing SIGHUP handler")?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
            _ = self.quit.recv() => "SIGQUIT",
            _ = self.hangup.recv() => "SIGHUP",
        }
    }
}

/// Load configuration from the environment.
fn load_config() -> Result<ApplianceConfig> {
    let config = ApplianceConfig::from_env().context("reading configuration")?;
    config.validate().context("validating configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("building event loop")?;
    let code = runtime.block_on(run())?;
    std::process::exit(code)
}

async fn run() -> Result<i32> {
    init_telemetry(TelemetryConfig::from_env()).context("initializing logging")?;

    let config = load_config()?;
    let device_id = resolve_device_id(
        config.storage.device_id.as_deref(),
        Path::new(NET_CLASS_ROOT),
        &config.network.interface,
    )
    .context("resolving device id")?;

    let mut signals = FatalSignals::install()?;
    let subsystems = Subsystems::production(&config, device_id)?;
    let mut appliance = Appliance::new(subsystems);

    let interrupted = tokio::select! {
        result = appliance.bootstrap() => {
            result.context("starting appliance")?;
            None
        }
        name = signals.recv() => Some(name),
    };

    let exit = match interrupted {
        Some(name) => {
            error!(signal = name, "[qr-runtime] fatal signal during startup");
            Exit::Shutdown
        }
        None => {
            info!("[qr-runtime] appliance running");
            appliance
                .run(async {
                    let name = signals.recv().await;
                    error!(signal = name, "[qr-runtime] fatal signal");
                })
                .await
        }
    };

    Ok(match exit {
        Exit::Shutdown => {
            appliance.safe_state();
            1
        }
        Exit::UpdateStaged => {
            info!("[qr-runtime] exiting for update");
            STAGED_EXIT_CODE
        }
    })
}
