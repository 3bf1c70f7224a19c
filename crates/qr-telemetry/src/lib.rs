//! # QR Telemetry
//!
//! Structured logging for the QR beacon appliance.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use qr_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(TelemetryConfig::from_env())?;
//! tracing::info!("[qr-runtime] appliance starting");
//! ```
//!
//! ## Environment Variables
//!
//! | Variable | Default | Effect |
//! |----------|---------|--------|
//! | `RUST_LOG` | unset | Filter directives, preferred when they parse |
//! | `QR_LOG_LEVEL` | `info` | Filter used otherwise |
//! | `QR_JSON_LOGS` | `false` | JSON lines instead of compact text |
//! | `QR_CONSOLE_OUTPUT` | `true` | `false` silences stdout |

mod config;
mod tracing_setup;

pub use config::{LogFormat, TelemetryConfig};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("tracing subscriber already installed or rejected: {0}")]
    SubscriberInit(String),

    #[error("invalid log filter {0}")]
    Config(String),
}

/// Initialize process-wide logging.
pub fn init_telemetry(config: TelemetryConfig) -> Result<(), TelemetryError> {
    tracing_setup::init_tracing(&config)
}
