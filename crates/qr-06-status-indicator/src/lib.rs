//! # qr-06-status-indicator
//!
//! Three LEDs (red, yellow, green) on sysfs GPIO lines show the appliance
//! phase: steady for normal states, blinking for faults and updates, red
//! only once the process is shutting down on a signal.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use adapters::{RecordingGpio, SysfsGpio};
pub use config::{LedPins, StatusConfig};
pub use domain::{Led, LedMode, LedPattern, StatusPhase};
pub use error::{StatusError, StatusResult};
pub use ports::GpioOutput;
pub use service::StatusIndicator;
