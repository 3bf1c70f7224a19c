//! Error types for the status indicator.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StatusError {
    /// Pin could not be exported or configured as an output.
    #[error("GPIO {pin} setup failed: {reason}")]
    Setup { pin: u32, reason: String },

    /// Output level could not be written.
    #[error("GPIO {pin} write failed: {reason}")]
    Write { pin: u32, reason: String },
}

pub type StatusResult<T> = Result<T, StatusError>;
