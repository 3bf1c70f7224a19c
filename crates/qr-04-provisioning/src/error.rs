//! Error types for the provisioning channel.

use shared_types::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProvisioningError {
    /// Inbound bytes are not a usable envelope (ProtocolParseError).
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Message name is not served on this channel.
    #[error("Unsupported provisioning message: {name}")]
    UnsupportedMessage { name: String },

    /// Known message with an unusable body.
    #[error("Invalid {message_name} request: {reason}")]
    InvalidRequest {
        message_name: &'static str,
        reason: String,
    },

    /// Network configuration could not be written or applied.
    #[error("Network configuration failed: {reason}")]
    NetworkConfig { reason: String },

    /// Slot identity could not be produced.
    #[error("Identity unavailable: {reason}")]
    Identity { reason: String },

    /// Wireless device read/write failed.
    #[error("Wireless transport failed: {reason}")]
    Transport { reason: String },
}

pub type ProvisioningResult<T> = Result<T, ProvisioningError>;
