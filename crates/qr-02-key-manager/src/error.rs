//! Error types for the key manager.

use qr_01_slot_ledger::ArtifactError;
use thiserror::Error;

/// Key manager errors.
#[derive(Debug, Error)]
pub enum KeyManagerError {
    /// Serial device could not be opened or configured (TransportError).
    #[error("Serial device {device} unavailable: {reason}")]
    SerialOpen { device: String, reason: String },

    /// Exchange attempted without an open channel.
    #[error("Serial channel is not open")]
    ChannelClosed,

    /// Read or write on the open channel failed (TransportError).
    #[error("Serial I/O failed: {reason}")]
    SerialIo { reason: String },

    /// The module did not answer in time.
    #[error("No response from secure module within {timeout_ms} ms")]
    ResponseTimeout { timeout_ms: u64 },

    /// The module answered with zero bytes.
    #[error("Empty response to {command}")]
    EmptyResponse { command: &'static str },

    /// Not a 20-byte hex address.
    #[error("Invalid address: {address}")]
    InvalidAddress { address: String },

    /// Slot has no provisioned identity.
    #[error("Slot {slot} has no identity")]
    MissingIdentity { slot: u8 },

    /// Persisting key material failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl KeyManagerError {
    /// Whether the failure came from the serial link rather than storage.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            KeyManagerError::SerialOpen { .. }
                | KeyManagerError::ChannelClosed
                | KeyManagerError::SerialIo { .. }
                | KeyManagerError::ResponseTimeout { .. }
                | KeyManagerError::EmptyResponse { .. }
        )
    }
}

/// Result type for key manager operations.
pub type KeyManagerResult<T> = Result<T, KeyManagerError>;
