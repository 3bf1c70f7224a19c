//! # Error Types
//!
//! Errors shared across the appliance crates.

use thiserror::Error;

/// Invalid slot references.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Slot number outside `1..=SLOT_COUNT`.
    #[error("Slot {slot} out of range (1..={max})", max = crate::entities::SLOT_COUNT)]
    OutOfRange { slot: u32 },
}

/// Malformed wire messages (ProtocolParseError).
#[derive(Debug, Error)]
pub enum WireError {
    /// Not a JSON envelope.
    #[error("Malformed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Header without a message name.
    #[error("Message header has no messageName")]
    MissingMessageName,

    /// Body does not match the schema for its message name.
    #[error("Invalid body for {message_name}: {reason}")]
    InvalidBody {
        message_name: String,
        reason: String,
    },

    /// Inbound buffer grew past the frame limit without a boundary.
    #[error("Frame exceeds {limit} bytes without terminator")]
    FrameTooLarge { limit: usize },
}
