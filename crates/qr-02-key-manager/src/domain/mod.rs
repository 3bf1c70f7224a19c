//! Domain layer for the key manager.

pub mod address;
pub mod commands;
pub mod identity;

pub use address::{is_checksummed, keccak256, to_checksum_address, wallet_address_from};
pub use commands::{HardwareCommand, SIGNING_KEY_INDEX};
pub use identity::{registration_digest, SlotIdentity};
