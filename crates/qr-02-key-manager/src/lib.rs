//! # qr-02-key-manager
//!
//! Driver for the secure hardware module attached over a serial line.
//!
//! ## Overview
//!
//! - **Commands**: `NewKey(slot)`, `Decompress(raw key)`, `Sign(digest)`,
//!   each a 2-3 byte opcode plus payload.
//! - **Wallet addresses**: Keccak-256 of the decompressed key, lower 20
//!   bytes, EIP-55 cased.
//! - **Provisioning**: one identity per slot, generated once and reused.
//! - **Registration**: SHA-256(wallet ‖ device id) signed per slot.
//!
//! ## Channel Discipline
//!
//! ```text
//! lock ──→ open ──→ write ──→ read until quiet ──→ ... ──→ close ──→ unlock
//! ```
//!
//! The serial protocol has no request ids; the response to a command is
//! whatever arrives next. The service mutex guarantees a single outstanding
//! request.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::KeyManagerConfig;
pub use domain::{to_checksum_address, wallet_address_from, HardwareCommand, SlotIdentity};
pub use error::{KeyManagerError, KeyManagerResult};
pub use ports::SerialChannel;
pub use service::{KeyManager, SlotReport};
