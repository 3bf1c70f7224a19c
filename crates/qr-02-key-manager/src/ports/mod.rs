//! Ports for the key manager.

pub mod outbound;

pub use outbound::SerialChannel;
