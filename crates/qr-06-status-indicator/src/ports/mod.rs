//! Ports for the status indicator.

pub mod outbound;

pub use outbound::GpioOutput;
