//! Domain layer for the status indicator.

pub mod phase;

pub use phase::{Led, LedMode, LedPattern, StatusPhase};
