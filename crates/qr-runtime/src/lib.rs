//! # QR Beacon Appliance Runtime
//!
//! Builds every component over its production adapters and drives them
//! from a single-threaded event loop.
//!
//! ## Modules
//!
//! - `container`: configuration and component construction
//! - `adapters`: bridges between components, device identity, updates
//! - `wiring`: timer queue and orchestrator

pub mod adapters;
pub mod container;
pub mod wiring;

pub use container::{Adapters, ApplianceConfig, ConfigError, Subsystems};
pub use wiring::{Appliance, Exit, TimerId, TimerQueue};
