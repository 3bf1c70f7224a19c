//! # Appliance Container
//!
//! Configuration and construction of every component with its production
//! adapters.

pub mod config;
pub mod subsystems;

pub use config::{ApplianceConfig, ConfigError};
pub use subsystems::{Adapters, Subsystems};
