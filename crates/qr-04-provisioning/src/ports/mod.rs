//! Ports for the provisioning channel.

pub mod outbound;

pub use outbound::{IdentityProvider, NetworkConfigurator, ResponseSink, WirelessEvent};
