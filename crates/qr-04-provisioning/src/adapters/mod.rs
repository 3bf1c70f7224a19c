//! Adapters for the provisioning channel.

pub mod mock;
pub mod rfcomm;
pub mod wpa;

pub use mock::{RecordingNetworkConfigurator, RecordingSink, StaticIdentityProvider};
pub use rfcomm::{spawn_reader, RfcommWriter};
pub use wpa::WpaSupplicantConfigurator;
