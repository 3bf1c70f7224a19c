//! Domain layer for the provisioning channel.

pub mod network;
pub mod request;
pub mod stream;

pub use network::render_wpa_conf;
pub use request::{
    status_response, wallet_response, ProvisioningRequest, ResponseStatus, WalletIdentity,
    WirelessCredentials,
};
pub use stream::JsonStreamSplitter;
