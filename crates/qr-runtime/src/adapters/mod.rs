//! # Adapter Implementations
//!
//! Runtime-side implementations of component ports:
//!
//! - the key manager serves as the pipeline's batch signer and as the
//!   provisioning channel's identity source
//! - the device id comes from the wifi interface
//! - update checks run an external command

pub mod device;
pub mod key_manager;
pub mod mock;
pub mod updater;

pub use device::{read_interface_mac, resolve_device_id, NET_CLASS_ROOT};
pub use key_manager::{KeyManagerIdentities, KeyManagerSigner};
pub use mock::ScriptedUpdateAgent;
pub use updater::{CommandUpdateAgent, UpdateAgent, UpdateError, UpdateStatus, STAGED_EXIT_CODE};
