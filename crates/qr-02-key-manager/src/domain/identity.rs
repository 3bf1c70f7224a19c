//! Slot identity material.

use sha2::{Digest, Sha256};
use shared_types::{DeviceId, Hash, SlotId};

/// Identity persisted for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotIdentity {
    pub slot: SlotId,
    /// Raw public key from the module, hex.
    pub public_key: String,
    /// EIP-55 wallet address.
    pub wallet_address: String,
}

/// Digest signed at registration: SHA-256(wallet address ‖ device id).
pub fn registration_digest(wallet_address: &str, device_id: &DeviceId) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(wallet_address.as_bytes());
    hasher.update(device_id.as_str().as_bytes());
    hasher.finalize().into()
}
