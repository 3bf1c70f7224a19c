use std::sync::Arc;

use async_trait::async_trait;
use shared_types::{Hash, SlotId};

use qr_02_key_manager::KeyManager;
use qr_03_randomness::{DigestSigner, PipelineError, PipelineResult};
use qr_04_provisioning::{IdentityProvider, ProvisioningError, ProvisioningResult, WalletIdentity};

/// Batch signing through the secure module.
#[derive(Clone)]
pub struct KeyManagerSigner {
    keys: Arc<KeyManager>,
}

impl KeyManagerSigner {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl DigestSigner for KeyManagerSigner {
    async fn sign_digest(&self, digest: &Hash) -> PipelineResult<Vec<u8>> {
        self.keys
            .sign_digest(digest)
            .await
            .map_err(|e| PipelineError::Signing {
                transport: e.is_transport(),
                reason: e.to_string(),
            })
    }
}

/// Slot identities for the provisioning channel, generated on demand.
#[derive(Clone)]
pub struct KeyManagerIdentities {
    keys: Arc<KeyManager>,
}

impl KeyManagerIdentities {
    pub fn new(keys: Arc<KeyManager>) -> Self {
        Self { keys }
    }
}

#[async_trait]
impl IdentityProvider for KeyManagerIdentities {
    async fn ensure_identity(&self, slot: SlotId) -> ProvisioningResult<WalletIdentity> {
        let identity = self
            .keys
            .ensure_identity(slot)
            .await
            .map_err(|e| ProvisioningError::Identity {
                reason: e.to_string(),
            })?;
        Ok(WalletIdentity {
            wallet_address: identity.wallet_address,
            public_key: identity.public_key,
        })
    }
}
