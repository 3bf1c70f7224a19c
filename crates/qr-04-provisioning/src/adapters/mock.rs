//! In-memory provisioning collaborators for tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use shared_types::SlotId;

use crate::domain::{WalletIdentity, WirelessCredentials};
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::ports::{IdentityProvider, NetworkConfigurator, ResponseSink};

/// Records applied credentials instead of touching the host.
#[derive(Debug, Default)]
pub struct RecordingNetworkConfigurator {
    applied: Mutex<Vec<WirelessCredentials>>,
    failing: Mutex<bool>,
}

impl RecordingNetworkConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    pub fn applied(&self) -> Vec<WirelessCredentials> {
        self.applied.lock().clone()
    }
}

#[async_trait]
impl NetworkConfigurator for RecordingNetworkConfigurator {
    async fn apply(&self, credentials: &WirelessCredentials) -> ProvisioningResult<()> {
        if *self.failing.lock() {
            return Err(ProvisioningError::NetworkConfig {
                reason: "scripted failure".to_string(),
            });
        }
        self.applied.lock().push(credentials.clone());
        Ok(())
    }
}

/// Identity provider serving a fixed table.
#[derive(Debug, Default)]
pub struct StaticIdentityProvider {
    identities: Mutex<HashMap<SlotId, WalletIdentity>>,
    requested: Mutex<Vec<SlotId>>,
}

impl StaticIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, slot: SlotId, identity: WalletIdentity) {
        self.identities.lock().insert(slot, identity);
    }

    pub fn requested(&self) -> Vec<SlotId> {
        self.requested.lock().clone()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn ensure_identity(&self, slot: SlotId) -> ProvisioningResult<WalletIdentity> {
        self.requested.lock().push(slot);
        self.identities
            .lock()
            .get(&slot)
            .cloned()
            .ok_or_else(|| ProvisioningError::Identity {
                reason: format!("no identity for slot {}", slot),
            })
    }
}

/// Sink keeping every reply; clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn send(&mut self, bytes: &[u8]) -> ProvisioningResult<()> {
        self.sent.lock().push(bytes.to_vec());
        Ok(())
    }
}
