//! Driven ports for the provisioning channel.

use async_trait::async_trait;
use shared_types::SlotId;

use crate::domain::{WalletIdentity, WirelessCredentials};
use crate::error::ProvisioningResult;

/// Applies wireless network credentials to the host.
#[async_trait]
pub trait NetworkConfigurator: Send + Sync {
    async fn apply(&self, credentials: &WirelessCredentials) -> ProvisioningResult<()>;
}

/// Slot identities, generated on demand when missing.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn ensure_identity(&self, slot: SlotId) -> ProvisioningResult<WalletIdentity>;
}

/// Outbound half of the wireless channel.
#[async_trait]
pub trait ResponseSink: Send {
    async fn send(&mut self, bytes: &[u8]) -> ProvisioningResult<()>;
}

/// Inbound half of the wireless channel, forwarded by the reader task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WirelessEvent {
    Data(Vec<u8>),
    /// Peer went away; buffered partial input is stale.
    Closed { reason: String },
}
