//! # Key Manager Service
//!
//! Owns the serial channel to the secure module and persists the identity
//! material it produces. The channel sits behind an async mutex: every
//! operation holds it from `open` to `close`, so the half-duplex protocol
//! never sees two outstanding requests even when several components share
//! the manager.

use std::sync::Arc;

use shared_types::{ArtifactKey, DeviceId, Hash, SlotArtifact, SlotId};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use qr_01_slot_ledger::{ArtifactStore, SharedArtifactStore};

use crate::config::KeyManagerConfig;
use crate::domain::{registration_digest, wallet_address_from, HardwareCommand, SlotIdentity};
use crate::error::{KeyManagerError, KeyManagerResult};
use crate::ports::SerialChannel;

/// Outcome of a pass over all slots.
#[derive(Debug, Default)]
pub struct SlotReport {
    pub completed: Vec<SlotId>,
    pub skipped: Vec<SlotId>,
    pub failed: Vec<(SlotId, KeyManagerError)>,
}

impl SlotReport {
    pub fn is_clean(&self) -> bool {
        self.failed.is_empty()
    }

    /// Whether any failure came from the serial link.
    pub fn has_transport_failure(&self) -> bool {
        self.failed.iter().any(|(_, e)| e.is_transport())
    }
}

/// Serial-protocol driver for the secure module.
pub struct KeyManager {
    config: KeyManagerConfig,
    channel: Mutex<Box<dyn SerialChannel>>,
    store: SharedArtifactStore,
}

impl KeyManager {
    pub fn new(
        config: KeyManagerConfig,
        channel: Box<dyn SerialChannel>,
        store: SharedArtifactStore,
    ) -> Self {
        Self {
            config,
            channel: Mutex::new(channel),
            store,
        }
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// Stored identity of a slot, if both public key and address exist.
    pub fn identity(&self, slot: SlotId) -> KeyManagerResult<Option<SlotIdentity>> {
        let public_key = self
            .store
            .read_text(ArtifactKey::slot(slot, SlotArtifact::PublicKey))?;
        let wallet_address = self
            .store
            .read_text(ArtifactKey::slot(slot, SlotArtifact::WalletAddress))?;

        Ok(match (public_key, wallet_address) {
            (Some(public_key), Some(wallet_address))
                if !public_key.is_empty() && !wallet_address.is_empty() =>
            {
                Some(SlotIdentity {
                    slot,
                    public_key,
                    wallet_address,
                })
            }
            _ => None,
        })
    }

    /// Return the stored identity, generating it on the module if missing.
    pub async fn ensure_identity(&self, slot: SlotId) -> KeyManagerResult<SlotIdentity> {
        if let Some(identity) = self.identity(slot)? {
            return Ok(identity);
        }
        self.provision_slot(slot).await
    }

    /// Generate a keypair for `slot` and persist public key, decompressed
    /// key and wallet address.
    pub async fn provision_slot(&self, slot: SlotId) -> KeyManagerResult<SlotIdentity> {
        let mut channel = self.channel.lock().await;
        channel.open().await?;
        let result = self.generate_identity(channel.as_mut(), slot).await;
        channel.close().await;

        if let Ok(identity) = &result {
            info!(
                slot = slot.get(),
                wallet = %identity.wallet_address,
                "[qr-02] slot provisioned"
            );
        }
        result
    }

    /// Ensure every slot has an identity, pacing hardware access.
    ///
    /// Failures are collected per slot; the pass always covers all slots.
    pub async fn provision_all(&self) -> SlotReport {
        let mut report = SlotReport::default();

        for slot in SlotId::all() {
            match self.identity(slot) {
                Ok(Some(_)) => {
                    report.skipped.push(slot);
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    report.failed.push((slot, e));
                    continue;
                }
            }

            match self.provision_slot(slot).await {
                Ok(_) => report.completed.push(slot),
                Err(e) => {
                    warn!(slot = slot.get(), error = %e, "[qr-02] provisioning failed");
                    report.failed.push((slot, e));
                }
            }
            tokio::time::sleep(self.config.settle_delay).await;
        }

        info!(
            provisioned = report.completed.len(),
            reused = report.skipped.len(),
            failed = report.failed.len(),
            "[qr-02] provisioning pass complete"
        );
        report
    }

    /// Sign `digest` with the module's signing key.
    pub async fn sign_digest(&self, digest: &Hash) -> KeyManagerResult<Vec<u8>> {
        let command = HardwareCommand::Sign {
            key_index: self.config.signing_key_index,
            digest: *digest,
        };

        let mut channel = self.channel.lock().await;
        channel.open().await?;
        let result = self.exchange(channel.as_mut(), &command).await;
        channel.close().await;
        result
    }

    /// Sign SHA-256(wallet ‖ device id) for every provisioned slot that has
    /// no registration signature yet.
    pub async fn sign_batch(&self, device_id: &DeviceId) -> SlotReport {
        let mut report = SlotReport::default();

        for slot in SlotId::all() {
            match self.sign_registration(slot, device_id).await {
                Ok(true) => report.completed.push(slot),
                Ok(false) => report.skipped.push(slot),
                Err(e) => {
                    warn!(slot = slot.get(), error = %e, "[qr-02] registration signing failed");
                    report.failed.push((slot, e));
                }
            }
        }

        debug!(
            signed = report.completed.len(),
            failed = report.failed.len(),
            "[qr-02] registration signatures"
        );
        report
    }

    /// Returns `false` when there was nothing to sign.
    async fn sign_registration(&self, slot: SlotId, device_id: &DeviceId) -> KeyManagerResult<bool> {
        let signature_key = ArtifactKey::slot(slot, SlotArtifact::RegistrationSignature);
        if self.store.exists(signature_key)? {
            return Ok(false);
        }
        let Some(identity) = self.identity(slot)? else {
            return Ok(false);
        };

        let digest = registration_digest(&identity.wallet_address, device_id);
        let signature = self.sign_digest(&digest).await?;
        self.store.write(signature_key, &signature)?;
        Ok(true)
    }

    async fn generate_identity(
        &self,
        channel: &mut dyn SerialChannel,
        slot: SlotId,
    ) -> KeyManagerResult<SlotIdentity> {
        let raw_public_key = self
            .exchange(channel, &HardwareCommand::NewKey { slot })
            .await?;
        let public_key = hex::encode(&raw_public_key);
        self.store.write(
            ArtifactKey::slot(slot, SlotArtifact::PublicKey),
            public_key.as_bytes(),
        )?;

        let decompressed = self
            .exchange(channel, &HardwareCommand::Decompress { raw_public_key })
            .await?;
        let decompressed = hex::encode(decompressed);
        self.store.write(
            ArtifactKey::slot(slot, SlotArtifact::DecompressedPublicKey),
            decompressed.as_bytes(),
        )?;

        let wallet_address = wallet_address_from(&decompressed);
        self.store.write(
            ArtifactKey::slot(slot, SlotArtifact::WalletAddress),
            wallet_address.as_bytes(),
        )?;

        Ok(SlotIdentity {
            slot,
            public_key,
            wallet_address,
        })
    }

    async fn exchange(
        &self,
        channel: &mut dyn SerialChannel,
        command: &HardwareCommand,
    ) -> KeyManagerResult<Vec<u8>> {
        let response = channel
            .exchange(&command.encode(), self.config.response_timeout)
            .await?;
        if response.is_empty() {
            return Err(KeyManagerError::EmptyResponse {
                command: command.name(),
            });
        }
        Ok(response)
    }
}
