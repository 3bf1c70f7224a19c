//! # Core Entities
//!
//! Slot identifiers, slot status and artifact keys shared by every appliance crate.
//!
//! A slot is one of `SLOT_COUNT` fixed identity/random-material units. Every
//! persisted artifact is addressed by an [`ArtifactKey`]; nothing outside the
//! artifact store ever builds a file path.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::SlotError;

/// Number of identity slots held by the appliance.
pub const SLOT_COUNT: u8 = 10;

/// 32-byte digest (SHA-256 or Keccak-256).
pub type Hash = [u8; 32];

/// Identifier of a slot, always within `1..=SLOT_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotId(u8);

impl SlotId {
    /// The primary slot, whose identity is used for login.
    pub const PRIMARY: SlotId = SlotId(1);

    /// Create a slot id, rejecting numbers outside `1..=SLOT_COUNT`.
    pub fn new(number: u8) -> Result<Self, SlotError> {
        if (1..=SLOT_COUNT).contains(&number) {
            Ok(Self(number))
        } else {
            Err(SlotError::OutOfRange {
                slot: u32::from(number),
            })
        }
    }

    /// Parse a slot number received over the wire.
    pub fn from_wire(number: u64) -> Result<Self, SlotError> {
        u8::try_from(number)
            .map_err(|_| SlotError::OutOfRange {
                slot: u32::try_from(number).unwrap_or(u32::MAX),
            })
            .and_then(Self::new)
    }

    /// Slot number as stored and sent on the wire.
    pub fn get(self) -> u8 {
        self.0
    }

    /// All slots in ascending order.
    pub fn all() -> impl Iterator<Item = SlotId> {
        (1..=SLOT_COUNT).map(SlotId)
    }

    pub fn is_primary(self) -> bool {
        self == Self::PRIMARY
    }
}

impl TryFrom<u8> for SlotId {
    type Error = SlotError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlotId> for u8 {
    fn from(slot: SlotId) -> Self {
        slot.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Refill status of a slot.
///
/// ```text
/// Empty ──generate──→ Ready ──claim──→ Consumed
///   ↑                   ↑                  │
///   │                   └───regenerate─────┤
///   └──────────── next round ──────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlotStatus {
    /// No usable random block.
    #[default]
    Empty,
    /// Random block and hash are persisted and unclaimed.
    Ready,
    /// Block and hash were claimed for a commitment.
    Consumed,
}

impl SlotStatus {
    /// Numeric code used in the persisted ledger.
    pub fn code(self) -> u8 {
        match self {
            SlotStatus::Empty => 0,
            SlotStatus::Ready => 1,
            SlotStatus::Consumed => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SlotStatus::Empty),
            1 => Some(SlotStatus::Ready),
            2 => Some(SlotStatus::Consumed),
            _ => None,
        }
    }

    /// Whether the pipeline should (re)generate this slot.
    pub fn needs_refill(self) -> bool {
        matches!(self, SlotStatus::Empty | SlotStatus::Consumed)
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SlotStatus::Empty => "empty",
            SlotStatus::Ready => "ready",
            SlotStatus::Consumed => "consumed",
        };
        f.write_str(name)
    }
}

/// Kinds of per-slot artifacts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotArtifact {
    /// Raw public key returned by the hardware module (hex text).
    PublicKey,
    /// Decompressed public key (hex text).
    DecompressedPublicKey,
    /// EIP-55 wallet address (text, `0x`-prefixed).
    WalletAddress,
    /// Hardware signature over SHA-256(wallet address ‖ device id).
    RegistrationSignature,
    /// Freshly generated, quality-tested random block.
    RandomBlock,
    /// Hex SHA-256 of [`SlotArtifact::RandomBlock`].
    BlockHash,
    /// Random block reserved for the current commitment.
    ClaimedRandomBlock,
    /// Block hash reserved for the current commitment.
    ClaimedBlockHash,
}

impl SlotArtifact {
    pub const ALL: [SlotArtifact; 8] = [
        SlotArtifact::PublicKey,
        SlotArtifact::DecompressedPublicKey,
        SlotArtifact::WalletAddress,
        SlotArtifact::RegistrationSignature,
        SlotArtifact::RandomBlock,
        SlotArtifact::BlockHash,
        SlotArtifact::ClaimedRandomBlock,
        SlotArtifact::ClaimedBlockHash,
    ];

    pub fn is_claimed(self) -> bool {
        matches!(
            self,
            SlotArtifact::ClaimedRandomBlock | SlotArtifact::ClaimedBlockHash
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SlotArtifact::PublicKey => "public_key",
            SlotArtifact::DecompressedPublicKey => "decompressed_public_key",
            SlotArtifact::WalletAddress => "wallet_address",
            SlotArtifact::RegistrationSignature => "registration_signature",
            SlotArtifact::RandomBlock => "random_block",
            SlotArtifact::BlockHash => "block_hash",
            SlotArtifact::ClaimedRandomBlock => "claimed_random_block",
            SlotArtifact::ClaimedBlockHash => "claimed_block_hash",
        }
    }
}

/// Address of one persisted artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKey {
    /// Per-slot artifact.
    Slot(SlotId, SlotArtifact),
    /// Slot status ledger.
    Ledger,
    /// Hardware signature over the last committed batch.
    BatchSignature,
    /// Coordinator IP configured over the wireless channel.
    CoordinatorAddress,
    /// Firmware version marker.
    VersionMarker,
}

impl ArtifactKey {
    pub fn slot(slot: SlotId, artifact: SlotArtifact) -> Self {
        ArtifactKey::Slot(slot, artifact)
    }
}

impl fmt::Display for ArtifactKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArtifactKey::Slot(slot, artifact) => write!(f, "slot-{}/{}", slot, artifact.as_str()),
            ArtifactKey::Ledger => f.write_str("ledger"),
            ArtifactKey::BatchSignature => f.write_str("batch_signature"),
            ArtifactKey::CoordinatorAddress => f.write_str("coordinator_address"),
            ArtifactKey::VersionMarker => f.write_str("version"),
        }
    }
}

/// Appliance identifier sent as `qrId` (uppercase MAC of the wifi interface).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_uppercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_id_bounds() {
        assert!(SlotId::new(0).is_err());
        assert!(SlotId::new(1).is_ok());
        assert!(SlotId::new(SLOT_COUNT).is_ok());
        assert!(SlotId::new(SLOT_COUNT + 1).is_err());
        assert!(SlotId::from_wire(300).is_err());
    }

    #[test]
    fn test_all_slots_ascending() {
        let slots: Vec<u8> = SlotId::all().map(SlotId::get).collect();
        assert_eq!(slots, (1..=SLOT_COUNT).collect::<Vec<_>>());
    }

    #[test]
    fn test_status_codes_round_trip() {
        for status in [SlotStatus::Empty, SlotStatus::Ready, SlotStatus::Consumed] {
            assert_eq!(SlotStatus::from_code(status.code()), Some(status));
        }
        assert_eq!(SlotStatus::from_code(7), None);
    }

    #[test]
    fn test_needs_refill() {
        assert!(SlotStatus::Empty.needs_refill());
        assert!(SlotStatus::Consumed.needs_refill());
        assert!(!SlotStatus::Ready.needs_refill());
    }

    #[test]
    fn test_device_id_uppercased() {
        let id = DeviceId::new("b8:27:eb:aa:01:ff\n");
        assert_eq!(id.as_str(), "B8:27:EB:AA:01:FF");
    }
}
