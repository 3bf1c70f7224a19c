//! Batch commitments.

use sha2::{Digest, Sha256};
use shared_types::{Hash, SlotId};

/// A slot hash claimed for the current batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClaimedHash {
    pub slot: SlotId,
    /// Hex SHA-256 of the slot's random block.
    pub hash: String,
}

/// Result of finalizing a batch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BatchCommitment {
    /// Claimed hashes in ascending slot order.
    pub claimed: Vec<ClaimedHash>,
    /// Hardware signature over [`combined_digest`], absent when not joining.
    pub signature: Option<Vec<u8>>,
}

impl BatchCommitment {
    /// Empty batch: the appliance sits this round out.
    pub fn not_joining() -> Self {
        Self::default()
    }

    pub fn is_joining(&self) -> bool {
        !self.claimed.is_empty() && self.signature.is_some()
    }

    /// Hex signature, empty when not joining.
    pub fn signature_hex(&self) -> String {
        self.signature.as_deref().map(hex::encode).unwrap_or_default()
    }
}

/// SHA-256 over the concatenated hash texts, in the given order.
pub fn combined_digest(claimed: &[ClaimedHash]) -> Hash {
    let mut hasher = Sha256::new();
    for entry in claimed {
        hasher.update(entry.hash.as_bytes());
    }
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_joining_has_empty_signature() {
        let commitment = BatchCommitment::not_joining();
        assert!(!commitment.is_joining());
        assert_eq!(commitment.signature_hex(), "");
    }

    #[test]
    fn test_combined_digest_is_concatenation() {
        let claimed = vec![
            ClaimedHash {
                slot: SlotId::new(1).unwrap(),
                hash: "aa".to_string(),
            },
            ClaimedHash {
                slot: SlotId::new(4).unwrap(),
                hash: "bb".to_string(),
            },
        ];
        let expected: Hash = Sha256::digest(b"aabb").into();
        assert_eq!(combined_digest(&claimed), expected);
    }
}
