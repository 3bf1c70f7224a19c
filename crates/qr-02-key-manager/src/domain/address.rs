//! # Wallet Addresses
//!
//! The wallet address of a slot is the lower 20 bytes of Keccak-256 over the
//! slot's decompressed public key (as stored: lowercase hex text), rendered
//! with the EIP-55 mixed-case checksum.

use sha3::{Digest, Keccak256};
use shared_types::Hash;

use crate::error::{KeyManagerError, KeyManagerResult};

/// Keccak-256 hash of data.
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Derive the `0x`-prefixed EIP-55 wallet address for a decompressed key.
pub fn wallet_address_from(decompressed_public_key_hex: &str) -> String {
    let hash = keccak256(decompressed_public_key_hex.as_bytes());
    checksum_lowercase(&hex::encode(&hash[12..]))
}

/// Re-case a 20-byte hex address per EIP-55. Accepts any casing, with or
/// without `0x`.
pub fn to_checksum_address(address: &str) -> KeyManagerResult<String> {
    let digits = address
        .strip_prefix("0x")
        .or_else(|| address.strip_prefix("0X"))
        .unwrap_or(address);

    if digits.len() != 40 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(KeyManagerError::InvalidAddress {
            address: address.to_string(),
        });
    }

    Ok(checksum_lowercase(&digits.to_ascii_lowercase()))
}

/// Whether `address` already carries a correct EIP-55 casing.
pub fn is_checksummed(address: &str) -> bool {
    to_checksum_address(address)
        .map(|expected| expected == address)
        .unwrap_or(false)
}

// `lower` must be 40 lowercase hex digits.
fn checksum_lowercase(lower: &str) -> String {
    let checksum = keccak256(lower.as_bytes());

    let mut out = String::with_capacity(42);
    out.push_str("0x");
    for (i, c) in lower.chars().enumerate() {
        let byte = checksum[i / 2];
        let nibble = if i % 2 == 0 { byte >> 4 } else { byte & 0x0f };
        if nibble >= 8 {
            out.push(c.to_ascii_uppercase());
        } else {
            out.push(c);
        }
    }
    out
}
