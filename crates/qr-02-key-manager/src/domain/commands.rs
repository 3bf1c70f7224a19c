//! Secure module command encoding.
//!
//! | Command | Bytes |
//! |---------|-------|
//! | NewKey | `4E 4B <slot>` |
//! | Decompress | `44 50 <raw public key>` |
//! | Sign | `53 48 <key index> <32-byte digest>` |

use shared_types::{Hash, SlotId};

/// Key index used for every signature the appliance requests.
pub const SIGNING_KEY_INDEX: u8 = 1;

/// One request on the half-duplex serial channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HardwareCommand {
    /// Generate (or recall) the keypair for a slot.
    NewKey { slot: SlotId },
    /// Expand a raw public key into its decompressed form.
    Decompress { raw_public_key: Vec<u8> },
    /// Sign a 32-byte digest.
    Sign { key_index: u8, digest: Hash },
}

impl HardwareCommand {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            HardwareCommand::NewKey { slot } => vec![0x4E, 0x4B, slot.get()],
            HardwareCommand::Decompress { raw_public_key } => {
                let mut frame = Vec::with_capacity(2 + raw_public_key.len());
                frame.extend_from_slice(&[0x44, 0x50]);
                frame.extend_from_slice(raw_public_key);
                frame
            }
            HardwareCommand::Sign { key_index, digest } => {
                let mut frame = Vec::with_capacity(3 + digest.len());
                frame.extend_from_slice(&[0x53, 0x48, *key_index]);
                frame.extend_from_slice(digest);
                frame
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HardwareCommand::NewKey { .. } => "NewKey",
            HardwareCommand::Decompress { .. } => "Decompress",
            HardwareCommand::Sign { .. } => "Sign",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_key_frame() {
        let slot = SlotId::new(7).unwrap();
        assert_eq!(HardwareCommand::NewKey { slot }.encode(), vec![b'N', b'K', 7]);
    }

    #[test]
    fn test_decompress_frame() {
        let frame = HardwareCommand::Decompress {
            raw_public_key: vec![0x02, 0xAB],
        }
        .encode();
        assert_eq!(frame, vec![b'D', b'P', 0x02, 0xAB]);
    }

    #[test]
    fn test_sign_frame() {
        let frame = HardwareCommand::Sign {
            key_index: SIGNING_KEY_INDEX,
            digest: [0x11; 32],
        }
        .encode();
        assert_eq!(frame.len(), 35);
        assert_eq!(&frame[..3], &[b'S', b'H', 1]);
        assert!(frame[3..].iter().all(|b| *b == 0x11));
    }
}
