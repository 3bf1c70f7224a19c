//! Outbound coordinator message bodies.

use serde::Serialize;
use shared_types::{DeviceId, Envelope, MessageName, WireError};

/// Public identity of one slot as registered with the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredWallet {
    pub wallet_address: String,
    pub public_key: String,
    /// Hex registration signature, empty if never signed.
    pub signature: String,
}

/// One committed slot in `lotteryStart`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitmentEntry {
    pub wallet_addr: String,
    pub random_hash: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginBody<'a> {
    qr_id: &'a str,
    wallet_addr: &'a str,
    pub_key: &'a str,
    signature: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletEntry<'a> {
    wallet_addr: &'a str,
    wallet_pub_key: &'a str,
    signature: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterBody<'a> {
    qr_id: &'a str,
    wallet_list: Vec<WalletEntry<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleQuery {
    lottery_phase: &'static str,
    lottery_time: &'static str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitmentBody<'a> {
    lottery_start: &'a str,
    qr_id: &'a str,
    is_join: &'static str,
    signature: String,
    lottery_list: &'a [CommitmentEntry],
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RevealChunkBody<'a> {
    random: &'a str,
    total_packets: u32,
    current_packet: u32,
    winner_wallet: &'a str,
}

/// `loginVqr` with the primary slot identity.
pub fn login_request(device: &DeviceId, primary: &RegisteredWallet) -> Result<Envelope, WireError> {
    Envelope::request(
        MessageName::LoginVqr,
        &LoginBody {
            qr_id: device.as_str(),
            wallet_addr: &primary.wallet_address,
            pub_key: &primary.public_key,
            signature: &primary.signature,
        },
    )
}

/// `registerWallet` with the secondary slot identities.
pub fn register_request(device: &DeviceId, wallets: &[RegisteredWallet]) -> Result<Envelope, WireError> {
    Envelope::request(
        MessageName::RegisterWallet,
        &RegisterBody {
            qr_id: device.as_str(),
            wallet_list: wallets
                .iter()
                .map(|wallet| WalletEntry {
                    wallet_addr: &wallet.wallet_address,
                    wallet_pub_key: &wallet.public_key,
                    signature: &wallet.signature,
                })
                .collect(),
        },
    )
}

pub fn schedule_request() -> Result<Envelope, WireError> {
    Envelope::request(
        MessageName::GetLotteryTime,
        &ScheduleQuery {
            lottery_phase: "",
            lottery_time: "",
        },
    )
}

/// `lotteryStart` commitment. Without a signature the appliance declares
/// it is not joining.
pub fn commitment_request(
    device: &DeviceId,
    round_deadline: &str,
    signature: Option<&[u8]>,
    entries: &[CommitmentEntry],
) -> Result<Envelope, WireError> {
    Envelope::request(
        MessageName::LotteryStart,
        &CommitmentBody {
            lottery_start: round_deadline,
            qr_id: device.as_str(),
            is_join: if signature.is_some() { "yes" } else { "no" },
            signature: signature.map(hex::encode).unwrap_or_default(),
            lottery_list: entries,
        },
    )
}

/// One `lotteryResult` reveal chunk.
pub fn reveal_response(
    chunk: &str,
    total_packets: u32,
    current_packet: u32,
    winner_wallet: &str,
) -> Result<Envelope, WireError> {
    Envelope::response(
        MessageName::LotteryResult,
        &RevealChunkBody {
            random: chunk,
            total_packets,
            current_packet,
            winner_wallet,
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn device() -> DeviceId {
        DeviceId::new("b8:27:eb:01:02:03")
    }

    fn wallet(n: u8) -> RegisteredWallet {
        RegisteredWallet {
            wallet_address: format!("0x{:040}", n),
            public_key: format!("02{:02}", n),
            signature: format!("ff{:02}", n),
        }
    }

    #[test]
    fn test_login_body() {
        let envelope = login_request(&device(), &wallet(1)).unwrap();
        assert_eq!(envelope.header.checksum, 21004);
        assert_eq!(
            envelope.body,
            json!({
                "qrId": "B8:27:EB:01:02:03",
                "walletAddr": wallet(1).wallet_address,
                "pubKey": "0201",
                "signature": "ff01",
            })
        );
    }

    #[test]
    fn test_register_body_lists_wallets() {
        let envelope = register_request(&device(), &[wallet(2), wallet(3)]).unwrap();
        assert_eq!(envelope.header.checksum, 21005);
        let list = envelope.body["walletList"].as_array().unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[1]["walletPubKey"], "0203");
        assert_eq!(list[1]["signature"], "ff03");
    }

    #[test]
    fn test_schedule_query_has_empty_fields() {
        let envelope = schedule_request().unwrap();
        assert_eq!(envelope.header.checksum, 21006);
        assert_eq!(envelope.body, json!({"lotteryPhase": "", "lotteryTime": ""}));
    }

    #[test]
    fn test_commitment_join_flag_follows_signature() {
        let entries = vec![CommitmentEntry {
            wallet_addr: "0xabc".to_string(),
            random_hash: "beef".to_string(),
        }];

        let joining =
            commitment_request(&device(), "20260101 12:00:00", Some(&[0xab, 0xcd][..]), &entries).unwrap();
        assert_eq!(joining.header.checksum, 21001);
        assert_eq!(joining.body["isJoin"], "yes");
        assert_eq!(joining.body["signature"], "abcd");
        assert_eq!(joining.body["lotteryStart"], "20260101 12:00:00");
        assert_eq!(
            joining.body["lotteryList"],
            json!([{"walletAddr": "0xabc", "randomHash": "beef"}])
        );

        let sitting_out = commitment_request(&device(), "20260101 12:00:00", None, &[]).unwrap();
        assert_eq!(sitting_out.body["isJoin"], "no");
        assert_eq!(sitting_out.body["signature"], "");
    }

    #[test]
    fn test_reveal_response_is_response_type() {
        let envelope = reveal_response("0a0b", 3, 1, "0xabc").unwrap();
        assert_eq!(envelope.header.checksum, 21002);
        assert_eq!(envelope.header.message_type, shared_types::MessageType::Response);
        assert_eq!(
            envelope.body,
            json!({"random": "0a0b", "totalPackets": 3, "currentPacket": 1, "winnerWallet": "0xabc"})
        );
    }
}
