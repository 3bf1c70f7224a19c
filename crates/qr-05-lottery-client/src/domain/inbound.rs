//! # Inbound Coordinator Messages
//!
//! Every frame from the coordinator is decoded once into
//! [`InboundMessage`]; dispatch matches on it exhaustively.

use serde::Deserialize;
use shared_types::{Envelope, MessageName, WireError};

/// Round phase reported by `getLotteryTime`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LotteryPhase {
    /// Commitments are being accepted.
    Collecting,
    Other(String),
}

impl LotteryPhase {
    pub fn parse(text: &str) -> Self {
        if text.trim().eq_ignore_ascii_case("collecting") {
            LotteryPhase::Collecting
        } else {
            LotteryPhase::Other(text.to_string())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    /// Response to `loginVqr`.
    LoginAccepted,
    /// Response to `registerWallet`.
    WalletsRegistered,
    /// Response to `getLotteryTime`.
    Schedule { phase: LotteryPhase, deadline: String },
    /// Response to `lotteryStart`.
    CommitmentAcknowledged,
    /// `luckyWallet`: round drawn, next round announced.
    RoundConcluded {
        winner_wallet: String,
        next_round_start: String,
    },
    /// `lotteryResult`: reveal chunk request for the winning wallet.
    RevealRequest {
        winner_wallet: String,
        total_packets: u32,
        current_packet: u32,
    },
    /// Message name not handled on this socket.
    Unrecognized { name: String },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScheduleBody {
    #[serde(default)]
    lottery_phase: String,
    #[serde(default)]
    lottery_time: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LuckyWalletBody {
    #[serde(default)]
    wallet_addr: String,
    #[serde(default)]
    next_lottery_start: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LotteryResultBody {
    winner_wallet: String,
    #[serde(default)]
    total_packets: u32,
    #[serde(default)]
    current_packet: u32,
}

impl InboundMessage {
    pub fn decode(envelope: &Envelope) -> Result<Self, WireError> {
        let Some(name) = envelope.name() else {
            return Ok(InboundMessage::Unrecognized {
                name: envelope.header.message_name.clone(),
            });
        };

        Ok(match name {
            MessageName::LoginVqr => InboundMessage::LoginAccepted,
            MessageName::RegisterWallet => InboundMessage::WalletsRegistered,
            MessageName::LotteryStart => InboundMessage::CommitmentAcknowledged,
            MessageName::GetLotteryTime => {
                let body: ScheduleBody = envelope.body_as()?;
                InboundMessage::Schedule {
                    phase: LotteryPhase::parse(&body.lottery_phase),
                    deadline: body.lottery_time,
                }
            }
            MessageName::LuckyWallet => {
                let body: LuckyWalletBody = envelope.body_as()?;
                InboundMessage::RoundConcluded {
                    winner_wallet: body.wallet_addr,
                    next_round_start: body.next_lottery_start,
                }
            }
            MessageName::LotteryResult => {
                let body: LotteryResultBody = envelope.body_as()?;
                InboundMessage::RevealRequest {
                    winner_wallet: body.winner_wallet,
                    total_packets: body.total_packets,
                    current_packet: body.current_packet,
                }
            }
            MessageName::WirelessConf | MessageName::WalletAddr | MessageName::CoordinatorIpConf => {
                InboundMessage::Unrecognized {
                    name: name.as_str().to_string(),
                }
            }
        })
    }
}
