//! # Wire Envelope
//!
//! Every message exchanged with the coordinator (TCP) or a provisioning
//! client (wireless) is a JSON object `{ "header": {...}, "body": {...} }`.
//! The header carries a fixed checksum code per message name and the byte
//! length of the compact-serialized body.

use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::WireError;

/// Protocol version stamped into every outbound header.
pub const PROTOCOL_VERSION: &str = "1.0";

/// Known message names and their checksum codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageName {
    WirelessConf,
    WalletAddr,
    CoordinatorIpConf,
    LotteryStart,
    LotteryResult,
    LuckyWallet,
    LoginVqr,
    RegisterWallet,
    GetLotteryTime,
}

impl MessageName {
    pub const ALL: [MessageName; 9] = [
        MessageName::WirelessConf,
        MessageName::WalletAddr,
        MessageName::CoordinatorIpConf,
        MessageName::LotteryStart,
        MessageName::LotteryResult,
        MessageName::LuckyWallet,
        MessageName::LoginVqr,
        MessageName::RegisterWallet,
        MessageName::GetLotteryTime,
    ];

    /// Name as it appears in `header.messageName`.
    pub fn as_str(self) -> &'static str {
        match self {
            MessageName::WirelessConf => "wirelessConf",
            MessageName::WalletAddr => "walletAddr",
            MessageName::CoordinatorIpConf => "vqrIPConf",
            MessageName::LotteryStart => "lotteryStart",
            MessageName::LotteryResult => "lotteryResult",
            MessageName::LuckyWallet => "luckyWallet",
            MessageName::LoginVqr => "loginVqr",
            MessageName::RegisterWallet => "registerWallet",
            MessageName::GetLotteryTime => "getLotteryTime",
        }
    }

    /// Fixed checksum code carried in `header.checksum`.
    pub fn checksum(self) -> u32 {
        match self {
            MessageName::WirelessConf => 11001,
            MessageName::WalletAddr => 11002,
            MessageName::CoordinatorIpConf => 11003,
            MessageName::LotteryStart => 21001,
            MessageName::LotteryResult => 21002,
            MessageName::LuckyWallet => 21003,
            MessageName::LoginVqr => 21004,
            MessageName::RegisterWallet => 21005,
            MessageName::GetLotteryTime => 21006,
        }
    }

    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|candidate| candidate.as_str() == name)
    }
}

impl fmt::Display for MessageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    #[default]
    #[serde(alias = "Request", alias = "REQUEST")]
    Request,
    #[serde(alias = "Response", alias = "RESPONSE")]
    Response,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    #[serde(default)]
    pub checksum: u32,
    #[serde(default)]
    pub message_length: usize,
    pub message_name: String,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub version: String,
}

/// A `{header, body}` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub header: MessageHeader,
    #[serde(default)]
    pub body: Value,
}

impl Envelope {
    /// Build an outbound envelope, filling in checksum and body length.
    pub fn new<B: Serialize>(
        name: MessageName,
        message_type: MessageType,
        body: &B,
    ) -> Result<Self, WireError> {
        let body = serde_json::to_value(body).map_err(WireError::from)?;
        Ok(Self {
            header: MessageHeader {
                checksum: name.checksum(),
                message_length: body_length(&body)?,
                message_name: name.as_str().to_string(),
                message_type,
                version: PROTOCOL_VERSION.to_string(),
            },
            body,
        })
    }

    pub fn request<B: Serialize>(name: MessageName, body: &B) -> Result<Self, WireError> {
        Self::new(name, MessageType::Request, body)
    }

    pub fn response<B: Serialize>(name: MessageName, body: &B) -> Result<Self, WireError> {
        Self::new(name, MessageType::Response, body)
    }

    /// Parse one complete JSON envelope.
    pub fn from_slice(bytes: &[u8]) -> Result<Self, WireError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        if envelope.header.message_name.is_empty() {
            return Err(WireError::MissingMessageName);
        }
        Ok(envelope)
    }

    pub fn from_value(value: Value) -> Result<Self, WireError> {
        let envelope: Envelope = serde_json::from_value(value)?;
        if envelope.header.message_name.is_empty() {
            return Err(WireError::MissingMessageName);
        }
        Ok(envelope)
    }

    /// Compact JSON encoding.
    pub fn to_vec(&self) -> Result<Vec<u8>, WireError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Known message name, if any.
    pub fn name(&self) -> Option<MessageName> {
        MessageName::parse(&self.header.message_name)
    }

    /// Deserialize the body into a typed payload.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, WireError> {
        serde_json::from_value(self.body.clone()).map_err(|e| WireError::InvalidBody {
            message_name: self.header.message_name.clone(),
            reason: e.to_string(),
        })
    }
}

/// Byte length of the compact JSON encoding of `body`.
pub fn body_length(body: &Value) -> Result<usize, WireError> {
    Ok(serde_json::to_vec(body)?.len())
}
