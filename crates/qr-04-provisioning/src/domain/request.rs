//! # Provisioning Requests
//!
//! Inbound envelopes are decoded once into [`ProvisioningRequest`]; the
//! handler matches on it exhaustively. Responses always carry the same
//! message name (and therefore checksum) as the request.

use std::net::IpAddr;

use serde::{Deserialize, Serialize};
use shared_types::{Envelope, MessageName, SlotId, WireError};

use crate::error::{ProvisioningError, ProvisioningResult};

/// Credentials for the local wireless network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirelessCredentials {
    pub ssid: String,
    pub passphrase: String,
}

/// Public identity of one slot, as reported to the provisioning peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletIdentity {
    pub wallet_address: String,
    /// Hex compressed public key.
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningRequest {
    /// `wirelessConf`: rewrite the network configuration.
    WirelessConf(WirelessCredentials),
    /// `walletAddr`: report (creating if needed) a slot identity.
    WalletAddr { slot: SlotId },
    /// `vqrIPConf`: set the coordinator address and connect.
    CoordinatorIpConf { ip: IpAddr },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WirelessConfBody {
    wifi_name: String,
    #[serde(default)]
    wifi_pwd: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WalletAddrBody {
    key_no: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct IpConfBody {
    ip_addr: String,
}

impl ProvisioningRequest {
    pub fn from_envelope(envelope: &Envelope) -> ProvisioningResult<Self> {
        let name = match envelope.name() {
            Some(
                name @ (MessageName::WirelessConf
                | MessageName::WalletAddr
                | MessageName::CoordinatorIpConf),
            ) => name,
            _ => {
                return Err(ProvisioningError::UnsupportedMessage {
                    name: envelope.header.message_name.clone(),
                })
            }
        };
        let invalid = |reason: String| ProvisioningError::InvalidRequest {
            message_name: name.as_str(),
            reason,
        };

        match name {
            MessageName::WirelessConf => {
                let body: WirelessConfBody = envelope.body_as().map_err(|e| invalid(reason_of(e)))?;
                validate_conf_value("wifiName", &body.wifi_name, false).map_err(invalid)?;
                validate_conf_value("wifiPwd", &body.wifi_pwd, true).map_err(invalid)?;
                Ok(ProvisioningRequest::WirelessConf(WirelessCredentials {
                    ssid: body.wifi_name,
                    passphrase: body.wifi_pwd,
                }))
            }
            MessageName::WalletAddr => {
                let body: WalletAddrBody = envelope.body_as().map_err(|e| invalid(reason_of(e)))?;
                let slot = SlotId::from_wire(body.key_no).map_err(|e| invalid(e.to_string()))?;
                Ok(ProvisioningRequest::WalletAddr { slot })
            }
            _ => {
                let body: IpConfBody = envelope.body_as().map_err(|e| invalid(reason_of(e)))?;
                let ip = body
                    .ip_addr
                    .trim()
                    .parse::<IpAddr>()
                    .map_err(|_| invalid(format!("'{}' is not an IP address", body.ip_addr)))?;
                Ok(ProvisioningRequest::CoordinatorIpConf { ip })
            }
        }
    }

    pub fn message_name(&self) -> MessageName {
        match self {
            ProvisioningRequest::WirelessConf(_) => MessageName::WirelessConf,
            ProvisioningRequest::WalletAddr { .. } => MessageName::WalletAddr,
            ProvisioningRequest::CoordinatorIpConf { .. } => MessageName::CoordinatorIpConf,
        }
    }
}

fn reason_of(err: WireError) -> String {
    match err {
        WireError::InvalidBody { reason, .. } => reason,
        other => other.to_string(),
    }
}

/// Values end up inside quoted strings of the network config file.
fn validate_conf_value(field: &str, value: &str, allow_empty: bool) -> Result<(), String> {
    if value.is_empty() && !allow_empty {
        return Err(format!("{} is empty", field));
    }
    if value.chars().any(|c| c == '"' || c.is_control()) {
        return Err(format!("{} contains quote or control characters", field));
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Fail,
}

impl ResponseStatus {
    pub fn from_ok(ok: bool) -> Self {
        if ok {
            ResponseStatus::Success
        } else {
            ResponseStatus::Fail
        }
    }
}

#[derive(Serialize)]
struct StatusBody {
    status: ResponseStatus,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct WalletBody<'a> {
    status: ResponseStatus,
    wallet_addr: &'a str,
    pub_key: &'a str,
}

/// `{status}` response for `wirelessConf` and `vqrIPConf`.
pub fn status_response(name: MessageName, status: ResponseStatus) -> Result<Envelope, WireError> {
    Envelope::response(name, &StatusBody { status })
}

/// `walletAddr` response; a missing identity answers `fail` with empty fields.
pub fn wallet_response(identity: Option<&WalletIdentity>) -> Result<Envelope, WireError> {
    let body = match identity {
        Some(identity) => WalletBody {
            status: ResponseStatus::Success,
            wallet_addr: &identity.wallet_address,
            pub_key: &identity.public_key,
        },
        None => WalletBody {
            status: ResponseStatus::Fail,
            wallet_addr: "",
            pub_key: "",
        },
    };
    Envelope::response(MessageName::WalletAddr, &body)
}
