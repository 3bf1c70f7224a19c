//! # qr-04-provisioning
//!
//! Short-range wireless configuration channel. A paired phone sends JSON
//! `{header, body}` requests over an RFCOMM serial device:
//!
//! | request | effect | response body |
//! |---|---|---|
//! | `wirelessConf` | rewrite network config, reconfigure | `{status}` |
//! | `walletAddr` | report slot identity, generating if missing | `{status, walletAddr, pubKey}` |
//! | `vqrIPConf` | persist coordinator address, connect | `{status}` |
//!
//! The stream has no delimiter; requests are recovered by incremental JSON
//! parsing.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::{NetworkConfig, ProvisioningConfig};
pub use domain::{ProvisioningRequest, WalletIdentity, WirelessCredentials};
pub use error::{ProvisioningError, ProvisioningResult};
pub use ports::{IdentityProvider, NetworkConfigurator, ResponseSink, WirelessEvent};
pub use service::{HandlerOutcome, ProvisioningHandler};
