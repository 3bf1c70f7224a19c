//! # Provisioning Handler
//!
//! Decodes requests from the wireless byte stream and answers each with
//! exactly one response. Coordinator reconfiguration needs the lottery
//! client, which this crate does not own, so it is returned to the caller
//! as [`HandlerOutcome::ConnectCoordinator`]; the caller answers it with
//! [`ProvisioningHandler::coordinator_reply`] once the attempt completes.

use std::net::IpAddr;
use std::sync::Arc;

use shared_types::{Envelope, MessageName};
use tracing::{debug, info, warn};

use crate::config::ProvisioningConfig;
use crate::domain::{
    status_response, wallet_response, JsonStreamSplitter, ProvisioningRequest, ResponseStatus,
};
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::ports::{IdentityProvider, NetworkConfigurator};

#[derive(Debug, Clone, PartialEq)]
pub enum HandlerOutcome {
    /// Response ready to send.
    Reply(Envelope),
    /// Persist `ip` as the coordinator address and connect to it.
    ConnectCoordinator { ip: IpAddr },
}

pub struct ProvisioningHandler {
    network: Arc<dyn NetworkConfigurator>,
    identities: Arc<dyn IdentityProvider>,
    splitter: JsonStreamSplitter,
}

impl ProvisioningHandler {
    pub fn new(
        config: &ProvisioningConfig,
        network: Arc<dyn NetworkConfigurator>,
        identities: Arc<dyn IdentityProvider>,
    ) -> Self {
        Self {
            network,
            identities,
            splitter: JsonStreamSplitter::new(config.max_buffer),
        }
    }

    /// Feed raw channel bytes; returns one outcome per complete request.
    pub async fn on_bytes(&mut self, bytes: &[u8]) -> Vec<HandlerOutcome> {
        let mut outcomes = Vec::new();
        for decoded in self.splitter.push(bytes) {
            let envelope = match decoded {
                Ok(envelope) => envelope,
                Err(e) => {
                    warn!(error = %e, "[qr-04] dropping malformed request");
                    continue;
                }
            };
            match self.dispatch(&envelope).await {
                Ok(Some(outcome)) => outcomes.push(outcome),
                Ok(None) => {}
                Err(e) => warn!(error = %e, "[qr-04] could not build response"),
            }
        }
        outcomes
    }

    /// Peer disconnected; discard partial input.
    pub fn on_closed(&mut self) {
        if self.splitter.pending() > 0 {
            debug!(pending = self.splitter.pending(), "[qr-04] discarding partial request");
        }
        self.splitter.reset();
    }

    /// Handle one decoded request.
    pub async fn handle(&self, request: ProvisioningRequest) -> ProvisioningResult<HandlerOutcome> {
        match request {
            ProvisioningRequest::WirelessConf(credentials) => {
                let status = match self.network.apply(&credentials).await {
                    Ok(()) => ResponseStatus::Success,
                    Err(e) => {
                        warn!(error = %e, "[qr-04] wireless configuration failed");
                        ResponseStatus::Fail
                    }
                };
                Ok(HandlerOutcome::Reply(status_response(
                    MessageName::WirelessConf,
                    status,
                )?))
            }
            ProvisioningRequest::WalletAddr { slot } => {
                let identity = match self.identities.ensure_identity(slot).await {
                    Ok(identity) => Some(identity),
                    Err(e) => {
                        warn!(slot = slot.get(), error = %e, "[qr-04] wallet lookup failed");
                        None
                    }
                };
                Ok(HandlerOutcome::Reply(wallet_response(identity.as_ref())?))
            }
            ProvisioningRequest::CoordinatorIpConf { ip } => {
                info!(%ip, "[qr-04] coordinator address received");
                Ok(HandlerOutcome::ConnectCoordinator { ip })
            }
        }
    }

    /// Response to a `vqrIPConf` request once the connection attempt is done.
    pub fn coordinator_reply(connected: bool) -> ProvisioningResult<Envelope> {
        Ok(status_response(
            MessageName::CoordinatorIpConf,
            ResponseStatus::from_ok(connected),
        )?)
    }

    async fn dispatch(&self, envelope: &Envelope) -> ProvisioningResult<Option<HandlerOutcome>> {
        match ProvisioningRequest::from_envelope(envelope) {
            Ok(request) => {
                debug!(message = request.message_name().as_str(), "[qr-04] request");
                self.handle(request).await.map(Some)
            }
            Err(ProvisioningError::UnsupportedMessage { name }) => {
                debug!(message = %name, "[qr-04] ignoring unsupported message");
                Ok(None)
            }
            Err(e) => {
                warn!(error = %e, "[qr-04] rejecting request");
                let reply = match envelope.name() {
                    Some(MessageName::WalletAddr) => wallet_response(None)?,
                    Some(name) => status_response(name, ResponseStatus::Fail)?,
                    None => return Ok(None),
                };
                Ok(Some(HandlerOutcome::Reply(reply)))
            }
        }
    }
}
