//! Error types for the coordinator client.

use std::net::SocketAddr;

use qr_01_slot_ledger::ArtifactError;
use shared_types::WireError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LotteryClientError {
    /// No coordinator address has been configured.
    #[error("No coordinator address configured")]
    NoCoordinator,

    /// TCP connect refused or failed (TransportError).
    #[error("Connect to {addr} failed: {reason}")]
    Connect { addr: SocketAddr, reason: String },

    /// TCP connect did not complete in time (TransportError).
    #[error("Connect to {addr} timed out after {timeout_ms}ms")]
    ConnectTimeout { addr: SocketAddr, timeout_ms: u64 },

    /// Operation needs an established connection.
    #[error("Not connected to coordinator")]
    NotConnected,

    /// Socket write failed (TransportError).
    #[error("Send failed: {reason}")]
    Send { reason: String },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl LotteryClientError {
    /// Whether the failure came from the socket rather than local state.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            LotteryClientError::Connect { .. }
                | LotteryClientError::ConnectTimeout { .. }
                | LotteryClientError::Send { .. }
        )
    }
}

pub type LotteryClientResult<T> = Result<T, LotteryClientError>;
