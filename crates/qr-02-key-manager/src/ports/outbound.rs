//! Driven ports for the key manager.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::KeyManagerResult;

/// Half-duplex command channel to the secure module.
///
/// A response is "the next inbound data after the write". Callers hold
/// `&mut self` for the whole exchange, so two requests can never be
/// outstanding at once.
#[async_trait]
pub trait SerialChannel: Send {
    /// Open and configure the line. Opening an open channel is a no-op.
    async fn open(&mut self) -> KeyManagerResult<()>;

    /// Write `request` and collect the response until the line goes quiet.
    async fn exchange(&mut self, request: &[u8], timeout: Duration) -> KeyManagerResult<Vec<u8>>;

    /// Release the device. Closing a closed channel is a no-op.
    async fn close(&mut self);
}
