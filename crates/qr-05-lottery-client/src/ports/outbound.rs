//! Driven ports for the coordinator client.

use std::net::SocketAddr;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::mpsc;

use crate::error::LotteryClientResult;

/// Identifies one connection attempt; events from older links are stale.
pub type ConnectionId = u64;

/// Forwarded by the link's reader task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    Data { conn: ConnectionId, bytes: Vec<u8> },
    Closed { conn: ConnectionId, reason: String },
}

/// Opens coordinator links. Inbound traffic is delivered on `events`.
#[async_trait]
pub trait CoordinatorConnector: Send + Sync {
    async fn connect(
        &self,
        addr: SocketAddr,
        conn: ConnectionId,
        events: mpsc::Sender<LinkEvent>,
    ) -> LotteryClientResult<Box<dyn CoordinatorLink>>;
}

/// Write half of an established link.
#[async_trait]
pub trait CoordinatorLink: Send {
    async fn send(&mut self, bytes: &[u8]) -> LotteryClientResult<()>;

    /// Close the link. No further events are delivered for it.
    async fn close(&mut self);
}

/// Local wall clock the round schedule is expressed in.
pub trait WallClock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}
