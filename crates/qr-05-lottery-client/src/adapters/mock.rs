//! In-memory coordinator for tests.

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, NaiveDateTime};
use parking_lot::Mutex;
use shared_types::Envelope;
use tokio::sync::mpsc;

use crate::domain::{encode_frame, FrameDecoder};
use crate::error::{LotteryClientError, LotteryClientResult};
use crate::ports::{ConnectionId, CoordinatorConnector, CoordinatorLink, LinkEvent, WallClock};

#[derive(Default)]
struct MockState {
    refusing: bool,
    failing_sends: bool,
    connects: Vec<SocketAddr>,
    sent: Vec<(ConnectionId, Vec<u8>)>,
    closed: Vec<ConnectionId>,
    live: Option<(ConnectionId, mpsc::Sender<LinkEvent>)>,
}

/// Coordinator stand-in. Clones share state, so a test keeps one handle
/// while the client owns another.
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse subsequent connection attempts.
    pub fn set_refusing(&self, refusing: bool) {
        self.state.lock().refusing = refusing;
    }

    /// Fail subsequent sends on live links.
    pub fn set_failing_sends(&self, failing: bool) {
        self.state.lock().failing_sends = failing;
    }

    pub fn connect_attempts(&self) -> Vec<SocketAddr> {
        self.state.lock().connects.clone()
    }

    pub fn closed(&self) -> Vec<ConnectionId> {
        self.state.lock().closed.clone()
    }

    /// Connection id of the live link, if any.
    pub fn live_connection(&self) -> Option<ConnectionId> {
        self.state.lock().live.as_ref().map(|(conn, _)| *conn)
    }

    /// Every envelope the client has sent, decoded, in order.
    pub fn sent_envelopes(&self) -> Vec<Envelope> {
        let mut decoder = FrameDecoder::new(usize::MAX);
        let state = self.state.lock();
        state
            .sent
            .iter()
            .flat_map(|(_, bytes)| decoder.push(bytes))
            .filter_map(Result::ok)
            .collect()
    }

    /// Names of every message sent so far.
    pub fn sent_names(&self) -> Vec<String> {
        self.sent_envelopes()
            .into_iter()
            .map(|e| e.header.message_name)
            .collect()
    }

    pub fn clear_sent(&self) {
        self.state.lock().sent.clear();
    }

    /// Build the event a reader task would forward for `envelope`.
    pub fn frame_event(&self, envelope: &Envelope) -> Option<LinkEvent> {
        let conn = self.live_connection()?;
        let bytes = encode_frame(envelope).ok()?;
        Some(LinkEvent::Data { conn, bytes })
    }

    /// Push `envelope` through the live link's event channel.
    pub async fn deliver(&self, envelope: &Envelope) -> bool {
        let live = self.state.lock().live.clone();
        let Some((conn, events)) = live else {
            return false;
        };
        let Ok(bytes) = encode_frame(envelope) else {
            return false;
        };
        events.send(LinkEvent::Data { conn, bytes }).await.is_ok()
    }

    /// Simulate the coordinator dropping the live link.
    pub async fn drop_link(&self, reason: &str) -> bool {
        let live = self.state.lock().live.take();
        let Some((conn, events)) = live else {
            return false;
        };
        events
            .send(LinkEvent::Closed {
                conn,
                reason: reason.to_string(),
            })
            .await
            .is_ok()
    }
}

#[async_trait]
impl CoordinatorConnector for MockConnector {
    async fn connect(
        &self,
        addr: SocketAddr,
        conn: ConnectionId,
        events: mpsc::Sender<LinkEvent>,
    ) -> LotteryClientResult<Box<dyn CoordinatorLink>> {
        let mut state = self.state.lock();
        state.connects.push(addr);
        if state.refusing {
            return Err(LotteryClientError::Connect {
                addr,
                reason: "connection refused".to_string(),
            });
        }
        state.live = Some((conn, events));
        Ok(Box::new(MockLink {
            conn,
            state: self.state.clone(),
        }))
    }
}

struct MockLink {
    conn: ConnectionId,
    state: Arc<Mutex<MockState>>,
}

#[async_trait]
impl CoordinatorLink for MockLink {
    async fn send(&mut self, bytes: &[u8]) -> LotteryClientResult<()> {
        let mut state = self.state.lock();
        if state.failing_sends {
            return Err(LotteryClientError::Send {
                reason: "broken pipe".to_string(),
            });
        }
        state.sent.push((self.conn, bytes.to_vec()));
        Ok(())
    }

    async fn close(&mut self) {
        let mut state = self.state.lock();
        state.closed.push(self.conn);
        if state.live.as_ref().is_some_and(|(conn, _)| *conn == self.conn) {
            state.live = None;
        }
    }
}

/// Settable wall clock.
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<NaiveDateTime>>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: ChronoDuration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl WallClock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}
