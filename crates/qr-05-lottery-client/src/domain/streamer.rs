//! # Reveal Packet Streamer
//!
//! After the draw the coordinator pulls the winning slot's random block in
//! hex chunks, one `lotteryResult` request per chunk. Indices are 1-based.
//!
//! ```text
//! [Idle] ──request (winner is ours)──→ [Streaming{expected, total}]
//!                                        │  same index   → resend
//!                                        │  other index  → jump
//!                                        │  chunk total sent → [Idle]
//!                                        └  idle > timeout   → [Idle]
//! ```
//!
//! At most one session exists. Chunks are not sent from the request
//! handler; the request marks a chunk pending and the packet-stream tick
//! takes it.

use std::time::Duration;

use shared_types::SlotId;
use tokio::time::Instant;

/// One chunk ready to send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealChunk {
    pub slot: SlotId,
    pub winner_wallet: String,
    pub index: u32,
    pub total: u32,
    pub data: String,
}

impl RevealChunk {
    pub fn is_last(&self) -> bool {
        self.index == self.total
    }
}

#[derive(Debug)]
struct RevealSession {
    slot: SlotId,
    winner_wallet: String,
    payload: String,
    total: u32,
    expected: u32,
    pending: Option<u32>,
    last_request: Instant,
}

/// Observable streamer state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamerState {
    Idle,
    Streaming { slot: SlotId, expected: u32, total: u32 },
}

/// Result of a chunk request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Chunk `index` is pending for the next tick.
    Scheduled { index: u32 },
    /// Index outside `1..=total`.
    Ignored,
}

#[derive(Debug)]
pub struct PacketStreamer {
    chunk_chars: usize,
    idle_timeout: Duration,
    session: Option<RevealSession>,
}

impl PacketStreamer {
    pub fn new(chunk_chars: usize, idle_timeout: Duration) -> Self {
        Self {
            chunk_chars: chunk_chars.max(1),
            idle_timeout,
            session: None,
        }
    }

    pub fn state(&self) -> StreamerState {
        match &self.session {
            Some(session) => StreamerState::Streaming {
                slot: session.slot,
                expected: session.expected,
                total: session.total,
            },
            None => StreamerState::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Whether the running session streams to `winner_wallet`.
    pub fn serves(&self, winner_wallet: &str) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.winner_wallet.eq_ignore_ascii_case(winner_wallet))
    }

    /// Start a session over `payload` (hex text). Replaces any running
    /// session. Returns the chunk count, zero for an empty payload.
    pub fn begin(&mut self, slot: SlotId, winner_wallet: &str, payload: String, now: Instant) -> u32 {
        let total = payload.len().div_ceil(self.chunk_chars) as u32;
        if total == 0 {
            self.session = None;
            return 0;
        }
        self.session = Some(RevealSession {
            slot,
            winner_wallet: winner_wallet.to_string(),
            payload,
            total,
            expected: 1,
            pending: None,
            last_request: now,
        });
        total
    }

    /// Drop the session if no request arrived within the idle timeout.
    pub fn expire_if_idle(&mut self, now: Instant) -> bool {
        let expired = self
            .session
            .as_ref()
            .is_some_and(|s| now.duration_since(s.last_request) > self.idle_timeout);
        if expired {
            self.session = None;
        }
        expired
    }

    /// Register a request for chunk `index`.
    pub fn request(&mut self, index: u32, now: Instant) -> RequestOutcome {
        let Some(session) = self.session.as_mut() else {
            return RequestOutcome::Ignored;
        };
        if index == 0 || index > session.total {
            return RequestOutcome::Ignored;
        }
        session.last_request = now;
        session.expected = index;
        session.pending = Some(index);
        RequestOutcome::Scheduled { index }
    }

    /// Take the pending chunk. Taking the final chunk ends the session.
    pub fn take_pending(&mut self) -> Option<RevealChunk> {
        let session = self.session.as_mut()?;
        let index = session.pending.take()?;

        let start = (index as usize - 1) * self.chunk_chars;
        let end = (start + self.chunk_chars).min(session.payload.len());
        let chunk = RevealChunk {
            slot: session.slot,
            winner_wallet: session.winner_wallet.clone(),
            index,
            total: session.total,
            data: session.payload[start..end].to_string(),
        };

        if chunk.is_last() {
            self.session = None;
        } else {
            session.expected = index + 1;
        }
        Some(chunk)
    }

    pub fn cancel(&mut self) -> bool {
        self.session.take().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IDLE: Duration = Duration::from_secs(2);

    fn slot() -> SlotId {
        SlotId::new(4).unwrap()
    }

    fn streamer_with(payload: &str, now: Instant) -> PacketStreamer {
        let mut streamer = PacketStreamer::new(4, IDLE);
        streamer.begin(slot(), "0xWinner", payload.to_string(), now);
        streamer
    }

    fn send(streamer: &mut PacketStreamer, index: u32, now: Instant) -> Option<RevealChunk> {
        streamer.request(index, now);
        streamer.take_pending()
    }

    #[test]
    fn test_begin_counts_chunks() {
        let now = Instant::now();
        let mut streamer = PacketStreamer::new(4, IDLE);
        assert_eq!(streamer.begin(slot(), "0xW", "aabbccdd".to_string(), now), 2);
        assert_eq!(streamer.begin(slot(), "0xW", "aabbccddee".to_string(), now), 3);
        assert_eq!(streamer.begin(slot(), "0xW", String::new(), now), 0);
        assert!(!streamer.is_active());
    }

    #[test]
    fn test_repeat_resends_and_last_chunk_frees_session() {
        let now = Instant::now();
        let mut streamer = streamer_with("0011223344", now);

        let sent: Vec<(u32, String)> = [1, 1, 2, 3]
            .into_iter()
            .map(|i| {
                let chunk = send(&mut streamer, i, now).unwrap();
                (chunk.index, chunk.data)
            })
            .collect();

        assert_eq!(
            sent,
            vec![
                (1, "0011".to_string()),
                (1, "0011".to_string()),
                (2, "2233".to_string()),
                (3, "44".to_string()),
            ]
        );
        assert_eq!(streamer.state(), StreamerState::Idle);
    }

    #[test]
    fn test_out_of_range_request_is_ignored() {
        let now = Instant::now();
        let mut streamer = streamer_with("00112233", now);

        assert_eq!(streamer.request(0, now), RequestOutcome::Ignored);
        assert_eq!(streamer.request(3, now), RequestOutcome::Ignored);
        assert!(streamer.take_pending().is_none());
        assert!(streamer.is_active());
    }

    #[test]
    fn test_jump_to_other_index() {
        let now = Instant::now();
        let mut streamer = streamer_with("001122334455", now);

        assert_eq!(send(&mut streamer, 2, now).unwrap().data, "2233");
        assert_eq!(
            streamer.state(),
            StreamerState::Streaming {
                slot: slot(),
                expected: 3,
                total: 3
            }
        );
    }

    #[test]
    fn test_idle_session_expires() {
        let start = Instant::now();
        let mut streamer = streamer_with("00112233", start);
        send(&mut streamer, 1, start);

        assert!(!streamer.expire_if_idle(start + Duration::from_millis(1500)));
        assert!(streamer.expire_if_idle(start + Duration::from_secs(3)));
        assert!(!streamer.is_active());
        assert_eq!(streamer.request(2, start + Duration::from_secs(3)), RequestOutcome::Ignored);
    }

    #[test]
    fn test_serves_matches_case_insensitively() {
        let streamer = streamer_with("00", Instant::now());
        assert!(streamer.serves("0xwinner"));
        assert!(!streamer.serves("0xother"));
    }
}
