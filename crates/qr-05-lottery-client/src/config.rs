//! Coordinator client configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct LotteryClientConfig {
    pub port: u16,
    pub connect_timeout: Duration,
    /// Retry period while disconnected.
    pub reconnect_interval: Duration,
    /// Largest inbound frame kept while waiting for its terminator.
    pub max_frame: usize,
    /// Hex characters per reveal chunk.
    pub chunk_chars: usize,
    /// Reveal session is dropped after this long without a request.
    pub packet_idle_timeout: Duration,
    /// The commitment is sent this long before the round deadline.
    pub deadline_lead: Duration,
    /// Below this much remaining time the commitment is sent at once.
    pub deadline_threshold: Duration,
}

impl Default for LotteryClientConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            connect_timeout: Duration::from_millis(1000),
            reconnect_interval: Duration::from_secs(5),
            max_frame: 256 * 1024,
            chunk_chars: 16384,
            packet_idle_timeout: Duration::from_secs(2),
            deadline_lead: Duration::from_secs(35),
            deadline_threshold: Duration::from_secs(30),
        }
    }
}

impl LotteryClientConfig {
    /// Small reveal chunks so short test blocks span several packets.
    pub fn for_testing() -> Self {
        Self {
            chunk_chars: 8,
            ..Self::default()
        }
    }
}
