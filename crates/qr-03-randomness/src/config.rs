//! Randomness pipeline configuration.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Size of one random block in bytes.
    pub block_size: usize,
    /// Generator invocations allowed per attempt.
    pub max_invocations: u32,
    /// Delay between pipeline ticks once a block is accepted.
    pub tick_interval: Duration,
    /// Backoff after a generator or evaluator process fault.
    pub retry_backoff: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            block_size: 1024 * 1024,
            max_invocations: 1024,
            tick_interval: Duration::from_millis(10),
            retry_backoff: Duration::from_secs(1),
        }
    }
}

impl PipelineConfig {
    /// Tiny blocks for tests.
    pub fn for_testing() -> Self {
        Self {
            block_size: 64,
            max_invocations: 8,
            tick_interval: Duration::from_millis(1),
            retry_backoff: Duration::from_millis(10),
        }
    }
}
