//! Key manager configuration.

use std::time::Duration;

use crate::domain::SIGNING_KEY_INDEX;

#[derive(Debug, Clone)]
pub struct KeyManagerConfig {
    /// Pause between slots during provisioning so the module can settle.
    pub settle_delay: Duration,
    /// Upper bound on waiting for a response.
    pub response_timeout: Duration,
    /// Key index passed to every Sign command.
    pub signing_key_index: u8,
}

impl Default for KeyManagerConfig {
    fn default() -> Self {
        Self {
            settle_delay: Duration::from_millis(100),
            response_timeout: Duration::from_secs(3),
            signing_key_index: SIGNING_KEY_INDEX,
        }
    }
}

impl KeyManagerConfig {
    pub fn for_testing() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            response_timeout: Duration::from_millis(200),
            ..Self::default()
        }
    }
}
