//! Indicator wiring and blink rates.

use std::path::PathBuf;
use std::time::Duration;

/// GPIO line numbers of the three LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedPins {
    pub red: u32,
    pub yellow: u32,
    pub green: u32,
}

impl Default for LedPins {
    fn default() -> Self {
        Self {
            red: 17,
            yellow: 27,
            green: 22,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StatusConfig {
    /// sysfs GPIO class directory.
    pub gpio_root: PathBuf,
    pub pins: LedPins,
    /// Blink period for fault phases.
    pub blink_interval: Duration,
    /// Blink period while an update is staged.
    pub fast_blink_interval: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            gpio_root: PathBuf::from("/sys/class/gpio"),
            pins: LedPins::default(),
            blink_interval: Duration::from_secs(1),
            fast_blink_interval: Duration::from_millis(500),
        }
    }
}
