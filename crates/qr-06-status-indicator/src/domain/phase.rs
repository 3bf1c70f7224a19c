//! # Status Phases
//!
//! | phase | red | yellow | green |
//! |---|---|---|---|
//! | Booting | off | steady | off |
//! | Online | off | off | steady |
//! | CoordinatorUnreachable | off | blink | off |
//! | HardwareFault | blink | off | off |
//! | Updating | off | fast blink | off |
//! | SafeShutdown | steady | off | off |

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Led {
    Red,
    Yellow,
    Green,
}

impl Led {
    pub const ALL: [Led; 3] = [Led::Red, Led::Yellow, Led::Green];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    Off,
    Steady,
    Blink,
    FastBlink,
}

impl LedMode {
    pub fn is_blinking(self) -> bool {
        matches!(self, LedMode::Blink | LedMode::FastBlink)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedPattern {
    pub red: LedMode,
    pub yellow: LedMode,
    pub green: LedMode,
}

impl LedPattern {
    pub fn mode(&self, led: Led) -> LedMode {
        match led {
            Led::Red => self.red,
            Led::Yellow => self.yellow,
            Led::Green => self.green,
        }
    }

    /// The blinking LED, if any. At most one LED blinks per phase.
    pub fn blinking(&self) -> Option<(Led, LedMode)> {
        Led::ALL
            .into_iter()
            .map(|led| (led, self.mode(led)))
            .find(|(_, mode)| mode.is_blinking())
    }
}

/// Appliance health as shown to someone standing next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusPhase {
    Booting,
    Online,
    CoordinatorUnreachable,
    HardwareFault,
    Updating,
    SafeShutdown,
}

impl StatusPhase {
    pub fn pattern(self) -> LedPattern {
        use LedMode::{Blink, FastBlink, Off, Steady};
        let (red, yellow, green) = match self {
            StatusPhase::Booting => (Off, Steady, Off),
            StatusPhase::Online => (Off, Off, Steady),
            StatusPhase::CoordinatorUnreachable => (Off, Blink, Off),
            StatusPhase::HardwareFault => (Blink, Off, Off),
            StatusPhase::Updating => (Off, FastBlink, Off),
            StatusPhase::SafeShutdown => (Steady, Off, Off),
        };
        LedPattern { red, yellow, green }
    }
}

impl fmt::Display for StatusPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StatusPhase::Booting => "booting",
            StatusPhase::Online => "online",
            StatusPhase::CoordinatorUnreachable => "coordinator-unreachable",
            StatusPhase::HardwareFault => "hardware-fault",
            StatusPhase::Updating => "updating",
            StatusPhase::SafeShutdown => "safe-shutdown",
        };
        f.write_str(name)
    }
}
