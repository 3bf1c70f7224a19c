//! # Status Indicator Service
//!
//! Applies a [`StatusPhase`] to the LEDs. Blinking is driven from outside:
//! [`StatusIndicator::show`] and [`StatusIndicator::toggle_blink`] return
//! the period after which `toggle_blink` should run again.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::StatusConfig;
use crate::domain::{Led, LedMode, StatusPhase};
use crate::error::StatusResult;
use crate::ports::GpioOutput;

pub struct StatusIndicator {
    config: StatusConfig,
    gpio: Box<dyn GpioOutput>,
    phase: Option<StatusPhase>,
    blink_high: bool,
}

impl StatusIndicator {
    pub fn new(config: StatusConfig, gpio: Box<dyn GpioOutput>) -> Self {
        Self {
            config,
            gpio,
            phase: None,
            blink_high: false,
        }
    }

    /// Configure every LED line as an output.
    pub fn init(&mut self) -> StatusResult<()> {
        for led in Led::ALL {
            let pin = self.pin(led);
            self.gpio.configure_output(pin)?;
        }
        Ok(())
    }

    pub fn phase(&self) -> Option<StatusPhase> {
        self.phase
    }

    /// Switch to `phase`. Returns the blink period if the phase blinks.
    /// Showing the current phase again leaves the LEDs alone.
    pub fn show(&mut self, phase: StatusPhase) -> StatusResult<Option<Duration>> {
        if self.phase == Some(phase) {
            return Ok(self.blink_period());
        }

        let pattern = phase.pattern();
        self.blink_high = true;
        for led in Led::ALL {
            let high = !matches!(pattern.mode(led), LedMode::Off);
            let pin = self.pin(led);
            self.gpio.write(pin, high)?;
        }
        self.phase = Some(phase);
        info!(%phase, "[qr-06] status changed");
        Ok(self.blink_period())
    }

    /// Flip the blinking LED. Returns `None` when nothing blinks, meaning
    /// the blink timer can stay stopped.
    pub fn toggle_blink(&mut self) -> StatusResult<Option<Duration>> {
        let Some((led, _)) = self.phase.and_then(|p| p.pattern().blinking()) else {
            return Ok(None);
        };
        self.blink_high = !self.blink_high;
        let pin = self.pin(led);
        self.gpio.write(pin, self.blink_high)?;
        Ok(self.blink_period())
    }

    /// Red on, everything else off. Every LED is attempted even if one
    /// write fails.
    pub fn safe_state(&mut self) -> StatusResult<()> {
        let mut first_error = None;
        for led in Led::ALL {
            let pin = self.pin(led);
            if let Err(e) = self.gpio.write(pin, led == Led::Red) {
                warn!(error = %e, "[qr-06] safe state write failed");
                first_error.get_or_insert(e);
            }
        }
        self.phase = Some(StatusPhase::SafeShutdown);
        debug!("[qr-06] outputs in safe state");
        first_error.map_or(Ok(()), Err)
    }

    fn blink_period(&self) -> Option<Duration> {
        let (_, mode) = self.phase?.pattern().blinking()?;
        Some(match mode {
            LedMode::FastBlink => self.config.fast_blink_interval,
            _ => self.config.blink_interval,
        })
    }

    fn pin(&self, led: Led) -> u32 {
        let pins = self.config.pins;
        match led {
            Led::Red => pins.red,
            Led::Yellow => pins.yellow,
            Led::Green => pins.green,
        }
    }
}
