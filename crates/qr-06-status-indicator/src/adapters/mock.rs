//! In-memory GPIO for tests.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{StatusError, StatusResult};
use crate::ports::GpioOutput;

#[derive(Debug, Default)]
struct GpioState {
    configured: BTreeSet<u32>,
    levels: BTreeMap<u32, bool>,
    writes: Vec<(u32, bool)>,
    failing: bool,
}

/// Records every level written. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct RecordingGpio {
    state: Arc<Mutex<GpioState>>,
}

impl RecordingGpio {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every subsequent call.
    pub fn set_failing(&self, failing: bool) {
        self.state.lock().failing = failing;
    }

    pub fn is_configured(&self, pin: u32) -> bool {
        self.state.lock().configured.contains(&pin)
    }

    /// Current level of `pin`; unwritten pins read low.
    pub fn level(&self, pin: u32) -> bool {
        self.state.lock().levels.get(&pin).copied().unwrap_or(false)
    }

    pub fn writes(&self) -> Vec<(u32, bool)> {
        self.state.lock().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state.lock().writes.clear();
    }
}

impl GpioOutput for RecordingGpio {
    fn configure_output(&mut self, pin: u32) -> StatusResult<()> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(StatusError::Setup {
                pin,
                reason: "simulated failure".to_string(),
            });
        }
        state.configured.insert(pin);
        Ok(())
    }

    fn write(&mut self, pin: u32, high: bool) -> StatusResult<()> {
        let mut state = self.state.lock();
        if state.failing {
            return Err(StatusError::Write {
                pin,
                reason: "simulated failure".to_string(),
            });
        }
        state.levels.insert(pin, high);
        state.writes.push((pin, high));
        Ok(())
    }
}
