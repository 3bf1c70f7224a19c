//! Legacy sysfs GPIO interface (`/sys/class/gpio`).

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{StatusError, StatusResult};
use crate::ports::GpioOutput;

pub struct SysfsGpio {
    root: PathBuf,
}

impl SysfsGpio {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn pin_dir(&self, pin: u32) -> PathBuf {
        self.root.join(format!("gpio{pin}"))
    }
}

fn write_attr(path: &Path, value: &str) -> std::io::Result<()> {
    fs::write(path, value)
}

impl GpioOutput for SysfsGpio {
    fn configure_output(&mut self, pin: u32) -> StatusResult<()> {
        let setup = |e: std::io::Error| StatusError::Setup {
            pin,
            reason: e.to_string(),
        };

        let dir = self.pin_dir(pin);
        if !dir.exists() {
            write_attr(&self.root.join("export"), &pin.to_string()).map_err(setup)?;
            debug!(pin, "[qr-06] gpio exported");
        }
        write_attr(&dir.join("direction"), "out").map_err(setup)
    }

    fn write(&mut self, pin: u32, high: bool) -> StatusResult<()> {
        write_attr(&self.pin_dir(pin).join("value"), if high { "1" } else { "0" }).map_err(|e| {
            StatusError::Write {
                pin,
                reason: e.to_string(),
            }
        })
    }
}
