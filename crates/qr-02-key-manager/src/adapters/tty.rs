//! # TTY Serial Adapter
//!
//! Drives the secure module over a character device (`/dev/ttyACM0`).
//!
//! Line settings are applied with `stty` on open: fixed baud, 8 data bits,
//! no parity, 1 stop bit, raw mode, and `min 0 time 1` so a blocking read
//! returns after 100 ms of silence. Reads and writes run on the blocking
//! pool; the file handle moves into the blocking task and back, so a timed
//! out read can never linger and swallow the next response.
//!
//! ## Host Requirements
//!
//! The `stty` binary (coreutils or busybox) must be on `PATH`. Without it,
//! or when the device node is missing, [`TtySerialChannel`] fails to open
//! with [`KeyManagerError::SerialOpen`] and the key manager reports the
//! module as unreachable.

use std::ffi::OsString;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{KeyManagerError, KeyManagerResult};
use crate::ports::SerialChannel;

/// Serial line configuration.
#[derive(Debug, Clone)]
pub struct TtyConfig {
    pub device: PathBuf,
    pub baud_rate: u32,
}

impl Default for TtyConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/ttyACM0"),
            baud_rate: 460_800,
        }
    }
}

/// Serial channel over a tty device.
pub struct TtySerialChannel {
    config: TtyConfig,
    file: Option<std::fs::File>,
}

impl TtySerialChannel {
    pub fn new(config: TtyConfig) -> Self {
        Self { config, file: None }
    }

    fn device_name(&self) -> String {
        self.config.device.display().to_string()
    }

    /// `stty` arguments for 8N1 raw mode with 100 ms read polling.
    fn line_settings(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-F".into(), self.config.device.clone().into()];
        args.push(self.config.baud_rate.to_string().into());
        args.extend(
            ["cs8", "-parenb", "-cstopb", "raw", "-echo", "min", "0", "time", "1"]
                .into_iter()
                .map(OsString::from),
        );
        args
    }

    fn open_error(&self, reason: impl ToString) -> KeyManagerError {
        KeyManagerError::SerialOpen {
            device: self.device_name(),
            reason: reason.to_string(),
        }
    }
}

#[async_trait]
impl SerialChannel for TtySerialChannel {
    async fn open(&mut self) -> KeyManagerResult<()> {
        if self.file.is_some() {
            return Ok(());
        }

        let status = Command::new("stty")
            .args(self.line_settings())
            .status()
            .await
            .map_err(|e| self.open_error(e))?;
        if !status.success() {
            return Err(self.open_error(format!("stty exited with {}", status)));
        }

        let file = std::fs::OpenOptions::new()
            .read(true)
            .write(true)
            .open(&self.config.device)
            .map_err(|e| self.open_error(e))?;

        debug!(device = %self.device_name(), "[qr-02] serial channel opened");
        self.file = Some(file);
        Ok(())
    }

    async fn exchange(&mut self, request: &[u8], timeout: Duration) -> KeyManagerResult<Vec<u8>> {
        let file = self.file.take().ok_or(KeyManagerError::ChannelClosed)?;
        let request = request.to_vec();

        let (file, result) = tokio::task::spawn_blocking(move || {
            let mut file = file;
            let result = blocking_exchange(&mut file, &request, timeout);
            (file, result)
        })
        .await
        .map_err(|e| KeyManagerError::SerialIo {
            reason: e.to_string(),
        })?;

        self.file = Some(file);
        result
    }

    async fn close(&mut self) {
        if self.file.take().is_some() {
            debug!(device = %self.device_name(), "[qr-02] serial channel closed");
        }
    }
}

fn blocking_exchange(
    file: &mut std::fs::File,
    request: &[u8],
    timeout: Duration,
) -> KeyManagerResult<Vec<u8>> {
    let io = |e: std::io::Error| KeyManagerError::SerialIo {
        reason: e.to_string(),
    };

    file.write_all(request).map_err(io)?;
    file.flush().map_err(io)?;

    let started = Instant::now();
    let mut response = Vec::new();
    let mut chunk = [0u8; 512];
    loop {
        // VTIME=1: a zero-length read means 100 ms without data.
        let n = file.read(&mut chunk).map_err(io)?;
        if n > 0 {
            response.extend_from_slice(&chunk[..n]);
        } else if !response.is_empty() {
            return Ok(response);
        } else if started.elapsed() >= timeout {
            return Err(KeyManagerError::ResponseTimeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
            });
        }
    }
}
