//! # RFCOMM Serial Device
//!
//! The paired wireless peer shows up as a serial device. A reader task
//! forwards raw bytes into the event channel and reopens the device after
//! the peer disconnects; replies are written through a separate handle.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::ProvisioningConfig;
use crate::error::{ProvisioningError, ProvisioningResult};
use crate::ports::{ResponseSink, WirelessEvent};

const READ_CHUNK: usize = 4096;

/// Spawn the reader task. It stops once the receiver is dropped.
pub fn spawn_reader(
    config: ProvisioningConfig,
    events: mpsc::Sender<WirelessEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut open_failures = 0u32;
        while !events.is_closed() {
            let mut device = match tokio::fs::File::open(&config.rfcomm_device).await {
                Ok(device) => {
                    open_failures = 0;
                    device
                }
                Err(e) => {
                    if open_failures == 0 {
                        warn!(
                            device = %config.rfcomm_device.display(),
                            error = %e,
                            "[qr-04] wireless device unavailable"
                        );
                    }
                    open_failures += 1;
                    tokio::time::sleep(config.reopen_delay).await;
                    continue;
                }
            };

            let mut buf = vec![0u8; READ_CHUNK];
            let reason = loop {
                match device.read(&mut buf).await {
                    Ok(0) => break "end of stream".to_string(),
                    Ok(n) => {
                        if events.send(WirelessEvent::Data(buf[..n].to_vec())).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => break e.to_string(),
                }
            };

            debug!(reason = %reason, "[qr-04] wireless peer closed");
            if events.send(WirelessEvent::Closed { reason }).await.is_err() {
                return;
            }
            tokio::time::sleep(config.reopen_delay).await;
        }
    })
}

/// Writes replies to the wireless device.
pub struct RfcommWriter {
    device: PathBuf,
}

impl RfcommWriter {
    pub fn new(device: PathBuf) -> Self {
        Self { device }
    }
}

fn transport_error(err: std::io::Error) -> ProvisioningError {
    ProvisioningError::Transport {
        reason: err.to_string(),
    }
}

#[async_trait]
impl ResponseSink for RfcommWriter {
    async fn send(&mut self, bytes: &[u8]) -> ProvisioningResult<()> {
        let mut device = tokio::fs::OpenOptions::new()
            .append(true)
            .open(&self.device)
            .await
            .map_err(transport_error)?;
        device.write_all(bytes).await.map_err(transport_error)?;
        device.flush().await.map_err(transport_error)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn test_reader_forwards_bytes_then_close() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("rfcomm0");
        std::fs::write(&device, b"{\"header\":{}}").unwrap();

        let (tx, mut rx) = mpsc::channel(8);
        let handle = spawn_reader(
            ProvisioningConfig {
                rfcomm_device: device,
                reopen_delay: Duration::from_millis(5),
                max_buffer: 1024,
            },
            tx,
        );

        assert_eq!(
            rx.recv().await,
            Some(WirelessEvent::Data(b"{\"header\":{}}".to_vec()))
        );
        assert!(matches!(rx.recv().await, Some(WirelessEvent::Closed { .. })));
        handle.abort();
    }

    #[tokio::test]
    async fn test_writer_appends_replies() {
        let dir = tempfile::tempdir().unwrap();
        let device = dir.path().join("rfcomm0");
        std::fs::write(&device, b"").unwrap();

        let mut writer = RfcommWriter::new(device.clone());
        writer.send(b"one").await.unwrap();
        writer.send(b"two").await.unwrap();

        assert_eq!(std::fs::read(&device).unwrap(), b"onetwo");
    }

    #[tokio::test]
    async fn test_writer_missing_device_is_transport_error() {
        let dir = tempfile::tempdir().unwrap();
        let mut writer = RfcommWriter::new(dir.path().join("absent"));
        let err = writer.send(b"x").await.unwrap_err();
        assert!(matches!(err, ProvisioningError::Transport { .. }));
    }
}
