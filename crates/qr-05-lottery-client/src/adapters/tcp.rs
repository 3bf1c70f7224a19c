//! TCP coordinator link.

use std::net::SocketAddr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{LotteryClientError, LotteryClientResult};
use crate::ports::{ConnectionId, CoordinatorConnector, CoordinatorLink, LinkEvent};

const READ_CHUNK: usize = 8192;

pub struct TcpConnector {
    connect_timeout: Duration,
}

impl TcpConnector {
    pub fn new(connect_timeout: Duration) -> Self {
        Self { connect_timeout }
    }
}

#[async_trait]
impl CoordinatorConnector for TcpConnector {
    async fn connect(
        &self,
        addr: SocketAddr,
        conn: ConnectionId,
        events: mpsc::Sender<LinkEvent>,
    ) -> LotteryClientResult<Box<dyn CoordinatorLink>> {
        let stream = tokio::time::timeout(self.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| LotteryClientError::ConnectTimeout {
                addr,
                timeout_ms: self.connect_timeout.as_millis() as u64,
            })?
            .map_err(|e| LotteryClientError::Connect {
                addr,
                reason: e.to_string(),
            })?;
        let _ = stream.set_nodelay(true);

        let (mut reader, writer) = stream.into_split();
        let reader_task = tokio::spawn(async move {
            let mut buf = vec![0u8; READ_CHUNK];
            let reason = loop {
                match reader.read(&mut buf).await {
                    Ok(0) => break "peer closed".to_string(),
                    Ok(n) => {
                        let event = LinkEvent::Data {
                            conn,
                            bytes: buf[..n].to_vec(),
                        };
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => break e.to_string(),
                }
            };
            debug!(conn, reason = %reason, "[qr-05] coordinator socket closed");
            let _ = events.send(LinkEvent::Closed { conn, reason }).await;
        });

        Ok(Box::new(TcpLink {
            writer,
            reader_task,
        }))
    }
}

struct TcpLink {
    writer: OwnedWriteHalf,
    reader_task: JoinHandle<()>,
}

#[async_trait]
impl CoordinatorLink for TcpLink {
    async fn send(&mut self, bytes: &[u8]) -> LotteryClientResult<()> {
        self.writer
            .write_all(bytes)
            .await
            .map_err(|e| LotteryClientError::Send {
                reason: e.to_string(),
            })
    }

    async fn close(&mut self) {
        self.reader_task.abort();
        let _ = self.writer.shutdown().await;
    }
}

impl Drop for TcpLink {
    fn drop(&mut self) {
        self.reader_task.abort();
    }
}
