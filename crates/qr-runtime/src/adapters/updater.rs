//! Firmware update checks.
//!
//! The update itself is performed by an external command. Exit status 0
//! means nothing was installed, [`STAGED_EXIT_CODE`] means a new build was
//! staged and the appliance must restart into it.

use async_trait::async_trait;
use thiserror::Error;
use tokio::process::Command;
use tracing::debug;

/// Exit status reported by the update command when a new build is staged.
/// The appliance exits with the same status.
pub const STAGED_EXIT_CODE: i32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateStatus {
    UpToDate,
    Staged,
}

#[derive(Debug, Error)]
pub enum UpdateError {
    #[error("failed to launch update command: {0}")]
    Launch(#[from] std::io::Error),

    #[error("update command failed with status {status:?}")]
    Failed { status: Option<i32> },
}

#[async_trait]
pub trait UpdateAgent: Send + Sync {
    async fn check(&self) -> Result<UpdateStatus, UpdateError>;
}

/// Runs the configured update command through `sh -c`.
#[derive(Debug, Clone)]
pub struct CommandUpdateAgent {
    command: String,
}

impl CommandUpdateAgent {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

#[async_trait]
impl UpdateAgent for CommandUpdateAgent {
    async fn check(&self) -> Result<UpdateStatus, UpdateError> {
        debug!(command = %self.command, "[qr-runtime] running update check");
        let status = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .kill_on_drop(true)
            .status()
            .await?;
        match status.code() {
            Some(0) => Ok(UpdateStatus::UpToDate),
            Some(STAGED_EXIT_CODE) => Ok(UpdateStatus::Staged),
            code => Err(UpdateError::Failed { status: code }),
        }
    }
}
