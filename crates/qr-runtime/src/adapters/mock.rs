//! Test doubles for runtime-level ports.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use super::updater::{UpdateAgent, UpdateError, UpdateStatus};

/// Answers update checks from a queue; `UpToDate` once it runs dry.
#[derive(Debug, Clone, Default)]
pub struct ScriptedUpdateAgent {
    script: Arc<Mutex<VecDeque<Option<UpdateStatus>>>>,
    checks: Arc<Mutex<usize>>,
}

impl ScriptedUpdateAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, status: UpdateStatus) {
        self.script.lock().push_back(Some(status));
    }

    /// Queue a failed check.
    pub fn push_failure(&self) {
        self.script.lock().push_back(None);
    }

    pub fn checks(&self) -> usize {
        *self.checks.lock()
    }
}

#[async_trait]
impl UpdateAgent for ScriptedUpdateAgent {
    async fn check(&self) -> Result<UpdateStatus, UpdateError> {
        *self.checks.lock() += 1;
        match self.script.lock().pop_front() {
            Some(Some(status)) => Ok(status),
            Some(None) => Err(UpdateError::Failed { status: Some(1) }),
            None => Ok(UpdateStatus::UpToDate),
        }
    }
}
