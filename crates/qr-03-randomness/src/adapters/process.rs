//! # Process Adapters
//!
//! The generator and evaluator are opaque executables.
//!
//! - Generator: run in its working directory, it appends one chunk of output
//!   to a scratch file. The adapter reads and removes the file after every
//!   invocation.
//! - Evaluator: given the path of a file holding the block, exit status 0
//!   means the block passed.

use std::io::ErrorKind;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{PipelineError, PipelineResult};
use crate::ports::{EntropySource, QualityEvaluator, QualityVerdict};

/// Generator executable settings.
#[derive(Debug, Clone)]
pub struct GeneratorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Scratch file the program appends to, relative to `working_dir`.
    pub output_file: PathBuf,
}

pub struct ProcessEntropySource {
    command: GeneratorCommand,
}

impl ProcessEntropySource {
    pub fn new(command: GeneratorCommand) -> Self {
        Self { command }
    }

    fn output_path(&self) -> PathBuf {
        self.command.working_dir.join(&self.command.output_file)
    }
}

#[async_trait]
impl EntropySource for ProcessEntropySource {
    async fn generate(&self) -> PipelineResult<Vec<u8>> {
        let generator_error = |reason: String| PipelineError::Generator { reason };

        let status = Command::new(&self.command.program)
            .args(&self.command.args)
            .current_dir(&self.command.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| generator_error(format!("{}: {}", self.command.program.display(), e)))?;
        if !status.success() {
            return Err(generator_error(format!("exited with {}", status)));
        }

        let path = self.output_path();
        let output = tokio::fs::read(&path)
            .await
            .map_err(|e| generator_error(format!("{}: {}", path.display(), e)))?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(generator_error(format!("{}: {}", path.display(), e))),
        }

        Ok(output)
    }
}

/// Evaluator executable settings.
#[derive(Debug, Clone)]
pub struct EvaluatorCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
    /// Where the block under test is written.
    pub scratch_file: PathBuf,
}

pub struct ProcessQualityEvaluator {
    command: EvaluatorCommand,
}

impl ProcessQualityEvaluator {
    pub fn new(command: EvaluatorCommand) -> Self {
        Self { command }
    }
}

#[async_trait]
impl QualityEvaluator for ProcessQualityEvaluator {
    async fn evaluate(&self, block: &[u8]) -> PipelineResult<QualityVerdict> {
        let evaluator_error = |reason: String| PipelineError::Evaluator { reason };
        let scratch = &self.command.scratch_file;

        if let Some(parent) = scratch.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| evaluator_error(e.to_string()))?;
        }
        tokio::fs::write(scratch, block)
            .await
            .map_err(|e| evaluator_error(format!("{}: {}", scratch.display(), e)))?;

        let status = Command::new(&self.command.program)
            .args(&self.command.args)
            .arg(scratch)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        let _ = tokio::fs::remove_file(scratch).await;

        let status = status
            .map_err(|e| evaluator_error(format!("{}: {}", self.command.program.display(), e)))?;
        debug!(code = ?status.code(), "[qr-03] evaluator finished");

        Ok(if status.success() {
            QualityVerdict::Pass
        } else {
            QualityVerdict::Fail
        })
    }
}
