//! Error types for the randomness pipeline.

use qr_01_slot_ledger::{ArtifactError, LedgerError};
use thiserror::Error;

/// Randomness pipeline errors.
///
/// A failed quality test is not an error: it surfaces as
/// `StepOutcome::Rejected` and the block is regenerated.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Generator process could not run or exited unsuccessfully.
    #[error("Generator failed: {reason}")]
    Generator { reason: String },

    /// Evaluator process could not run.
    #[error("Evaluator failed: {reason}")]
    Evaluator { reason: String },

    /// Hardware signature over the batch digest failed.
    #[error("Batch signing failed: {reason}")]
    Signing { reason: String, transport: bool },

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Artifact rename/remove failed (ArtifactIOError).
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

impl PipelineError {
    /// Whether the hardware link caused the failure.
    pub fn is_transport(&self) -> bool {
        matches!(self, PipelineError::Signing { transport: true, .. })
    }
}

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
