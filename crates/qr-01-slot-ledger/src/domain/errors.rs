//! Error types for the slot ledger and artifact store.

use thiserror::Error;

use shared_types::ArtifactKey;

/// Artifact store failures (ArtifactIOError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArtifactError {
    /// Underlying storage operation failed.
    #[error("Artifact I/O failed for {key}: {reason}")]
    Io { key: String, reason: String },

    /// Rename source does not exist.
    #[error("Artifact not found: {key}")]
    NotFound { key: String },

    /// Artifact holds bytes that are not valid UTF-8 text.
    #[error("Artifact {key} is not valid text")]
    InvalidText { key: String },
}

impl ArtifactError {
    pub fn io(key: ArtifactKey, err: impl std::fmt::Display) -> Self {
        ArtifactError::Io {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }

    pub fn not_found(key: ArtifactKey) -> Self {
        ArtifactError::NotFound {
            key: key.to_string(),
        }
    }
}

/// Ledger failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// Persisted ledger could not be parsed.
    #[error("Corrupt ledger at line {line}: {reason}")]
    Corrupt { line: usize, reason: String },

    /// Persisting the ledger failed.
    #[error(transparent)]
    Artifact(#[from] ArtifactError),
}

pub type ArtifactResult<T> = Result<T, ArtifactError>;

pub type LedgerResult<T> = Result<T, LedgerError>;
