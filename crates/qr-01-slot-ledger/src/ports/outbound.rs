//! Driven ports for the slot ledger.

use std::sync::Arc;

use shared_types::ArtifactKey;

use crate::domain::{ArtifactError, ArtifactResult};

/// Keyed artifact storage.
///
/// Every mutation is all-or-nothing: a crash leaves either the previous or
/// the new content, never a partial write.
pub trait ArtifactStore: Send + Sync {
    /// Read an artifact, `None` if absent.
    fn read(&self, key: ArtifactKey) -> ArtifactResult<Option<Vec<u8>>>;

    /// Atomically replace an artifact.
    fn write(&self, key: ArtifactKey, bytes: &[u8]) -> ArtifactResult<()>;

    /// Atomically move `from` onto `to`, replacing `to` if present.
    fn rename(&self, from: ArtifactKey, to: ArtifactKey) -> ArtifactResult<()>;

    /// Remove an artifact. Removing an absent artifact succeeds.
    fn remove(&self, key: ArtifactKey) -> ArtifactResult<()>;

    fn exists(&self, key: ArtifactKey) -> ArtifactResult<bool>;

    /// Read an artifact as trimmed UTF-8 text.
    fn read_text(&self, key: ArtifactKey) -> ArtifactResult<Option<String>> {
        match self.read(key)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(|text| Some(text.trim().to_string()))
                .map_err(|_| ArtifactError::InvalidText {
                    key: key.to_string(),
                }),
            None => Ok(None),
        }
    }
}

/// Handle shared by every component that touches artifacts.
pub type SharedArtifactStore = Arc<dyn ArtifactStore>;
