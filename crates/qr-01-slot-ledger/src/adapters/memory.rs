//! In-memory artifact store for tests and dry runs.

use std::collections::HashMap;

use parking_lot::RwLock;
use shared_types::ArtifactKey;

use crate::domain::{ArtifactError, ArtifactResult};
use crate::ports::ArtifactStore;

/// Artifact store held in a map. Individual keys can be made to fail.
#[derive(Debug, Default)]
pub struct MemoryArtifactStore {
    artifacts: RwLock<HashMap<ArtifactKey, Vec<u8>>>,
    failing: RwLock<Vec<ArtifactKey>>,
}

impl MemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every mutation touching `key` fail with an I/O error.
    pub fn fail_on(&self, key: ArtifactKey) {
        self.failing.write().push(key);
    }

    pub fn clear_failures(&self) {
        self.failing.write().clear();
    }

    /// Keys currently present.
    pub fn keys(&self) -> Vec<ArtifactKey> {
        self.artifacts.read().keys().copied().collect()
    }

    fn check(&self, key: ArtifactKey) -> ArtifactResult<()> {
        if self.failing.read().contains(&key) {
            return Err(ArtifactError::io(key, "injected failure"));
        }
        Ok(())
    }
}

impl ArtifactStore for MemoryArtifactStore {
    fn read(&self, key: ArtifactKey) -> ArtifactResult<Option<Vec<u8>>> {
        Ok(self.artifacts.read().get(&key).cloned())
    }

    fn write(&self, key: ArtifactKey, bytes: &[u8]) -> ArtifactResult<()> {
        self.check(key)?;
        self.artifacts.write().insert(key, bytes.to_vec());
        Ok(())
    }

    fn rename(&self, from: ArtifactKey, to: ArtifactKey) -> ArtifactResult<()> {
        self.check(from)?;
        self.check(to)?;
        let mut artifacts = self.artifacts.write();
        let bytes = artifacts
            .remove(&from)
            .ok_or_else(|| ArtifactError::not_found(from))?;
        artifacts.insert(to, bytes);
        Ok(())
    }

    fn remove(&self, key: ArtifactKey) -> ArtifactResult<()> {
        self.check(key)?;
        self.artifacts.write().remove(&key);
        Ok(())
    }

    fn exists(&self, key: ArtifactKey) -> ArtifactResult<bool> {
        Ok(self.artifacts.read().contains_key(&key))
    }
}
