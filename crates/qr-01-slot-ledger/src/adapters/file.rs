//! # File-Backed Artifact Store
//!
//! Resolves artifact keys to files under a data root:
//!
//! ```text
//! <root>/ledger.csv
//! <root>/batch.sig
//! <root>/coordinator.addr
//! <root>/version.dat
//! <root>/slot-<n>/public_key.hex
//! <root>/slot-<n>/decompressed_public_key.hex
//! <root>/slot-<n>/wallet_address.txt
//! <root>/slot-<n>/registration.sig
//! <root>/slot-<n>/random.bin            (+ .claimed)
//! <root>/slot-<n>/random.sha256         (+ .claimed)
//! ```
//!
//! Writes go to a sibling `.tmp` file which is synced and renamed over the
//! target.

use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use shared_types::{ArtifactKey, SlotArtifact};

use crate::domain::{ArtifactError, ArtifactResult};
use crate::ports::ArtifactStore;

/// Artifact store rooted at a directory.
#[derive(Debug, Clone)]
pub struct FileArtifactStore {
    root: PathBuf,
}

impl FileArtifactStore {
    /// Create the store, creating the root directory if needed.
    pub fn open(root: impl Into<PathBuf>) -> ArtifactResult<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| ArtifactError::Io {
            key: root.display().to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Backing path of an artifact.
    pub fn path_for(&self, key: ArtifactKey) -> PathBuf {
        match key {
            ArtifactKey::Ledger => self.root.join("ledger.csv"),
            ArtifactKey::BatchSignature => self.root.join("batch.sig"),
            ArtifactKey::CoordinatorAddress => self.root.join("coordinator.addr"),
            ArtifactKey::VersionMarker => self.root.join("version.dat"),
            ArtifactKey::Slot(slot, artifact) => {
                let file = match artifact {
                    SlotArtifact::PublicKey => "public_key.hex",
                    SlotArtifact::DecompressedPublicKey => "decompressed_public_key.hex",
                    SlotArtifact::WalletAddress => "wallet_address.txt",
                    SlotArtifact::RegistrationSignature => "registration.sig",
                    SlotArtifact::RandomBlock => "random.bin",
                    SlotArtifact::BlockHash => "random.sha256",
                    SlotArtifact::ClaimedRandomBlock => "random.bin.claimed",
                    SlotArtifact::ClaimedBlockHash => "random.sha256.claimed",
                };
                self.root.join(format!("slot-{}", slot)).join(file)
            }
        }
    }

    fn ensure_parent(&self, key: ArtifactKey, path: &Path) -> ArtifactResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ArtifactError::io(key, e))?;
        }
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

impl ArtifactStore for FileArtifactStore {
    fn read(&self, key: ArtifactKey) -> ArtifactResult<Option<Vec<u8>>> {
        match std::fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ArtifactError::io(key, e)),
        }
    }

    fn write(&self, key: ArtifactKey, bytes: &[u8]) -> ArtifactResult<()> {
        let path = self.path_for(key);
        self.ensure_parent(key, &path)?;

        let temp = temp_path(&path);
        let mut file = std::fs::File::create(&temp).map_err(|e| ArtifactError::io(key, e))?;
        file.write_all(bytes).map_err(|e| ArtifactError::io(key, e))?;
        file.sync_all().map_err(|e| ArtifactError::io(key, e))?;

        std::fs::rename(&temp, &path).map_err(|e| ArtifactError::io(key, e))
    }

    fn rename(&self, from: ArtifactKey, to: ArtifactKey) -> ArtifactResult<()> {
        let source = self.path_for(from);
        let target = self.path_for(to);
        self.ensure_parent(to, &target)?;

        match std::fs::rename(&source, &target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(ArtifactError::not_found(from)),
            Err(e) => Err(ArtifactError::io(from, e)),
        }
    }

    fn remove(&self, key: ArtifactKey) -> ArtifactResult<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ArtifactError::io(key, e)),
        }
    }

    fn exists(&self, key: ArtifactKey) -> ArtifactResult<bool> {
        self.path_for(key)
            .try_exists()
            .map_err(|e| ArtifactError::io(key, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::SlotId;

    fn store() -> (tempfile::TempDir, FileArtifactStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = FileArtifactStore::open(dir.path().join("data")).unwrap();
        (dir, store)
    }

    fn block(n: u8) -> ArtifactKey {
        ArtifactKey::slot(SlotId::new(n).unwrap(), SlotArtifact::RandomBlock)
    }

    #[test]
    fn test_write_then_read() {
        let (_dir, store) = store();
        store.write(block(3), b"entropy").unwrap();

        assert_eq!(store.read(block(3)).unwrap().as_deref(), Some(&b"entropy"[..]));
        assert!(store.path_for(block(3)).ends_with("slot-3/random.bin"));
        assert!(!temp_path(&store.path_for(block(3))).exists());
    }

    #[test]
    fn test_missing_artifact_reads_none() {
        let (_dir, store) = store();
        assert_eq!(store.read(ArtifactKey::Ledger).unwrap(), None);
        assert!(!store.exists(ArtifactKey::Ledger).unwrap());
    }

    #[test]
    fn test_write_replaces_previous_content() {
        let (_dir, store) = store();
        store.write(ArtifactKey::Ledger, b"first version").unwrap();
        store.write(ArtifactKey::Ledger, b"second").unwrap();
        assert_eq!(store.read_text(ArtifactKey::Ledger).unwrap().as_deref(), Some("second"));
    }

    #[test]
    fn test_rename_replaces_target() {
        let (_dir, store) = store();
        let slot = SlotId::new(1).unwrap();
        let hash = ArtifactKey::slot(slot, SlotArtifact::BlockHash);
        let claimed = ArtifactKey::slot(slot, SlotArtifact::ClaimedBlockHash);

        store.write(claimed, b"stale").unwrap();
        store.write(hash, b"fresh").unwrap();
        store.rename(hash, claimed).unwrap();

        assert!(!store.exists(hash).unwrap());
        assert_eq!(store.read_text(claimed).unwrap().as_deref(), Some("fresh"));
    }

    #[test]
    fn test_rename_missing_source() {
        let (_dir, store) = store();
        let err = store.rename(block(2), block(3)).unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound { .. }));
    }

    #[test]
    fn test_remove_is_idempotent() {
        let (_dir, store) = store();
        store.write(ArtifactKey::BatchSignature, b"sig").unwrap();
        store.remove(ArtifactKey::BatchSignature).unwrap();
        store.remove(ArtifactKey::BatchSignature).unwrap();
        assert!(!store.exists(ArtifactKey::BatchSignature).unwrap());
    }
}
