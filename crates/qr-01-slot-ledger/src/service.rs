//! # Durable Ledger
//!
//! Write-through wrapper around [`SlotLedger`]. Every status change is
//! persisted through the artifact store before it becomes visible; a failed
//! write leaves the in-memory table unchanged.
//!
//! On open the table is reconciled with the artifacts actually present so
//! the ledger never claims a block that a crash lost:
//!
//! - Ready without both `RandomBlock` and `BlockHash` → Empty
//! - Consumed without `ClaimedBlockHash` → Empty

use shared_types::{ArtifactKey, SlotArtifact, SlotId, SlotStatus};
use tracing::{info, warn};

use crate::domain::{LedgerResult, SlotLedger};
use crate::ports::{ArtifactStore, SharedArtifactStore};

/// Slot ledger persisted as the `Ledger` artifact.
pub struct DurableLedger {
    table: SlotLedger,
    store: SharedArtifactStore,
}

impl DurableLedger {
    /// Load the ledger, reconcile it with stored artifacts and persist the
    /// result. A missing or corrupt ledger starts with every slot Empty.
    pub fn open(store: SharedArtifactStore) -> LedgerResult<Self> {
        let table = match store.read_text(ArtifactKey::Ledger) {
            Ok(Some(text)) => SlotLedger::decode(&text).unwrap_or_else(|e| {
                warn!("[qr-01] ledger unreadable, starting empty: {}", e);
                SlotLedger::new()
            }),
            Ok(None) => SlotLedger::new(),
            Err(e) => {
                warn!("[qr-01] ledger unreadable, starting empty: {}", e);
                SlotLedger::new()
            }
        };

        let mut ledger = Self { table, store };
        let repaired = ledger.reconcile()?;
        ledger.persist()?;

        info!(
            ready = ledger.table.slots_with(SlotStatus::Ready).len(),
            consumed = ledger.table.slots_with(SlotStatus::Consumed).len(),
            repaired,
            "[qr-01] ledger loaded"
        );
        Ok(ledger)
    }

    pub fn status(&self, slot: SlotId) -> SlotStatus {
        self.table.status(slot)
    }

    pub fn table(&self) -> &SlotLedger {
        &self.table
    }

    /// Persist a new status for `slot`.
    pub fn set_status(&mut self, slot: SlotId, status: SlotStatus) -> LedgerResult<()> {
        let previous = self.table.set(slot, status);
        if previous == status {
            return Ok(());
        }
        if let Err(e) = self.persist() {
            self.table.set(slot, previous);
            return Err(e);
        }
        Ok(())
    }

    pub fn next_refill_candidate(&self) -> Option<SlotId> {
        self.table.next_refill_candidate()
    }

    pub fn ready_slots(&self) -> Vec<SlotId> {
        self.table.slots_with(SlotStatus::Ready)
    }

    /// Return every Consumed slot to Empty in a single write.
    pub fn reset_consumed(&mut self) -> LedgerResult<Vec<SlotId>> {
        let consumed = self.table.slots_with(SlotStatus::Consumed);
        if consumed.is_empty() {
            return Ok(consumed);
        }

        let before = self.table.clone();
        for slot in &consumed {
            self.table.set(*slot, SlotStatus::Empty);
        }
        if let Err(e) = self.persist() {
            self.table = before;
            return Err(e);
        }
        Ok(consumed)
    }

    fn reconcile(&mut self) -> LedgerResult<usize> {
        let mut repaired = 0;
        for slot in SlotId::all() {
            let intact = match self.table.status(slot) {
                SlotStatus::Empty => true,
                SlotStatus::Ready => {
                    self.has(slot, SlotArtifact::RandomBlock)?
                        && self.has(slot, SlotArtifact::BlockHash)?
                }
                SlotStatus::Consumed => self.has(slot, SlotArtifact::ClaimedBlockHash)?,
            };
            if !intact {
                warn!(
                    slot = slot.get(),
                    status = %self.table.status(slot),
                    "[qr-01] artifacts missing, slot reset to empty"
                );
                self.table.set(slot, SlotStatus::Empty);
                repaired += 1;
            }
        }
        Ok(repaired)
    }

    fn has(&self, slot: SlotId, artifact: SlotArtifact) -> LedgerResult<bool> {
        Ok(self.store.exists(ArtifactKey::slot(slot, artifact))?)
    }

    fn persist(&self) -> LedgerResult<()> {
        self.store
            .write(ArtifactKey::Ledger, self.table.encode().as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::adapters::MemoryArtifactStore;
    use crate::domain::LedgerError;
    use crate::ports::ArtifactStore;

    fn slot(n: u8) -> SlotId {
        SlotId::new(n).unwrap()
    }

    fn key(n: u8, artifact: SlotArtifact) -> ArtifactKey {
        ArtifactKey::slot(slot(n), artifact)
    }

    #[test]
    fn test_open_fresh_store_persists_empty_ledger() {
        let store = Arc::new(MemoryArtifactStore::new());
        let ledger = DurableLedger::open(store.clone()).unwrap();

        assert_eq!(ledger.next_refill_candidate(), Some(slot(1)));
        let text = store.read_text(ArtifactKey::Ledger).unwrap().unwrap();
        assert!(text.starts_with("slot,status"));
    }

    #[test]
    fn test_reconcile_demotes_ready_without_artifacts() {
        let store = Arc::new(MemoryArtifactStore::new());
        store
            .write(ArtifactKey::Ledger, b"slot,status\n1,1\n2,1\n3,2\n4,2\n")
            .unwrap();
        store.write(key(1, SlotArtifact::RandomBlock), b"block").unwrap();
        store.write(key(1, SlotArtifact::BlockHash), b"hash").unwrap();
        store.write(key(2, SlotArtifact::RandomBlock), b"block").unwrap();
        store.write(key(3, SlotArtifact::ClaimedBlockHash), b"hash").unwrap();

        let ledger = DurableLedger::open(store.clone()).unwrap();

        assert_eq!(ledger.status(slot(1)), SlotStatus::Ready);
        assert_eq!(ledger.status(slot(2)), SlotStatus::Empty);
        assert_eq!(ledger.status(slot(3)), SlotStatus::Consumed);
        assert_eq!(ledger.status(slot(4)), SlotStatus::Empty);

        let persisted = SlotLedger::decode(&store.read_text(ArtifactKey::Ledger).unwrap().unwrap()).unwrap();
        assert_eq!(&persisted, ledger.table());
    }

    #[test]
    fn test_corrupt_ledger_starts_empty() {
        let store = Arc::new(MemoryArtifactStore::new());
        store.write(ArtifactKey::Ledger, b"garbage").unwrap();
        let ledger = DurableLedger::open(store).unwrap();
        assert!(ledger.table().iter().all(|(_, s)| s == SlotStatus::Empty));
    }

    #[test]
    fn test_failed_write_leaves_status_unchanged() {
        let store = Arc::new(MemoryArtifactStore::new());
        let mut ledger = DurableLedger::open(store.clone()).unwrap();

        store.fail_on(ArtifactKey::Ledger);
        let err = ledger.set_status(slot(5), SlotStatus::Ready).unwrap_err();
        assert!(matches!(err, LedgerError::Artifact(_)));
        assert_eq!(ledger.status(slot(5)), SlotStatus::Empty);
    }

    #[test]
    fn test_reset_consumed() {
        let store = Arc::new(MemoryArtifactStore::new());
        let mut ledger = DurableLedger::open(store).unwrap();
        ledger.set_status(slot(2), SlotStatus::Consumed).unwrap();
        ledger.set_status(slot(6), SlotStatus::Consumed).unwrap();
        ledger.set_status(slot(3), SlotStatus::Ready).unwrap();

        let reset = ledger.reset_consumed().unwrap();

        assert_eq!(reset, vec![slot(2), slot(6)]);
        assert_eq!(ledger.status(slot(2)), SlotStatus::Empty);
        assert_eq!(ledger.status(slot(3)), SlotStatus::Ready);
        assert_eq!(ledger.ready_slots(), vec![slot(3)]);
    }
}
