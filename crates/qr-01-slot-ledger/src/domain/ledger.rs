//! # Slot Ledger Table
//!
//! In-memory slot → status table and its text encoding.
//!
//! ```text
//! slot,status
//! 1,1
//! 2,0
//! ...
//! ```
//!
//! Status codes: 0 = Empty, 1 = Ready, 2 = Consumed. Slots missing from the
//! encoded form decode as Empty.

use shared_types::{SlotId, SlotStatus, SLOT_COUNT};

use super::errors::{LedgerError, LedgerResult};

const HEADER: &str = "slot,status";

/// Ordered slot → status table.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SlotLedger {
    statuses: [SlotStatus; SLOT_COUNT as usize],
}

impl SlotLedger {
    /// All slots Empty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, slot: SlotId) -> SlotStatus {
        self.statuses[Self::index(slot)]
    }

    /// Set a status, returning the previous one.
    pub fn set(&mut self, slot: SlotId, status: SlotStatus) -> SlotStatus {
        std::mem::replace(&mut self.statuses[Self::index(slot)], status)
    }

    /// Lowest-numbered slot that is Empty or Consumed.
    pub fn next_refill_candidate(&self) -> Option<SlotId> {
        self.iter()
            .find(|(_, status)| status.needs_refill())
            .map(|(slot, _)| slot)
    }

    /// Slots currently holding the given status, ascending.
    pub fn slots_with(&self, status: SlotStatus) -> Vec<SlotId> {
        self.iter()
            .filter(|(_, s)| *s == status)
            .map(|(slot, _)| slot)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SlotId, SlotStatus)> + '_ {
        SlotId::all().map(move |slot| (slot, self.status(slot)))
    }

    pub fn encode(&self) -> String {
        let mut out = String::from(HEADER);
        out.push('\n');
        for (slot, status) in self.iter() {
            out.push_str(&format!("{},{}\n", slot, status.code()));
        }
        out
    }

    pub fn decode(text: &str) -> LedgerResult<Self> {
        let mut ledger = Self::new();

        for (number, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || (number == 0 && line.eq_ignore_ascii_case(HEADER)) {
                continue;
            }

            let corrupt = |reason: &str| LedgerError::Corrupt {
                line: number + 1,
                reason: reason.to_string(),
            };

            let (slot, code) = line.split_once(',').ok_or_else(|| corrupt("missing comma"))?;
            let slot = slot
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(|n| SlotId::new(n).ok())
                .ok_or_else(|| corrupt("invalid slot"))?;
            let status = code
                .trim()
                .parse::<u8>()
                .ok()
                .and_then(SlotStatus::from_code)
                .ok_or_else(|| corrupt("invalid status code"))?;

            ledger.set(slot, status);
        }

        Ok(ledger)
    }

    fn index(slot: SlotId) -> usize {
        usize::from(slot.get()) - 1
    }
}
