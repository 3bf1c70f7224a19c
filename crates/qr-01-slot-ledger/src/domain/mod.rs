//! Domain layer for the slot ledger.

pub mod errors;
pub mod ledger;

pub use errors::{ArtifactError, ArtifactResult, LedgerError, LedgerResult};
pub use ledger::SlotLedger;
