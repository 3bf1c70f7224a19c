//! # qr-01-slot-ledger
//!
//! Durable slot → status ledger and the keyed artifact store that every
//! other appliance component reads and writes through.
//!
//! ## Overview
//!
//! - **SlotLedger**: ordered table of `SLOT_COUNT` statuses, persisted as a
//!   small text record and replaced atomically on every change.
//! - **ArtifactStore**: storage addressed by `ArtifactKey` (slot + kind, or
//!   an appliance-wide key). Writes and renames are atomic.
//!
//! ## Slot Lifecycle
//!
//! ```text
//! [EMPTY] ──block accepted──→ [READY] ──claimed for batch──→ [CONSUMED]
//!    ↑                                                          │
//!    └──────────────────── next round ──────────────────────────┘
//! ```
//!
//! Only the randomness pipeline drives these transitions; the ledger is
//! reconciled against the store on open so a lost artifact never leaves a
//! slot marked Ready.

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

pub use adapters::{FileArtifactStore, MemoryArtifactStore};
pub use domain::{ArtifactError, ArtifactResult, LedgerError, LedgerResult, SlotLedger};
pub use ports::{ArtifactStore, SharedArtifactStore};
pub use service::DurableLedger;
