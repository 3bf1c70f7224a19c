//! Ports for the slot ledger.

pub mod outbound;

pub use outbound::{ArtifactStore, SharedArtifactStore};
