//! # Shared Types Crate
//!
//! Domain entities and the wire envelope shared by every appliance crate.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: slot identifiers, statuses and artifact keys
//!   are defined here and nowhere else.
//! - **Keyed Storage**: components address persisted data by
//!   [`ArtifactKey`], never by path.
//! - **One Envelope**: both transports exchange the same [`Envelope`].

pub mod entities;
pub mod errors;
pub mod wire;

pub use entities::*;
pub use errors::*;
pub use wire::{body_length, Envelope, MessageHeader, MessageName, MessageType, PROTOCOL_VERSION};
