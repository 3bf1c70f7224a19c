//! # qr-03-randomness
//!
//! Background pipeline that keeps every slot stocked with a quality-tested
//! random block and turns the Ready slots into a signed batch commitment at
//! each round deadline.
//!
//! ## Overview
//!
//! - **Generation**: an external generator is invoked repeatedly until a
//!   block of the configured size accumulates.
//! - **Quality gate**: an external statistical evaluator accepts or rejects
//!   the block. Rejected blocks are regenerated for the same slot, without
//!   limit.
//! - **Commitment**: Ready hashes are claimed, concatenated in slot order,
//!   hashed and signed by the secure module.
//!
//! ## Ownership
//!
//! The pipeline owns the slot ledger. Everything else reaches slot status
//! only through this crate; hardware signing is reached through the
//! [`ports::DigestSigner`] port.

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod ports;
pub mod service;

pub use config::PipelineConfig;
pub use domain::{BatchCommitment, ClaimedHash, PipelineState};
pub use error::{PipelineError, PipelineResult};
pub use ports::{DigestSigner, EntropySource, QualityEvaluator, QualityVerdict};
pub use service::{RandomnessPipeline, RejectReason, StepOutcome, TickOutcome};
