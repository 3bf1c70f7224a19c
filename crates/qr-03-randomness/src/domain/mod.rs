//! Domain layer for the randomness pipeline.

pub mod commitment;
pub mod job;

pub use commitment::{combined_digest, BatchCommitment, ClaimedHash};
pub use job::{GenerationJob, PipelineState};
