//! Ports for the randomness pipeline.

pub mod outbound;

pub use outbound::{DigestSigner, EntropySource, QualityEvaluator, QualityVerdict};
