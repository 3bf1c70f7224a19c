//! Driven ports for the randomness pipeline.

use async_trait::async_trait;
use shared_types::Hash;

use crate::error::PipelineResult;

/// External random-bit generator. Each call is one invocation.
#[async_trait]
pub trait EntropySource: Send + Sync {
    async fn generate(&self) -> PipelineResult<Vec<u8>>;
}

/// Statistical test verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QualityVerdict {
    Pass,
    Fail,
}

/// External statistical randomness evaluator.
#[async_trait]
pub trait QualityEvaluator: Send + Sync {
    async fn evaluate(&self, block: &[u8]) -> PipelineResult<QualityVerdict>;
}

/// Hardware signature over a batch digest.
#[async_trait]
pub trait DigestSigner: Send + Sync {
    async fn sign_digest(&self, digest: &Hash) -> PipelineResult<Vec<u8>>;
}
