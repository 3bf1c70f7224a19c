//! Scripted pipeline collaborators for tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use shared_types::Hash;

use crate::error::{PipelineError, PipelineResult};
use crate::ports::{DigestSigner, EntropySource, QualityEvaluator, QualityVerdict};

/// Generator returning `chunk_size` bytes per call, each call filled with
/// its own counter byte.
#[derive(Debug)]
pub struct ScriptedEntropySource {
    chunk_size: usize,
    calls: AtomicUsize,
    failures: Mutex<usize>,
}

impl ScriptedEntropySource {
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size,
            calls: AtomicUsize::new(0),
            failures: Mutex::new(0),
        }
    }

    /// Fail the next `count` invocations.
    pub fn fail_next(&self, count: usize) {
        *self.failures.lock() = count;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntropySource for ScriptedEntropySource {
    async fn generate(&self) -> PipelineResult<Vec<u8>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        {
            let mut failures = self.failures.lock();
            if *failures > 0 {
                *failures -= 1;
                return Err(PipelineError::Generator {
                    reason: "scripted failure".to_string(),
                });
            }
        }
        Ok(vec![(call % 256) as u8; self.chunk_size])
    }
}

/// Evaluator replaying scripted verdicts, then passing everything.
#[derive(Debug, Default)]
pub struct ScriptedEvaluator {
    verdicts: Mutex<VecDeque<QualityVerdict>>,
    evaluated: Mutex<Vec<usize>>,
}

impl ScriptedEvaluator {
    pub fn passing() -> Self {
        Self::default()
    }

    pub fn with_verdicts(verdicts: impl IntoIterator<Item = QualityVerdict>) -> Self {
        Self {
            verdicts: Mutex::new(verdicts.into_iter().collect()),
            evaluated: Mutex::new(Vec::new()),
        }
    }

    /// Lengths of every block evaluated so far.
    pub fn evaluated(&self) -> Vec<usize> {
        self.evaluated.lock().clone()
    }
}

#[async_trait]
impl QualityEvaluator for ScriptedEvaluator {
    async fn evaluate(&self, block: &[u8]) -> PipelineResult<QualityVerdict> {
        self.evaluated.lock().push(block.len());
        Ok(self
            .verdicts
            .lock()
            .pop_front()
            .unwrap_or(QualityVerdict::Pass))
    }
}

/// Signer recording every digest it signs.
#[derive(Debug, Default)]
pub struct RecordingSigner {
    digests: Mutex<Vec<Hash>>,
    unavailable: Mutex<bool>,
}

impl RecordingSigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        *self.unavailable.lock() = unavailable;
    }

    pub fn digests(&self) -> Vec<Hash> {
        self.digests.lock().clone()
    }

    /// Signature returned for `digest`.
    pub fn signature_for(digest: &Hash) -> Vec<u8> {
        Sha256::digest(digest).to_vec()
    }
}

#[async_trait]
impl DigestSigner for RecordingSigner {
    async fn sign_digest(&self, digest: &Hash) -> PipelineResult<Vec<u8>> {
        if *self.unavailable.lock() {
            return Err(PipelineError::Signing {
                reason: "module unplugged".to_string(),
                transport: true,
            });
        }
        self.digests.lock().push(*digest);
        Ok(Self::signature_for(digest))
    }
}
