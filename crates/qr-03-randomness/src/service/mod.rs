//! # Randomness Pipeline Service
//!
//! Owns the durable ledger and drives at most one [`GenerationJob`]. The
//! orchestrator calls [`RandomnessPipeline::replenish_tick`] and
//! [`RandomnessPipeline::generation_step`] from its timers; every call does
//! a bounded amount of work and returns what to schedule next.
//!
//! ```text
//! tick ──slot needs refill──→ step ─→ step ─→ ... ─→ evaluate
//!   │                                                  │
//!   │                                   fail ←─────────┤ (same slot, next attempt)
//!   │                                                  │
//!   └──all Ready──→ exhausted              pass ──→ persist block + hash ──→ Ready
//! ```

use std::sync::Arc;

use sha2::{Digest, Sha256};
use shared_types::{ArtifactKey, SlotArtifact, SlotId, SlotStatus};
use tracing::{debug, error, info, warn};

use qr_01_slot_ledger::{ArtifactError, ArtifactStore, DurableLedger, SharedArtifactStore};

use crate::config::PipelineConfig;
use crate::domain::{combined_digest, BatchCommitment, ClaimedHash, GenerationJob, PipelineState};
use crate::error::PipelineResult;
use crate::ports::{DigestSigner, EntropySource, QualityEvaluator, QualityVerdict};

/// Result of a replenish tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// A job is already in flight for this slot.
    Busy(SlotId),
    /// A new job was started for this slot.
    Started(SlotId),
    /// Every slot is Ready.
    Exhausted,
}

/// Why an attempt was thrown away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// Statistical test failed.
    QualityGate,
    /// Invocation budget spent before the block filled.
    ShortBlock,
}

/// Result of one generation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// No job in flight.
    Idle,
    /// One more generator invocation absorbed.
    Progress { slot: SlotId, buffered: usize },
    /// Attempt discarded; the same slot is regenerated from scratch.
    Rejected {
        slot: SlotId,
        reason: RejectReason,
        next_attempt: u32,
    },
    /// Block accepted, slot is Ready.
    Completed { slot: SlotId, attempts: u32 },
}

pub struct RandomnessPipeline {
    config: PipelineConfig,
    ledger: DurableLedger,
    store: SharedArtifactStore,
    entropy: Arc<dyn EntropySource>,
    evaluator: Arc<dyn QualityEvaluator>,
    signer: Arc<dyn DigestSigner>,
    job: Option<GenerationJob>,
    exhausted: bool,
}

impl RandomnessPipeline {
    /// Open the ledger from `store` and build the pipeline.
    pub fn new(
        config: PipelineConfig,
        store: SharedArtifactStore,
        entropy: Arc<dyn EntropySource>,
        evaluator: Arc<dyn QualityEvaluator>,
        signer: Arc<dyn DigestSigner>,
    ) -> PipelineResult<Self> {
        let ledger = DurableLedger::open(store.clone())?;
        Ok(Self {
            config,
            ledger,
            store,
            entropy,
            evaluator,
            signer,
            job: None,
            exhausted: false,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn ledger(&self) -> &DurableLedger {
        &self.ledger
    }

    pub fn state(&self) -> PipelineState {
        match &self.job {
            Some(job) => PipelineState::Generating {
                slot: job.slot(),
                attempt: job.attempt(),
            },
            None if self.exhausted => PipelineState::Exhausted,
            None => PipelineState::Idle,
        }
    }

    /// Whether every slot was Ready at the last tick of this round.
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn has_active_job(&self) -> bool {
        self.job.is_some()
    }

    /// Start a job for the lowest slot needing a refill, if any.
    pub fn replenish_tick(&mut self) -> TickOutcome {
        if let Some(job) = &self.job {
            return TickOutcome::Busy(job.slot());
        }

        match self.ledger.next_refill_candidate() {
            Some(slot) => {
                debug!(slot = slot.get(), "[qr-03] generation started");
                self.exhausted = false;
                self.job = Some(GenerationJob::new(slot));
                TickOutcome::Started(slot)
            }
            None => {
                if !self.exhausted {
                    info!("[qr-03] all slots ready for this round");
                }
                self.exhausted = true;
                TickOutcome::Exhausted
            }
        }
    }

    /// Advance the in-flight job by one unit of work.
    ///
    /// Process faults are returned as errors after resetting the job; the
    /// caller retries after a backoff.
    pub async fn generation_step(&mut self) -> PipelineResult<StepOutcome> {
        let block_size = self.config.block_size;
        let max_invocations = self.config.max_invocations;

        let Some(job) = self.job.as_mut() else {
            return Ok(StepOutcome::Idle);
        };
        let slot = job.slot();

        if job.wants_more(block_size, max_invocations) {
            return match self.entropy.generate().await {
                Ok(output) => {
                    job.absorb(&output);
                    Ok(StepOutcome::Progress {
                        slot,
                        buffered: job.buffered(),
                    })
                }
                Err(e) => {
                    let next_attempt = job.restart();
                    warn!(slot = slot.get(), next_attempt, error = %e, "[qr-03] generator fault");
                    Err(e)
                }
            };
        }

        if !job.is_complete(block_size) {
            let next_attempt = job.restart();
            warn!(
                slot = slot.get(),
                next_attempt,
                "[qr-03] generator output short of block size, regenerating"
            );
            return Ok(StepOutcome::Rejected {
                slot,
                reason: RejectReason::ShortBlock,
                next_attempt,
            });
        }

        let attempts = job.attempt();
        let block = job.take_block(block_size);
        match self.evaluator.evaluate(&block).await {
            Ok(QualityVerdict::Pass) => {}
            Ok(QualityVerdict::Fail) => {
                let next_attempt = job.restart();
                warn!(slot = slot.get(), next_attempt, "[qr-03] quality gate failed, regenerating");
                return Ok(StepOutcome::Rejected {
                    slot,
                    reason: RejectReason::QualityGate,
                    next_attempt,
                });
            }
            Err(e) => {
                job.restart();
                return Err(e);
            }
        }

        if let Err(e) = self.commit_block(slot, &block) {
            if let Some(job) = self.job.as_mut() {
                job.restart();
            }
            return Err(e);
        }

        self.job = None;
        info!(slot = slot.get(), attempts, "[qr-03] block accepted");
        Ok(StepOutcome::Completed { slot, attempts })
    }

    /// Drop the in-flight job; its slot keeps its status and is picked up
    /// again by a later tick.
    pub fn abandon_job(&mut self) -> Option<SlotId> {
        let slot = self.job.take().map(|job| job.slot());
        if let Some(slot) = slot {
            debug!(slot = slot.get(), "[qr-03] generation abandoned");
        }
        slot
    }

    /// Claim every Ready slot, sign the combined hash and persist the
    /// signature. An empty batch yields a not-joining commitment.
    pub async fn finalize_batch(&mut self) -> PipelineResult<BatchCommitment> {
        self.exhausted = false;

        let mut claimed = Vec::new();
        for slot in self.ledger.ready_slots() {
            if let Some(hash) = self.claim_slot(slot)? {
                claimed.push(ClaimedHash { slot, hash });
            }
        }

        if claimed.is_empty() {
            info!("[qr-03] no ready slots, not joining this round");
            return Ok(BatchCommitment::not_joining());
        }

        let digest = combined_digest(&claimed);
        let signature = self.signer.sign_digest(&digest).await?;
        self.store.write(ArtifactKey::BatchSignature, &signature)?;

        info!(
            slots = claimed.len(),
            digest = %hex::encode(digest),
            "[qr-03] batch finalized"
        );
        Ok(BatchCommitment {
            claimed,
            signature: Some(signature),
        })
    }

    /// Drop last round's claims: Consumed slots return to Empty and every
    /// claimed artifact and the batch signature are removed.
    pub fn begin_new_round(&mut self) -> PipelineResult<Vec<SlotId>> {
        self.abandon_job();
        self.exhausted = false;

        let reset = self.ledger.reset_consumed()?;
        for slot in SlotId::all() {
            self.store
                .remove(ArtifactKey::slot(slot, SlotArtifact::ClaimedBlockHash))?;
            self.store
                .remove(ArtifactKey::slot(slot, SlotArtifact::ClaimedRandomBlock))?;
        }
        self.store.remove(ArtifactKey::BatchSignature)?;

        info!(reset = reset.len(), "[qr-03] new round, claims cleared");
        Ok(reset)
    }

    fn commit_block(&mut self, slot: SlotId, block: &[u8]) -> PipelineResult<()> {
        let hash = hex::encode(Sha256::digest(block));
        self.store
            .write(ArtifactKey::slot(slot, SlotArtifact::RandomBlock), block)?;
        self.store
            .write(ArtifactKey::slot(slot, SlotArtifact::BlockHash), hash.as_bytes())?;
        self.ledger.set_status(slot, SlotStatus::Ready)?;
        Ok(())
    }

    /// Rename hash then block to their claimed names and mark the slot
    /// Consumed. Any failure puts the renamed artifacts back.
    fn claim_slot(&mut self, slot: SlotId) -> PipelineResult<Option<String>> {
        let hash_key = ArtifactKey::slot(slot, SlotArtifact::BlockHash);
        let block_key = ArtifactKey::slot(slot, SlotArtifact::RandomBlock);
        let claimed_hash_key = ArtifactKey::slot(slot, SlotArtifact::ClaimedBlockHash);
        let claimed_block_key = ArtifactKey::slot(slot, SlotArtifact::ClaimedRandomBlock);

        if !self.store.exists(hash_key)? || !self.store.exists(block_key)? {
            warn!(slot = slot.get(), "[qr-03] ready slot lost its artifacts");
            self.ledger.set_status(slot, SlotStatus::Empty)?;
            return Ok(None);
        }

        self.store.rename(hash_key, claimed_hash_key)?;

        let hash = match self.store.read_text(claimed_hash_key) {
            Ok(Some(hash)) => hash,
            Ok(None) => {
                self.undo_rename(claimed_hash_key, hash_key);
                return Err(ArtifactError::not_found(claimed_hash_key).into());
            }
            Err(e) => {
                self.undo_rename(claimed_hash_key, hash_key);
                return Err(e.into());
            }
        };

        if let Err(e) = self.store.rename(block_key, claimed_block_key) {
            self.undo_rename(claimed_hash_key, hash_key);
            return Err(e.into());
        }

        if let Err(e) = self.ledger.set_status(slot, SlotStatus::Consumed) {
            self.undo_rename(claimed_block_key, block_key);
            self.undo_rename(claimed_hash_key, hash_key);
            return Err(e.into());
        }

        Ok(Some(hash))
    }

    fn undo_rename(&self, from: ArtifactKey, to: ArtifactKey) {
        if let Err(e) = self.store.rename(from, to) {
            error!(from = %from, to = %to, error = %e, "[qr-03] rollback rename failed");
        }
    }
}

#[cfg(test)]
mod tests;
