use std::sync::Arc;

use qr_01_slot_ledger::{ArtifactStore, MemoryArtifactStore};
use sha2::{Digest, Sha256};
use shared_types::{ArtifactKey, SlotArtifact, SlotId, SlotStatus};

use super::*;
use crate::adapters::{RecordingSigner, ScriptedEntropySource, ScriptedEvaluator};
use crate::domain::combined_digest;
use crate::error::PipelineError;

struct Harness {
    pipeline: RandomnessPipeline,
    store: Arc<MemoryArtifactStore>,
    entropy: Arc<ScriptedEntropySource>,
    evaluator: Arc<ScriptedEvaluator>,
    signer: Arc<RecordingSigner>,
}

fn slot(n: u8) -> SlotId {
    SlotId::new(n).unwrap()
}

fn key(n: u8, artifact: SlotArtifact) -> ArtifactKey {
    ArtifactKey::slot(slot(n), artifact)
}

fn harness_with(config: PipelineConfig, evaluator: ScriptedEvaluator) -> Harness {
    let store = Arc::new(MemoryArtifactStore::new());
    // 64-byte blocks from 16-byte invocations: four steps per block.
    let entropy = Arc::new(ScriptedEntropySource::new(16));
    let evaluator = Arc::new(evaluator);
    let signer = Arc::new(RecordingSigner::new());
    let pipeline = RandomnessPipeline::new(
        config,
        store.clone(),
        entropy.clone(),
        evaluator.clone(),
        signer.clone(),
    )
    .unwrap();
    Harness {
        pipeline,
        store,
        entropy,
        evaluator,
        signer,
    }
}

fn harness() -> Harness {
    harness_with(PipelineConfig::for_testing(), ScriptedEvaluator::passing())
}

/// Tick and step until the started slot completes.
async fn fill_next(pipeline: &mut RandomnessPipeline) -> SlotId {
    let TickOutcome::Started(started) = pipeline.replenish_tick() else {
        panic!("expected a slot to start");
    };
    for _ in 0..100 {
        if let StepOutcome::Completed { slot, .. } = pipeline.generation_step().await.unwrap() {
            assert_eq!(slot, started);
            return slot;
        }
    }
    panic!("slot {} never completed", started);
}

#[tokio::test]
async fn test_tick_starts_lowest_slot_and_reports_busy() {
    let mut h = harness();

    assert_eq!(h.pipeline.replenish_tick(), TickOutcome::Started(slot(1)));
    assert_eq!(h.pipeline.replenish_tick(), TickOutcome::Busy(slot(1)));
    assert_eq!(
        h.pipeline.state(),
        PipelineState::Generating {
            slot: slot(1),
            attempt: 1
        }
    );
}

#[tokio::test]
async fn test_step_without_job_is_idle() {
    let mut h = harness();
    assert_eq!(h.pipeline.generation_step().await.unwrap(), StepOutcome::Idle);
    assert_eq!(h.entropy.calls(), 0);
}

#[tokio::test]
async fn test_accepted_block_persists_block_hash_and_status() {
    let mut h = harness();
    h.pipeline.replenish_tick();

    for expected in [16, 32, 48, 64] {
        assert_eq!(
            h.pipeline.generation_step().await.unwrap(),
            StepOutcome::Progress {
                slot: slot(1),
                buffered: expected
            }
        );
    }
    assert_eq!(
        h.pipeline.generation_step().await.unwrap(),
        StepOutcome::Completed {
            slot: slot(1),
            attempts: 1
        }
    );

    let block = h.store.read(key(1, SlotArtifact::RandomBlock)).unwrap().unwrap();
    assert_eq!(block.len(), 64);
    let hash = h.store.read_text(key(1, SlotArtifact::BlockHash)).unwrap().unwrap();
    assert_eq!(hash, hex::encode(Sha256::digest(&block)));
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Ready);
    assert!(!h.pipeline.has_active_job());
    assert_eq!(h.evaluator.evaluated(), vec![64]);
}

#[tokio::test]
async fn test_quality_failure_regenerates_same_slot() {
    let mut h = harness_with(
        PipelineConfig::for_testing(),
        ScriptedEvaluator::with_verdicts([QualityVerdict::Fail, QualityVerdict::Fail]),
    );
    h.pipeline.replenish_tick();

    let mut rejections = Vec::new();
    let completed = loop {
        match h.pipeline.generation_step().await.unwrap() {
            StepOutcome::Rejected {
                slot,
                reason,
                next_attempt,
            } => rejections.push((slot, reason, next_attempt)),
            StepOutcome::Completed { slot, attempts } => break (slot, attempts),
            _ => {}
        }
    };

    assert_eq!(
        rejections,
        vec![
            (slot(1), RejectReason::QualityGate, 2),
            (slot(1), RejectReason::QualityGate, 3),
        ]
    );
    assert_eq!(completed, (slot(1), 3));
    assert!(!h.store.exists(key(2, SlotArtifact::RandomBlock)).unwrap());
}

#[tokio::test]
async fn test_rejected_block_is_never_persisted() {
    let mut h = harness_with(
        PipelineConfig::for_testing(),
        ScriptedEvaluator::with_verdicts([QualityVerdict::Fail]),
    );
    h.pipeline.replenish_tick();
    for _ in 0..5 {
        h.pipeline.generation_step().await.unwrap();
    }

    assert!(!h.store.exists(key(1, SlotArtifact::RandomBlock)).unwrap());
    assert!(!h.store.exists(key(1, SlotArtifact::BlockHash)).unwrap());
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Empty);
}

#[tokio::test]
async fn test_short_output_after_budget_is_rejected() {
    let config = PipelineConfig {
        max_invocations: 2,
        ..PipelineConfig::for_testing()
    };
    let mut h = harness_with(config, ScriptedEvaluator::passing());
    h.pipeline.replenish_tick();

    h.pipeline.generation_step().await.unwrap();
    h.pipeline.generation_step().await.unwrap();
    assert_eq!(
        h.pipeline.generation_step().await.unwrap(),
        StepOutcome::Rejected {
            slot: slot(1),
            reason: RejectReason::ShortBlock,
            next_attempt: 2
        }
    );
    assert!(h.evaluator.evaluated().is_empty());
}

#[tokio::test]
async fn test_generator_fault_restarts_job() {
    let mut h = harness();
    h.pipeline.replenish_tick();
    h.pipeline.generation_step().await.unwrap();

    h.entropy.fail_next(1);
    let err = h.pipeline.generation_step().await.unwrap_err();
    assert!(matches!(err, PipelineError::Generator { .. }));
    assert_eq!(
        h.pipeline.state(),
        PipelineState::Generating {
            slot: slot(1),
            attempt: 2
        }
    );

    // The retried attempt starts from an empty buffer.
    assert_eq!(
        h.pipeline.generation_step().await.unwrap(),
        StepOutcome::Progress {
            slot: slot(1),
            buffered: 16
        }
    );
}

#[tokio::test]
async fn test_commit_failure_keeps_slot_empty() {
    let mut h = harness();
    h.store.fail_on(key(1, SlotArtifact::BlockHash));
    h.pipeline.replenish_tick();

    for _ in 0..4 {
        h.pipeline.generation_step().await.unwrap();
    }
    let err = h.pipeline.generation_step().await.unwrap_err();
    assert!(matches!(err, PipelineError::Artifact(_)));
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Empty);
    assert!(h.pipeline.has_active_job());
}

#[tokio::test]
async fn test_exhausted_once_every_slot_is_ready() {
    let mut h = harness();
    for n in 1..=shared_types::SLOT_COUNT {
        assert_eq!(fill_next(&mut h.pipeline).await, slot(n));
    }

    assert_eq!(h.pipeline.replenish_tick(), TickOutcome::Exhausted);
    assert!(h.pipeline.is_exhausted());
    assert_eq!(h.pipeline.state(), PipelineState::Exhausted);
}

#[tokio::test]
async fn test_finalize_claims_ready_slots_in_order_and_signs() {
    let mut h = harness();
    for _ in 0..3 {
        fill_next(&mut h.pipeline).await;
    }
    let hashes: Vec<String> = (1..=3)
        .map(|n| h.store.read_text(key(n, SlotArtifact::BlockHash)).unwrap().unwrap())
        .collect();

    let commitment = h.pipeline.finalize_batch().await.unwrap();

    assert!(commitment.is_joining());
    let claimed: Vec<(SlotId, String)> = commitment
        .claimed
        .iter()
        .map(|c| (c.slot, c.hash.clone()))
        .collect();
    assert_eq!(
        claimed,
        vec![
            (slot(1), hashes[0].clone()),
            (slot(2), hashes[1].clone()),
            (slot(3), hashes[2].clone()),
        ]
    );

    let digest = combined_digest(&commitment.claimed);
    assert_eq!(h.signer.digests(), vec![digest]);
    assert_eq!(
        commitment.signature,
        Some(RecordingSigner::signature_for(&digest))
    );
    assert_eq!(
        h.store.read(ArtifactKey::BatchSignature).unwrap(),
        commitment.signature
    );

    for n in 1..=3 {
        assert_eq!(h.pipeline.ledger().status(slot(n)), SlotStatus::Consumed);
        assert!(h.store.exists(key(n, SlotArtifact::ClaimedBlockHash)).unwrap());
        assert!(h.store.exists(key(n, SlotArtifact::ClaimedRandomBlock)).unwrap());
        assert!(!h.store.exists(key(n, SlotArtifact::BlockHash)).unwrap());
        assert!(!h.store.exists(key(n, SlotArtifact::RandomBlock)).unwrap());
    }
}

#[tokio::test]
async fn test_finalize_abandons_nothing_in_flight() {
    let mut h = harness();
    fill_next(&mut h.pipeline).await;
    h.pipeline.replenish_tick();
    h.pipeline.generation_step().await.unwrap();

    let commitment = h.pipeline.finalize_batch().await.unwrap();

    assert_eq!(commitment.claimed.len(), 1);
    assert_eq!(
        h.pipeline.state(),
        PipelineState::Generating {
            slot: slot(2),
            attempt: 1
        }
    );
}

#[tokio::test]
async fn test_finalize_without_ready_slots_is_not_joining() {
    let mut h = harness();

    let commitment = h.pipeline.finalize_batch().await.unwrap();

    assert!(!commitment.is_joining());
    assert_eq!(commitment.signature_hex(), "");
    assert!(h.signer.digests().is_empty());
    assert!(!h.store.exists(ArtifactKey::BatchSignature).unwrap());
}

#[tokio::test]
async fn test_finalize_signing_failure_is_transport() {
    let mut h = harness();
    fill_next(&mut h.pipeline).await;
    h.signer.set_unavailable(true);

    let err = h.pipeline.finalize_batch().await.unwrap_err();

    assert!(err.is_transport());
    assert!(!h.store.exists(ArtifactKey::BatchSignature).unwrap());
}

#[tokio::test]
async fn test_claim_rolls_back_when_block_rename_fails() {
    let mut h = harness();
    fill_next(&mut h.pipeline).await;
    h.store.fail_on(key(1, SlotArtifact::ClaimedRandomBlock));

    let err = h.pipeline.finalize_batch().await.unwrap_err();

    assert!(matches!(err, PipelineError::Artifact(_)));
    assert!(h.store.exists(key(1, SlotArtifact::BlockHash)).unwrap());
    assert!(h.store.exists(key(1, SlotArtifact::RandomBlock)).unwrap());
    assert!(!h.store.exists(key(1, SlotArtifact::ClaimedBlockHash)).unwrap());
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Ready);
}

#[tokio::test]
async fn test_claim_rolls_back_when_ledger_write_fails() {
    let mut h = harness();
    fill_next(&mut h.pipeline).await;
    h.store.fail_on(ArtifactKey::Ledger);

    let err = h.pipeline.finalize_batch().await.unwrap_err();

    assert!(matches!(err, PipelineError::Ledger(_)));
    assert!(h.store.exists(key(1, SlotArtifact::BlockHash)).unwrap());
    assert!(h.store.exists(key(1, SlotArtifact::RandomBlock)).unwrap());
    assert!(!h.store.exists(key(1, SlotArtifact::ClaimedRandomBlock)).unwrap());
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Ready);
}

#[tokio::test]
async fn test_ready_slot_with_lost_hash_is_demoted() {
    let mut h = harness();
    fill_next(&mut h.pipeline).await;
    h.store.remove(key(1, SlotArtifact::BlockHash)).unwrap();

    let commitment = h.pipeline.finalize_batch().await.unwrap();

    assert!(!commitment.is_joining());
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Empty);
}

#[tokio::test]
async fn test_consumed_slot_is_refilled_before_ready_ones() {
    let mut h = harness();
    for _ in 0..shared_types::SLOT_COUNT {
        fill_next(&mut h.pipeline).await;
    }
    h.pipeline.finalize_batch().await.unwrap();

    assert_eq!(h.pipeline.replenish_tick(), TickOutcome::Started(slot(1)));
    assert!(!h.pipeline.is_exhausted());
}

#[tokio::test]
async fn test_new_round_clears_claims_and_resets_consumed() {
    let mut h = harness();
    for _ in 0..3 {
        fill_next(&mut h.pipeline).await;
    }
    h.pipeline.finalize_batch().await.unwrap();
    // Slot 1 refilled during the round stays Ready.
    fill_next(&mut h.pipeline).await;
    h.pipeline.replenish_tick();

    let reset = h.pipeline.begin_new_round().unwrap();

    assert_eq!(reset, vec![slot(2), slot(3)]);
    assert!(!h.pipeline.has_active_job());
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Ready);
    for n in 2..=3 {
        assert_eq!(h.pipeline.ledger().status(slot(n)), SlotStatus::Empty);
    }
    for stored in h.store.keys() {
        if let ArtifactKey::Slot(_, artifact) = stored {
            assert!(!artifact.is_claimed(), "claimed artifact left: {}", stored);
        }
    }
    assert!(!h.store.exists(ArtifactKey::BatchSignature).unwrap());
}

#[tokio::test]
async fn test_abandon_job_leaves_status_untouched() {
    let mut h = harness();
    h.pipeline.replenish_tick();
    h.pipeline.generation_step().await.unwrap();

    assert_eq!(h.pipeline.abandon_job(), Some(slot(1)));
    assert_eq!(h.pipeline.abandon_job(), None);
    assert_eq!(h.pipeline.ledger().status(slot(1)), SlotStatus::Empty);
    assert_eq!(h.pipeline.replenish_tick(), TickOutcome::Started(slot(1)));
}
