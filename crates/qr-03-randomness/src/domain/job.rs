//! # Generation Job
//!
//! Resumable state of one block generation. Each pipeline step advances
//! the job by a single generator invocation; once the buffer holds a full
//! block (or the invocation budget is spent) the job is ready for the
//! quality gate.

use shared_types::SlotId;

/// Observable pipeline state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// No job and at least one slot may still need work.
    Idle,
    /// A job is in flight.
    Generating { slot: SlotId, attempt: u32 },
    /// Every slot is Ready for this round.
    Exhausted,
}

#[derive(Debug)]
pub struct GenerationJob {
    slot: SlotId,
    buffer: Vec<u8>,
    invocations: u32,
    attempt: u32,
}

impl GenerationJob {
    pub fn new(slot: SlotId) -> Self {
        Self {
            slot,
            buffer: Vec::new(),
            invocations: 0,
            attempt: 1,
        }
    }

    pub fn slot(&self) -> SlotId {
        self.slot
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn invocations(&self) -> u32 {
        self.invocations
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Whether another generator invocation is needed and allowed.
    pub fn wants_more(&self, block_size: usize, max_invocations: u32) -> bool {
        self.buffer.len() < block_size && self.invocations < max_invocations
    }

    pub fn is_complete(&self, block_size: usize) -> bool {
        self.buffer.len() >= block_size
    }

    pub fn absorb(&mut self, output: &[u8]) {
        self.buffer.extend_from_slice(output);
        self.invocations += 1;
    }

    /// Take exactly `block_size` bytes out of the buffer.
    pub fn take_block(&mut self, block_size: usize) -> Vec<u8> {
        let mut block = std::mem::take(&mut self.buffer);
        block.truncate(block_size);
        block
    }

    /// Discard progress and start the next attempt for the same slot.
    /// Returns the new attempt number.
    pub fn restart(&mut self) -> u32 {
        self.buffer.clear();
        self.invocations = 0;
        self.attempt += 1;
        self.attempt
    }
}
