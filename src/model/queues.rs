// src/model/queues.rs

use crate::model::PIPELINE_SLOTS;
use std::collections::VecDeque;

/// Orders placed but not yet delivered, indexed by remaining lead time.
///
/// Slot 0 is delivered at the start of the next step, the last slot holds the
/// order placed this step. The pipeline always holds exactly `PIPELINE_SLOTS`
/// entries between steps.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderPipeline {
    buffer: VecDeque<u32>,
}

impl OrderPipeline {
    pub fn new() -> Self {
        // Pre-fill with 0s so orders take the full lead time to traverse the pipe
        let buffer = std::iter::repeat(0).take(PIPELINE_SLOTS).collect();
        Self { buffer }
    }

    /// Step 1: Units at the front arrive.
    /// Call this at the START of the turn, paired with `push_order` later on.
    pub fn pop_arrival(&mut self) -> u32 {
        self.buffer.pop_front().unwrap_or(0)
    }

    /// Step 5: The new order enters at the tail.
    /// Call this at the END of the turn.
    pub fn push_order(&mut self, quantity: u32) {
        self.buffer.push_back(quantity);
    }

    pub fn clear(&mut self) {
        self.buffer.iter_mut().for_each(|slot| *slot = 0);
    }

    /// Total units in transit.
    pub fn in_transit(&self) -> u32 {
        self.buffer.iter().sum()
    }

    pub fn slots(&self) -> [u32; PIPELINE_SLOTS] {
        let mut out = [0; PIPELINE_SLOTS];
        for (dst, src) in out.iter_mut().zip(self.buffer.iter()) {
            *dst = *src;
        }
        out
    }
}

impl Default for OrderPipeline {
    fn default() -> Self {
        Self::new()
    }
}
