// THEORY:
// The `FrameBatch` is the candidate sign: a bounded, chronological window of
// flattened hand skeletons. It is the single buffer shared (conceptually) by the
// motion estimator, which reads its two newest entries, and the batch accumulator,
// which owns the flush decision over it.
//
// The window is a FIFO with drop-oldest eviction. Pushing past capacity always
// evicts the oldest vector and never the newest, so `len() <= capacity()` holds
// after every operation.

use crate::core_modules::landmark::FlattenedVector;
use std::collections::VecDeque;

/// Default capacity of the batch, in frames.
pub const MAX_FRAMES: usize = 90;

/// A bounded FIFO window of flattened frames.
#[derive(Debug, Clone)]
pub struct FrameBatch {
    frames: VecDeque<FlattenedVector>,
    capacity: usize,
}

impl FrameBatch {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends a vector, returning the evicted oldest vector if the window was full.
    pub fn push(&mut self, vector: FlattenedVector) -> Option<FlattenedVector> {
        let evicted = if self.frames.len() >= self.capacity {
            self.frames.pop_front()
        } else {
            None
        };
        self.frames.push_back(vector);
        evicted
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn newest(&self) -> Option<&FlattenedVector> {
        self.frames.back()
    }

    /// The newest vector and its immediate predecessor, as `(previous, newest)`.
    pub fn last_two(&self) -> Option<(&FlattenedVector, &FlattenedVector)> {
        let len = self.frames.len();
        if len < 2 {
            return None;
        }
        Some((&self.frames[len - 2], &self.frames[len - 1]))
    }

    pub fn iter(&self) -> impl Iterator<Item = &FlattenedVector> {
        self.frames.iter()
    }

    /// Copies the window out in chronological order.
    pub fn snapshot(&self) -> Vec<FlattenedVector> {
        self.frames.iter().copied().collect()
    }
}

impl Default for FrameBatch {
    fn default() -> Self {
        Self::with_capacity(MAX_FRAMES)
    }
}
