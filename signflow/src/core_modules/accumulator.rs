// THEORY:
// The `BatchAccumulator` is where a stream of frames becomes a discrete sign. It
// owns the frame batch together with the motion estimator and stillness gate that
// read it, and it makes the flush decision once per admitted frame.
//
// Key architectural principles:
// 1.  **Two Ways to Flush**: A batch is flushed when the hand has held a completed
//     sign still for long enough (`min_still_duration`), or, as a fallback, when the
//     hand is still and more than `still_send_interval` has passed since the last
//     send. The fallback keeps a sign that is held continuously still from starving
//     once its still window has been consumed by a previous flush. Both paths
//     require at least `min_frames_to_send` frames, so near-empty or noise-only
//     batches never leave the capture loop.
// 2.  **One-Frame Delay**: On the frame where motion stops, the still window is zero
//     frames old. That frame never flushes, even when the fallback would otherwise
//     fire, so a single-frame "still" glitch cannot trigger a dispatch.
// 3.  **Split Commit**: `push` only decides and hands back a snapshot. The caller
//     commits the flush with `mark_sent`, which clears the batch, stamps the send
//     time and drops the pending still window.
// 4.  **Reset on Loss**: When the detector loses the hand, `reset` clears the batch
//     and all motion and stillness state. Nothing is flushed.
// 5.  **Single Writer**: Exactly one capture loop drives an accumulator. There is no
//     locking here.

use crate::config::SegmentationConfig;
use crate::core_modules::frame_batch::FrameBatch;
use crate::core_modules::landmark::FlattenedVector;
use crate::core_modules::motion::MotionEstimator;
use crate::core_modules::stillness::{StillnessGate, StillnessReading};
use std::time::{Duration, Instant};
use tracing::debug;

/// The accumulator's verdict for one pushed frame.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushDecision {
    Hold,
    /// The batch is a completed sign. Carries a chronological copy of it.
    Flush(Vec<FlattenedVector>),
}

impl FlushDecision {
    pub fn is_flush(&self) -> bool {
        matches!(self, FlushDecision::Flush(_))
    }
}

/// Observable motion state of the current session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionState {
    pub smoothed: f32,
    pub is_still: bool,
    pub still_since: Option<Instant>,
}

pub struct BatchAccumulator {
    batch: FrameBatch,
    estimator: MotionEstimator,
    gate: StillnessGate,
    min_frames_to_send: usize,
    min_still_duration: Duration,
    still_send_interval: Duration,
    /// Last commit time. Starts at activation so the fallback interval counts
    /// from the moment the session began.
    last_sent_at: Instant,
}

impl BatchAccumulator {
    pub fn new(config: &SegmentationConfig, started_at: Instant) -> Self {
        Self {
            batch: FrameBatch::with_capacity(config.max_frames),
            estimator: MotionEstimator::new(config.smoothing_factor),
            gate: StillnessGate::new(config.still_threshold),
            min_frames_to_send: config.min_frames_to_send,
            min_still_duration: config.min_still_duration(),
            still_send_interval: config.still_send_interval(),
            last_sent_at: started_at,
        }
    }

    pub fn push(&mut self, vector: FlattenedVector, now: Instant) -> FlushDecision {
        self.batch.push(vector);
        let smoothed = self.estimator.update(&self.batch);
        let reading = self.gate.update(smoothed, now);

        if reading.just_stopped {
            debug!(frames = self.batch.len(), smoothed, "motion stopped; holding for one frame");
            return FlushDecision::Hold;
        }

        if self.should_send(&reading, now) {
            debug!(
                frames = self.batch.len(),
                still_ms = reading.still_duration.as_millis() as u64,
                "batch ready to flush"
            );
            FlushDecision::Flush(self.batch.snapshot())
        } else {
            FlushDecision::Hold
        }
    }

    fn should_send(&self, reading: &StillnessReading, now: Instant) -> bool {
        let enough_frames = self.batch.len() >= self.min_frames_to_send;
        let held_long_enough = enough_frames
            && reading.is_still
            && reading.still_duration >= self.min_still_duration;
        let interval_elapsed = reading.is_still
            && now.saturating_duration_since(self.last_sent_at) > self.still_send_interval
            && enough_frames;
        held_long_enough || interval_elapsed
    }

    /// Commits a flush returned by `push`.
    pub fn mark_sent(&mut self, now: Instant) {
        self.batch.clear();
        self.last_sent_at = now;
        self.gate.clear_still_since();
    }

    /// Drops the buffered frames but keeps motion state.
    pub fn clear(&mut self) {
        self.batch.clear();
    }

    /// Hand lost: clears the batch and all motion and stillness state.
    pub fn reset(&mut self) {
        self.batch.clear();
        self.estimator.reset();
        self.gate.reset();
    }

    pub fn len(&self) -> usize {
        self.batch.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batch.is_empty()
    }

    pub fn batch(&self) -> &FrameBatch {
        &self.batch
    }

    pub fn last_sent_at(&self) -> Instant {
        self.last_sent_at
    }

    pub fn motion_state(&self) -> MotionState {
        MotionState {
            smoothed: self.estimator.smoothed(),
            is_still: self.gate.is_still(),
            still_since: self.gate.still_since(),
        }
    }
}
