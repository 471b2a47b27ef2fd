// THEORY:
// The `MotionEstimator` turns the stream of flattened skeletons into one scalar: how
// much the hand is moving right now. It compares the newest vector in the batch
// with its immediate predecessor (Euclidean distance over all 63 dimensions) and
// folds that delta into an exponential moving average:
//
//     smoothed = alpha * smoothed + (1 - alpha) * delta,   alpha = 0.8
//
// The stillness threshold downstream is tuned against this exact recurrence, so it
// must not change. The update is O(1) per frame: the estimator keeps only the
// running average and reads the last two entries of the batch.

use crate::core_modules::frame_batch::FrameBatch;
use crate::core_modules::landmark::FlattenedVector;

/// Weight given to the previous smoothed value.
pub const DEFAULT_SMOOTHING_FACTOR: f32 = 0.8;

/// Exponential moving average of inter-frame distance.
#[derive(Debug, Clone)]
pub struct MotionEstimator {
    smoothing_factor: f32,
    smoothed: f32,
}

impl MotionEstimator {
    pub fn new(smoothing_factor: f32) -> Self {
        Self {
            smoothing_factor,
            smoothed: 0.0,
        }
    }

    /// Folds the newest inter-frame delta of `batch` into the average.
    ///
    /// Must be called once per push. With fewer than two frames in the batch the
    /// current value is returned unchanged.
    pub fn update(&mut self, batch: &FrameBatch) -> f32 {
        let Some((previous, newest)) = batch.last_two() else {
            return self.smoothed;
        };
        let delta = euclidean_distance(previous, newest);
        self.smoothed =
            self.smoothing_factor * self.smoothed + (1.0 - self.smoothing_factor) * delta;
        self.smoothed
    }

    pub fn smoothed(&self) -> f32 {
        self.smoothed
    }

    pub fn reset(&mut self) {
        self.smoothed = 0.0;
    }
}

impl Default for MotionEstimator {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_FACTOR)
    }
}

/// Euclidean distance between two flattened frames.
pub fn euclidean_distance(a: &FlattenedVector, b: &FlattenedVector) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f32>()
        .sqrt()
}
