// THEORY:
// The `StillnessGate` is a small state machine driven by the smoothed motion level.
// It classifies each update as still or moving and remembers when the current still
// window began.
//
// Transition rules, per update:
// - `is_still` is recomputed every time as `smoothed < threshold`; it is never
//   stored independently of the last reading.
// - A moving -> still edge (`just_stopped`) stamps `still_since = now`.
// - Any moving reading clears `still_since`.
// - `still_duration` is `now - still_since` while still, zero otherwise. On the
//   `just_stopped` update it is necessarily zero.
//
// Losing the hand resets the gate entirely; the next still reading is treated as a
// fresh moving -> still edge.

use std::time::{Duration, Instant};

/// Smoothed motion below this value counts as still.
pub const DEFAULT_STILL_THRESHOLD: f32 = 0.15;

/// The gate's verdict for one update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StillnessReading {
    pub is_still: bool,
    /// True only on the update where motion stopped.
    pub just_stopped: bool,
    pub still_duration: Duration,
}

#[derive(Debug, Clone)]
pub struct StillnessGate {
    threshold: f32,
    still_since: Option<Instant>,
    previous_is_still: bool,
}

impl StillnessGate {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            still_since: None,
            previous_is_still: false,
        }
    }

    pub fn update(&mut self, smoothed: f32, now: Instant) -> StillnessReading {
        let is_still = smoothed < self.threshold;
        let just_stopped = !self.previous_is_still && is_still;

        if just_stopped {
            self.still_since = Some(now);
        }
        if !is_still {
            self.still_since = None;
        }

        let still_duration = match (is_still, self.still_since) {
            (true, Some(since)) => now.saturating_duration_since(since),
            _ => Duration::ZERO,
        };
        self.previous_is_still = is_still;

        StillnessReading {
            is_still,
            just_stopped,
            still_duration,
        }
    }

    /// Drops the pending still window without touching the moving/still edge.
    /// Called after a flush so the next window has to be earned again.
    pub fn clear_still_since(&mut self) {
        self.still_since = None;
    }

    pub fn reset(&mut self) {
        self.still_since = None;
        self.previous_is_still = false;
    }

    pub fn still_since(&self) -> Option<Instant> {
        self.still_since
    }

    /// The classification made by the most recent update.
    pub fn is_still(&self) -> bool {
        self.previous_is_still
    }
}

impl Default for StillnessGate {
    fn default() -> Self {
        Self::new(DEFAULT_STILL_THRESHOLD)
    }
}
