// THEORY:
// The `FrameSampler` bounds the CPU cost of the capture loop. It admits every
// `process_every_nth` frame that carries a hand, and only if more than
// `min_interval` has elapsed since the last admitted frame. Rejected frames are
// dropped on the spot; nothing is ever queued for later.

use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct FrameSampler {
    every_nth: u64,
    min_interval: Duration,
    seen: u64,
    last_admitted: Option<Instant>,
}

impl FrameSampler {
    pub fn new(every_nth: u32, min_interval: Duration) -> Self {
        Self {
            every_nth: u64::from(every_nth.max(1)),
            min_interval,
            seen: 0,
            last_admitted: None,
        }
    }

    pub fn admit(&mut self, now: Instant) -> bool {
        self.seen += 1;
        if self.seen % self.every_nth != 0 {
            return false;
        }
        if let Some(last) = self.last_admitted {
            if now.saturating_duration_since(last) <= self.min_interval {
                return false;
            }
        }
        self.last_admitted = Some(now);
        true
    }

    pub fn reset(&mut self) {
        self.seen = 0;
        self.last_admitted = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_every_other_frame() {
        let t0 = Instant::now();
        let mut sampler = FrameSampler::new(2, Duration::ZERO);

        let admitted: Vec<bool> = (0..6)
            .map(|i| sampler.admit(t0 + Duration::from_millis(16 * i)))
            .collect();

        assert_eq!(admitted, vec![false, true, false, true, false, true]);
    }

    #[test]
    fn enforces_minimum_interval() {
        let t0 = Instant::now();
        let mut sampler = FrameSampler::new(1, Duration::from_millis(33));

        assert!(sampler.admit(t0));
        assert!(!sampler.admit(t0 + Duration::from_millis(20)));
        assert!(!sampler.admit(t0 + Duration::from_millis(33)));
        assert!(sampler.admit(t0 + Duration::from_millis(34)));
    }

    #[test]
    fn reset_restarts_the_stride() {
        let t0 = Instant::now();
        let mut sampler = FrameSampler::new(2, Duration::ZERO);
        sampler.admit(t0);
        sampler.reset();

        assert!(!sampler.admit(t0));
        assert!(sampler.admit(t0 + Duration::from_millis(1)));
    }
}
