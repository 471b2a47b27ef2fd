//! Capture sources.
//!
//! A `FrameSource` is whatever produces detections: a camera plus a landmark
//! detector in production, a recording during replay. The controller only starts
//! and stops it; detections are pushed into `PipelineController::on_results` by the
//! owner of the source.

use crate::Result;
use tracing::debug;

/// Requested capture resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureTarget {
    pub width: u32,
    pub height: u32,
}

pub trait FrameSource: Send {
    /// Begins producing frames. Called once per activation.
    fn start(&mut self, target: CaptureTarget) -> Result<()>;

    /// Stops producing frames and releases the device. Must tolerate repeated calls.
    fn stop(&mut self);
}

/// A source driven entirely by its owner. Tracks only whether it is running.
#[derive(Debug, Default)]
pub struct ManualSource {
    running: Option<CaptureTarget>,
}

impl ManualSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    pub fn target(&self) -> Option<CaptureTarget> {
        self.running
    }
}

impl FrameSource for ManualSource {
    fn start(&mut self, target: CaptureTarget) -> Result<()> {
        debug!(width = target.width, height = target.height, "manual source started");
        self.running = Some(target);
        Ok(())
    }

    fn stop(&mut self) {
        if self.running.take().is_some() {
            debug!("manual source stopped");
        }
    }
}
