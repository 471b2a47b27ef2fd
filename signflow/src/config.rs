//! Configuration for the segmentation pipeline.
//!
//! Every section falls back to its defaults when omitted from a TOML file, so a
//! config only needs to name what it changes.

use crate::core_modules::frame_batch::MAX_FRAMES;
use crate::core_modules::motion::DEFAULT_SMOOTHING_FACTOR;
use crate::core_modules::stillness::DEFAULT_STILL_THRESHOLD;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration for a `PipelineController`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub segmentation: SegmentationConfig,
    pub capture: CaptureConfig,
    pub dispatch: DispatchConfig,
    pub inference: InferenceConfig,
}

/// Thresholds that decide when a batch is a completed sign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmentationConfig {
    /// Capacity of the frame batch; older frames are evicted beyond this.
    pub max_frames: usize,
    /// No batch smaller than this is ever flushed.
    pub min_frames_to_send: usize,
    /// Weight of the previous value in the motion moving average.
    pub smoothing_factor: f32,
    /// Smoothed motion below this is considered still.
    pub still_threshold: f32,
    /// How long the hand must stay still before a flush (ms).
    pub min_still_duration_ms: u64,
    /// Fallback: flush a still hand at least this often (ms).
    pub still_send_interval_ms: u64,
}

/// Capture-side sampling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Target frame width requested from the frame source.
    pub width: u32,
    /// Target frame height requested from the frame source.
    pub height: u32,
    /// Process only every n-th frame with a hand.
    pub process_every_nth: u32,
    /// Minimum gap between two processed frames (ms).
    pub min_process_interval_ms: u64,
}

/// How flushed work reaches the inference collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub mode: DispatchMode,
    /// In single-frame mode, minimum gap between two dispatches (ms).
    pub single_frame_interval_ms: u64,
    /// Bound of the queue between the capture loop and the worker.
    pub queue_capacity: usize,
    /// Requests the worker runs concurrently.
    pub max_in_flight: usize,
    pub request_timeout_ms: u64,
    pub delivery: DeliveryOrder,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub endpoint: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchMode {
    /// Accumulate frames and flush a whole window once the hand holds still.
    #[default]
    Sequence,
    /// Send the newest frame on its own at a fixed interval.
    SingleFrame,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOrder {
    /// Deliver every current-session result in the order it arrives.
    #[default]
    Arrival,
    /// Drop a result when a later-sent batch has already been delivered.
    LatestSent,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            max_frames: MAX_FRAMES,
            min_frames_to_send: 15,
            smoothing_factor: DEFAULT_SMOOTHING_FACTOR,
            still_threshold: DEFAULT_STILL_THRESHOLD,
            min_still_duration_ms: 700,
            still_send_interval_ms: 1000,
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            process_every_nth: 2,
            min_process_interval_ms: 33,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            mode: DispatchMode::Sequence,
            single_frame_interval_ms: 1000,
            queue_capacity: 4,
            max_in_flight: 2,
            request_timeout_ms: 5000,
            delivery: DeliveryOrder::Arrival,
        }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8000/predict".to_string(),
        }
    }
}

impl SegmentationConfig {
    pub fn min_still_duration(&self) -> Duration {
        Duration::from_millis(self.min_still_duration_ms)
    }

    pub fn still_send_interval(&self) -> Duration {
        Duration::from_millis(self.still_send_interval_ms)
    }
}

impl CaptureConfig {
    pub fn min_process_interval(&self) -> Duration {
        Duration::from_millis(self.min_process_interval_ms)
    }
}

impl DispatchConfig {
    pub fn single_frame_interval(&self) -> Duration {
        Duration::from_millis(self.single_frame_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    /// Returns the first invalid field as an `Error::Config`.
    pub fn validate(&self) -> Result<()> {
        let seg = &self.segmentation;
        if seg.max_frames == 0 {
            return Err(Error::Config("max_frames must be > 0".to_string()));
        }
        if seg.min_frames_to_send == 0 {
            return Err(Error::Config("min_frames_to_send must be > 0".to_string()));
        }
        if seg.min_frames_to_send > seg.max_frames {
            return Err(Error::Config(format!(
                "min_frames_to_send ({}) must not exceed max_frames ({})",
                seg.min_frames_to_send, seg.max_frames
            )));
        }
        if !(0.0..1.0).contains(&seg.smoothing_factor) {
            return Err(Error::Config(format!(
                "smoothing_factor must be in [0, 1), got {}",
                seg.smoothing_factor
            )));
        }
        if !(seg.still_threshold > 0.0 && seg.still_threshold.is_finite()) {
            return Err(Error::Config(format!(
                "still_threshold must be a positive number, got {}",
                seg.still_threshold
            )));
        }
        if self.capture.process_every_nth == 0 {
            return Err(Error::Config("process_every_nth must be > 0".to_string()));
        }
        if self.dispatch.queue_capacity == 0 {
            return Err(Error::Config("queue_capacity must be > 0".to_string()));
        }
        if self.dispatch.max_in_flight == 0 {
            return Err(Error::Config("max_in_flight must be > 0".to_string()));
        }
        if self.dispatch.request_timeout_ms == 0 {
            return Err(Error::Config("request_timeout_ms must be > 0".to_string()));
        }
        if self.inference.endpoint.trim().is_empty() {
            return Err(Error::Config("endpoint must not be empty".to_string()));
        }
        Ok(())
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Generate TOML representation
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}
