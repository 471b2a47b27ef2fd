// THEORY:
// This file is the entry point for the `signflow` library crate. It exposes the
// `PipelineController` and the data structures around it (`PipelineConfig`,
// `PredictionResult`, `Detection`, ...) as the public interface of the sign
// segmentation engine.
//
// The engine sits between two external collaborators: a landmark detector that
// yields at most one hand skeleton per video frame, and an inference service that
// scores a window of frames. Its only job is to decide, frame by frame and without
// blocking the capture loop, when a sign has just been performed, and to hand that
// window to the inference service on a separate execution context.
//
// Layering, leaf-first:
// - `core_modules`: pure, single-writer segmentation state (flattening, motion
//   estimation, stillness gating, the bounded frame batch and its flush policy).
// - `prediction`, `inference`: the result contract and the collaborators that
//   produce raw payloads.
// - `dispatcher`, `router`: the isolated worker that runs inference and the
//   session-aware path that routes results back to the caller.
// - `pipeline`: the controller that owns everything for one activation.

pub mod config;
pub mod core_modules;
pub mod dispatcher;
pub mod inference;
pub mod pipeline;
pub mod prediction;
pub mod router;
pub mod source;

pub use config::{
    CaptureConfig, DeliveryOrder, DispatchConfig, DispatchMode, InferenceConfig, PipelineConfig,
    SegmentationConfig,
};
pub use core_modules::accumulator::{BatchAccumulator, FlushDecision, MotionState};
pub use core_modules::frame_batch::FrameBatch;
pub use core_modules::landmark::{
    flatten, Detection, FlattenedVector, Landmark, LandmarkFrame, FLATTENED_LEN, LANDMARK_COUNT,
};
pub use core_modules::motion::MotionEstimator;
pub use core_modules::sampler::FrameSampler;
pub use core_modules::stillness::{StillnessGate, StillnessReading};
pub use dispatcher::{DispatchTicket, InferenceDispatcher};
pub use inference::{
    EchoInferenceClient, HttpInferenceClient, InferenceClient, InferenceError, InferenceFuture,
};
pub use pipeline::{
    FrameAction, FrameOutcome, OptionsHandle, PipelineController, PipelineOptions, SessionStats,
};
pub use prediction::{PayloadError, PredictionResult};
pub use router::ResultRouter;
pub use source::{CaptureTarget, FrameSource, ManualSource};

/// Result type alias for the segmentation engine
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the segmentation engine.
///
/// Only setup paths return these. Once a session is active, detection loss,
/// malformed payloads and transport failures degrade locally instead.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid landmark frame: expected {expected} points, found {found}")]
    InvalidFrame { expected: usize, found: usize },

    #[error("Frame source error: {0}")]
    Source(String),

    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
