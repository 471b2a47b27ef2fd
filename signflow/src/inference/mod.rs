//! Inference collaborators.
//!
//! The engine never scores anything itself. It hands a window of frames (or a single
//! frame) to an `InferenceClient` and receives an untyped JSON payload back. Shape
//! validation happens in the dispatcher, not here.

mod echo;
mod http;

pub use echo::EchoInferenceClient;
pub use http::HttpInferenceClient;

use crate::core_modules::landmark::FlattenedVector;
use futures::future::BoxFuture;
use serde_json::Value;

/// Raw payload, or the reason none arrived.
pub type InferenceFuture<'a> = BoxFuture<'a, Result<Value, InferenceError>>;

/// An asynchronous scorer for landmark windows.
pub trait InferenceClient: Send + Sync + 'static {
    /// Scores a chronological window of frames.
    fn predict_sequence(&self, frames: Vec<FlattenedVector>) -> InferenceFuture<'_>;

    /// Scores a single frame.
    fn predict_frame(&self, frame: FlattenedVector) -> InferenceFuture<'_>;
}

/// Transport-level failures of an inference call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("service responded with status {0}")]
    Status(u16),

    #[error("request timed out")]
    Timeout,

    #[error("could not decode response body: {0}")]
    Decode(String),
}
