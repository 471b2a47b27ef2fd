use super::{InferenceClient, InferenceFuture};
use crate::core_modules::landmark::FlattenedVector;
use serde_json::json;
use std::time::Duration;

/// A deterministic in-process collaborator.
///
/// Labels a window by its frame count (`"frames:17"`) after a fixed latency. Used
/// for offline replays where no inference service is running.
#[derive(Debug, Clone, Default)]
pub struct EchoInferenceClient {
    latency: Duration,
}

impl EchoInferenceClient {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    async fn respond(&self, frames: usize) -> serde_json::Value {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        json!({
            "prediction": format!("frames:{}", frames),
            "confidence": 1.0,
            "accuracy": 1.0,
            "probabilities": {},
            "inferenceTimeMs": self.latency.as_millis() as u64,
        })
    }
}

impl InferenceClient for EchoInferenceClient {
    fn predict_sequence(&self, frames: Vec<FlattenedVector>) -> InferenceFuture<'_> {
        Box::pin(async move { Ok(self.respond(frames.len()).await) })
    }

    fn predict_frame(&self, _frame: FlattenedVector) -> InferenceFuture<'_> {
        Box::pin(async move { Ok(self.respond(1).await) })
    }
}
