//! Shared fixtures for the pipeline integration tests
#![allow(dead_code)]

use parking_lot::Mutex;
use serde_json::{Value, json};
use signflow::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Notify, mpsc};

/// A hand whose 21 points all sit at `(v, v, v)`.
pub fn hand_at(v: f32) -> Detection {
    Detection::single(LandmarkFrame::new([Landmark::new(v, v, v); LANDMARK_COUNT]))
}

/// Default tuning, but every frame with a hand is processed.
pub fn every_frame_config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.capture.process_every_nth = 1;
    config.capture.min_process_interval_ms = 0;
    config
}

pub fn frame_time(t0: Instant, index: u64) -> Instant {
    t0 + Duration::from_millis(33 * index)
}

/// An in-memory collaborator that records window lengths and answers with a fixed
/// payload. When gated, every call waits for one `release()`.
pub struct ScriptedClient {
    payload: Value,
    gate: Option<Arc<Notify>>,
    calls: Mutex<Vec<usize>>,
}

impl ScriptedClient {
    pub fn answering(payload: Value) -> Arc<Self> {
        Arc::new(Self {
            payload,
            gate: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn labelled(label: &str) -> Arc<Self> {
        Self::answering(json!({ "prediction": label, "confidence": 0.9 }))
    }

    pub fn gated(label: &str, gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            payload: json!({ "prediction": label, "confidence": 0.9 }),
            gate: Some(gate),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<usize> {
        self.calls.lock().clone()
    }

    fn answer(&self, frames: usize) -> InferenceFuture<'_> {
        self.calls.lock().push(frames);
        let payload = self.payload.clone();
        let gate = self.gate.clone();
        Box::pin(async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            Ok(payload)
        })
    }
}

impl InferenceClient for ScriptedClient {
    fn predict_sequence(&self, frames: Vec<FlattenedVector>) -> InferenceFuture<'_> {
        self.answer(frames.len())
    }

    fn predict_frame(&self, _frame: FlattenedVector) -> InferenceFuture<'_> {
        self.answer(1)
    }
}

/// A source that counts start/stop calls.
#[derive(Clone, Default)]
pub struct CountingSource {
    pub starts: Arc<AtomicUsize>,
    pub stops: Arc<AtomicUsize>,
}

impl CountingSource {
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }
}

impl FrameSource for CountingSource {
    fn start(&mut self, _target: CaptureTarget) -> signflow::Result<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

/// A controller built on the test runtime.
pub fn controller(
    config: PipelineConfig,
    client: Arc<ScriptedClient>,
    source: impl FrameSource + 'static,
) -> PipelineController {
    PipelineController::new(config, client, Box::new(source)).expect("runtime present")
}

/// Wires the controller's callback into a channel.
pub fn collect_results(
    pipeline: &PipelineController,
) -> mpsc::UnboundedReceiver<PredictionResult> {
    let (tx, rx) = mpsc::unbounded_channel();
    pipeline.on_result(move |result| {
        let _ = tx.send(result);
    });
    rx
}

pub async fn next_result(rx: &mut mpsc::UnboundedReceiver<PredictionResult>) -> PredictionResult {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("result within deadline")
        .expect("callback channel open")
}
