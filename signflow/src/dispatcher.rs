// THEORY:
// The `InferenceDispatcher` moves flushed work off the capture loop. It owns one
// worker task, spawned on the controller's runtime when a session starts and shut
// down when it ends. The capture side never awaits anything: `dispatch` serializes
// the batch into one flat buffer, hands ownership of that buffer to the worker over
// a bounded channel, and returns a ticket immediately.
//
// Key architectural principles:
// 1.  **Isolated Worker**: The worker re-chunks the flat buffer into frames, calls
//     the inference collaborator and validates the payload. Requests run
//     concurrently (up to `max_in_flight`), so results can come back in a different
//     order than their batches were sent.
// 2.  **Failures Become Results**: A malformed payload, a transport error, a timeout,
//     or a full queue all turn into the canonical zero `PredictionResult`, which is
//     delivered like any other result. Nothing is thrown back to the caller.
// 3.  **Bounded Everything**: The queue between capture and worker is bounded; when
//     it is full the batch is not queued, it is answered with the zero result. That
//     answer is delivered from a runtime task, never from inside `dispatch`.
// 4.  **Explicit Teardown**: Shutdown is a message, like any other. Requests already
//     running are detached and allowed to finish; the router discards what they
//     produce once the session is closed.

use crate::config::DispatchConfig;
use crate::core_modules::landmark::{FlattenedVector, FLATTENED_LEN};
use crate::inference::{InferenceClient, InferenceError};
use crate::prediction::PredictionResult;
use crate::router::ResultRouter;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

/// Identifies one dispatch: which session sent it and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DispatchTicket {
    pub session: u64,
    pub seq: u64,
}

/// Work that crosses into the worker.
enum InferenceRequest {
    /// Flat concatenation of the window's frames.
    Sequence(Vec<f32>),
    Frame(FlattenedVector),
}

enum WorkerMessage {
    Infer(DispatchTicket, InferenceRequest),
    Shutdown,
}

pub struct InferenceDispatcher {
    sender: mpsc::Sender<WorkerMessage>,
    worker: JoinHandle<()>,
    runtime: Handle,
    router: ResultRouter,
    session: u64,
    next_seq: u64,
}

impl InferenceDispatcher {
    /// Spawns the worker for one session.
    pub fn spawn(
        runtime: &Handle,
        client: Arc<dyn InferenceClient>,
        router: ResultRouter,
        session: u64,
        config: &DispatchConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let worker = runtime.spawn(run_worker(
            receiver,
            client,
            router.clone(),
            config.max_in_flight.max(1),
            config.request_timeout(),
        ));
        debug!(session, "inference worker started");
        Self {
            sender,
            worker,
            runtime: runtime.clone(),
            router,
            session,
            next_seq: 0,
        }
    }

    /// Sends a window of frames for inference. Never blocks.
    pub fn dispatch(&mut self, frames: Vec<FlattenedVector>) -> DispatchTicket {
        let data: Vec<f32> = frames.iter().flatten().copied().collect();
        debug!(session = self.session, frames = frames.len(), "dispatching batch");
        self.submit(InferenceRequest::Sequence(data))
    }

    /// Sends a single frame for inference. Never blocks.
    pub fn dispatch_frame(&mut self, frame: FlattenedVector) -> DispatchTicket {
        self.submit(InferenceRequest::Frame(frame))
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    fn submit(&mut self, request: InferenceRequest) -> DispatchTicket {
        let ticket = DispatchTicket {
            session: self.session,
            seq: self.next_seq,
        };
        self.next_seq += 1;

        let reason = match self.sender.try_send(WorkerMessage::Infer(ticket, request)) {
            Ok(()) => return ticket,
            Err(TrySendError::Full(_)) => "dispatch queue full",
            Err(TrySendError::Closed(_)) => "inference worker gone",
        };
        warn!(
            session = ticket.session,
            seq = ticket.seq,
            reason,
            "answering with no-signal result"
        );
        let router = self.router.clone();
        self.runtime.spawn(async move {
            router.deliver(ticket, PredictionResult::zero());
        });
        ticket
    }

    /// Stops the worker without waiting for in-flight requests.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for InferenceDispatcher {
    fn drop(&mut self) {
        // The queue may be full; then the worker is stopped outright.
        if self.sender.try_send(WorkerMessage::Shutdown).is_err() {
            self.worker.abort();
        }
        debug!(session = self.session, "inference worker stopping");
    }
}

async fn run_worker(
    mut receiver: mpsc::Receiver<WorkerMessage>,
    client: Arc<dyn InferenceClient>,
    router: ResultRouter,
    max_in_flight: usize,
    timeout: Duration,
) {
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            message = receiver.recv(), if in_flight.len() < max_in_flight => match message {
                Some(WorkerMessage::Infer(ticket, request)) => {
                    let client = client.clone();
                    let router = router.clone();
                    in_flight.spawn(async move {
                        let result = resolve(client.as_ref(), request, timeout).await;
                        router.deliver(ticket, result);
                    });
                }
                Some(WorkerMessage::Shutdown) | None => break,
            },
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                if let Err(e) = joined {
                    warn!(error = %e, "inference request task failed");
                }
            }
        }
    }

    in_flight.detach_all();
}

/// Runs one request and validates the payload. Every failure becomes the zero result.
async fn resolve(
    client: &dyn InferenceClient,
    request: InferenceRequest,
    timeout: Duration,
) -> PredictionResult {
    let call = match request {
        InferenceRequest::Sequence(data) => {
            let Some(frames) = unflatten(&data) else {
                warn!(len = data.len(), "serialized batch is not a whole number of frames");
                return PredictionResult::zero();
            };
            client.predict_sequence(frames)
        }
        InferenceRequest::Frame(frame) => client.predict_frame(frame),
    };

    let payload = match tokio::time::timeout(timeout, call).await {
        Ok(payload) => payload,
        Err(_) => Err(InferenceError::Timeout),
    };

    match payload {
        Ok(value) => PredictionResult::from_payload(&value).unwrap_or_else(|e| {
            warn!(error = %e, "invalid response shape from inference service");
            PredictionResult::zero()
        }),
        Err(e) => {
            warn!(error = %e, "inference call failed");
            PredictionResult::zero()
        }
    }
}

fn unflatten(data: &[f32]) -> Option<Vec<FlattenedVector>> {
    if data.len() % FLATTENED_LEN != 0 {
        return None;
    }
    let frames = data
        .chunks_exact(FLATTENED_LEN)
        .map(|chunk| {
            let mut frame = [0.0; FLATTENED_LEN];
            frame.copy_from_slice(chunk);
            frame
        })
        .collect();
    Some(frames)
}
