// THEORY:
// The `pipeline` module is the top-level API of the segmentation engine. A
// `PipelineController` owns everything that lives for one activation: the frame
// sampler, the batch accumulator with its motion and stillness state, and the
// inference dispatcher. The caller feeds it one detection per video frame and
// receives a small report back; recognised signs arrive separately through the
// result callback.
//
// Key architectural principles:
// 1.  **Idle → Active → Idle**: `activate` starts the frame source and allocates the
//     per-session state; `deactivate` stops the source, discards the batch and tears
//     the dispatcher down. Both are idempotent. A result still in flight at
//     deactivation is fenced off by the router's session guard.
// 2.  **Never Block the Capture Loop**: `on_results` is synchronous and bounded. The
//     only hand-off to the asynchronous side is a non-blocking channel send.
// 3.  **Live Options**: Options that the caller toggles while a session runs
//     (prediction on/off, overlay on/off) are read from a watch cell on every
//     frame. Changing them never restarts the source or the worker.
// 4.  **Arena Ownership**: The worker belongs to this controller, not to the
//     process. Independent controllers never share a worker or a router.

use crate::config::{DispatchMode, PipelineConfig};
use crate::core_modules::accumulator::{BatchAccumulator, FlushDecision};
use crate::core_modules::landmark::{flatten, Detection};
use crate::core_modules::sampler::FrameSampler;
use crate::dispatcher::{DispatchTicket, InferenceDispatcher};
use crate::inference::InferenceClient;
use crate::prediction::PredictionResult;
use crate::router::ResultRouter;
use crate::source::{CaptureTarget, FrameSource};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Instant;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tracing::{debug, info};

/// Caller-controlled options read on every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineOptions {
    /// When false, frames with a hand are neither sampled nor accumulated.
    pub prediction_enabled: bool,
    /// Passed through to `FrameOutcome::overlay` for the renderer.
    pub show_landmarks: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            prediction_enabled: true,
            show_landmarks: false,
        }
    }
}

/// Write side of the options cell. Cheap to clone and hand to UI code.
#[derive(Clone)]
pub struct OptionsHandle {
    tx: Arc<watch::Sender<PipelineOptions>>,
}

impl OptionsHandle {
    pub fn set(&self, options: PipelineOptions) {
        self.tx.send_replace(options);
    }

    pub fn update(&self, f: impl FnOnce(&mut PipelineOptions)) {
        self.tx.send_modify(f);
    }

    pub fn current(&self) -> PipelineOptions {
        *self.tx.borrow()
    }
}

/// What the controller did with one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameAction {
    /// No session is running.
    Inactive,
    /// No hand this frame; the session's batch and motion state were reset.
    HandLost,
    /// A hand was present but the frame was not processed (sampling, or
    /// prediction disabled).
    Skipped,
    /// The frame was processed and nothing was sent.
    Held { frames: usize, smoothed: f32 },
    /// Single-frame mode: the frame was processed but the send interval has
    /// not elapsed yet.
    Waiting,
    /// Work left for the inference collaborator.
    Dispatched { ticket: DispatchTicket, frames: usize },
}

/// Per-frame report returned by `on_results`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameOutcome {
    pub action: FrameAction,
    /// True when a hand is present and the caller asked for landmarks to be drawn.
    pub overlay: bool,
}

/// Counters for the running session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub frames_seen: u64,
    pub frames_admitted: u64,
    pub dispatches: u64,
    pub resets: u64,
}

struct ActiveSession {
    id: u64,
    accumulator: BatchAccumulator,
    sampler: FrameSampler,
    dispatcher: InferenceDispatcher,
    /// Single-frame mode clock. Starts at activation.
    last_single_sent: Instant,
    stats: SessionStats,
}

pub struct PipelineController {
    config: PipelineConfig,
    runtime: Handle,
    client: Arc<dyn InferenceClient>,
    source: Box<dyn FrameSource>,
    router: ResultRouter,
    options_tx: Arc<watch::Sender<PipelineOptions>>,
    options_rx: watch::Receiver<PipelineOptions>,
    session: Option<ActiveSession>,
}

impl PipelineController {
    /// Creates an idle controller bound to the current tokio runtime.
    pub fn new(
        config: PipelineConfig,
        client: Arc<dyn InferenceClient>,
        source: Box<dyn FrameSource>,
    ) -> Result<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| Error::Runtime(format!("no tokio runtime available: {}", e)))?;
        Self::with_runtime(config, client, source, runtime)
    }

    /// Creates an idle controller whose worker runs on `runtime`.
    pub fn with_runtime(
        config: PipelineConfig,
        client: Arc<dyn InferenceClient>,
        source: Box<dyn FrameSource>,
        runtime: Handle,
    ) -> Result<Self> {
        config.validate()?;
        let (options_tx, options_rx) = watch::channel(PipelineOptions::default());
        let router = ResultRouter::new(config.dispatch.delivery);
        Ok(Self {
            config,
            runtime,
            client,
            source,
            router,
            options_tx: Arc::new(options_tx),
            options_rx,
            session: None,
        })
    }

    /// Installs or replaces the result callback. Applies to the running session too.
    pub fn on_result<F>(&self, callback: F)
    where
        F: Fn(PredictionResult) + Send + Sync + 'static,
    {
        self.router.set_callback(callback);
    }

    /// Handle for changing options while the pipeline runs.
    pub fn options(&self) -> OptionsHandle {
        OptionsHandle {
            tx: self.options_tx.clone(),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    pub fn stats(&self) -> Option<SessionStats> {
        self.session.as_ref().map(|s| s.stats)
    }

    pub fn activate(&mut self, now: Instant) -> Result<()> {
        if self.session.is_some() {
            return Ok(());
        }

        let capture = &self.config.capture;
        self.source.start(CaptureTarget {
            width: capture.width,
            height: capture.height,
        })?;

        let id = self.router.begin_session();
        let dispatcher = InferenceDispatcher::spawn(
            &self.runtime,
            self.client.clone(),
            self.router.clone(),
            id,
            &self.config.dispatch,
        );
        self.session = Some(ActiveSession {
            id,
            accumulator: BatchAccumulator::new(&self.config.segmentation, now),
            sampler: FrameSampler::new(capture.process_every_nth, capture.min_process_interval()),
            dispatcher,
            last_single_sent: now,
            stats: SessionStats::default(),
        });

        info!(session = id, mode = ?self.config.dispatch.mode, "pipeline activated");
        Ok(())
    }

    pub fn deactivate(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        self.source.stop();
        self.router.end_session();
        session.dispatcher.shutdown();

        info!(
            session = session.id,
            frames = session.stats.frames_seen,
            dispatches = session.stats.dispatches,
            "pipeline deactivated"
        );
    }

    pub fn set_active(&mut self, active: bool, now: Instant) -> Result<()> {
        if active {
            self.activate(now)
        } else {
            self.deactivate();
            Ok(())
        }
    }

    /// Feeds one detector result. Called once per video frame, serially.
    pub fn on_results(&mut self, detection: &Detection, now: Instant) -> FrameOutcome {
        let options = *self.options_rx.borrow();
        let mode = self.config.dispatch.mode;
        let single_frame_interval = self.config.dispatch.single_frame_interval();

        let Some(session) = self.session.as_mut() else {
            return FrameOutcome {
                action: FrameAction::Inactive,
                overlay: false,
            };
        };
        session.stats.frames_seen += 1;

        let Some(hand) = detection.primary() else {
            if !session.accumulator.is_empty() {
                debug!(
                    session = session.id,
                    frames = session.accumulator.len(),
                    "hand lost; discarding batch"
                );
            }
            session.accumulator.reset();
            session.stats.resets += 1;
            return FrameOutcome {
                action: FrameAction::HandLost,
                overlay: false,
            };
        };
        let overlay = options.show_landmarks;

        // The sampler counts every frame with a hand, processed or not.
        let admitted = session.sampler.admit(now);
        if !options.prediction_enabled || !admitted {
            return FrameOutcome {
                action: FrameAction::Skipped,
                overlay,
            };
        }
        session.stats.frames_admitted += 1;
        let vector = flatten(hand);

        let action = match mode {
            DispatchMode::Sequence => match session.accumulator.push(vector, now) {
                FlushDecision::Flush(frames) => {
                    let count = frames.len();
                    let ticket = session.dispatcher.dispatch(frames);
                    session.accumulator.mark_sent(now);
                    session.stats.dispatches += 1;
                    FrameAction::Dispatched { ticket, frames: count }
                }
                FlushDecision::Hold => FrameAction::Held {
                    frames: session.accumulator.len(),
                    smoothed: session.accumulator.motion_state().smoothed,
                },
            },
            DispatchMode::SingleFrame => {
                if now.saturating_duration_since(session.last_single_sent) > single_frame_interval {
                    let ticket = session.dispatcher.dispatch_frame(vector);
                    session.last_single_sent = now;
                    session.stats.dispatches += 1;
                    FrameAction::Dispatched { ticket, frames: 1 }
                } else {
                    FrameAction::Waiting
                }
            }
        };

        FrameOutcome { action, overlay }
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.deactivate();
    }
}
