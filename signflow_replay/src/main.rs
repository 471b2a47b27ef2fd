use anyhow::{Context, bail};
use clap::Parser;
use serde::Deserialize;
use signflow::{
    Detection, EchoInferenceClient, FrameAction, HttpInferenceClient, InferenceClient,
    LandmarkFrame, ManualSource, PipelineConfig, PipelineController, PredictionResult,
};
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Replays a recorded landmark stream through the segmentation pipeline.
#[derive(Parser, Debug)]
#[command(name = "signflow_replay", version, about)]
struct Args {
    /// JSON-lines recording: {"t_ms": u64, "hands": [[[x, y, z] x21], ...]}
    #[arg(short, long)]
    input: PathBuf,

    /// Inference endpoint (overrides the config file)
    #[arg(short, long, conflicts_with = "offline")]
    endpoint: Option<String>,

    /// Use the built-in echo collaborator instead of an HTTP service
    #[arg(long)]
    offline: bool,

    /// Latency of the echo collaborator in milliseconds
    #[arg(long, default_value_t = 0, requires = "offline")]
    echo_latency_ms: u64,

    /// TOML pipeline configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Pace frames by their timestamps instead of replaying as fast as possible
    #[arg(long)]
    realtime: bool,

    /// Debug-level logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
struct RecordedFrame {
    t_ms: u64,
    #[serde(default)]
    hands: Vec<Vec<[f32; 3]>>,
}

impl RecordedFrame {
    fn detection(&self) -> signflow::Result<Detection> {
        let hands = self
            .hands
            .iter()
            .map(|coords| LandmarkFrame::from_coords(coords))
            .collect::<signflow::Result<Vec<_>>>()?;
        Ok(Detection::from_hands(hands))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // --- 1. Logging ---
    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    // --- 2. Configuration ---
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    if let Some(endpoint) = &args.endpoint {
        config.inference.endpoint = endpoint.clone();
    }
    debug!(config = %config.to_toml()?, "effective configuration");

    // --- 3. Collaborators ---
    let client: Arc<dyn InferenceClient> = if args.offline {
        info!(latency_ms = args.echo_latency_ms, "using echo collaborator");
        Arc::new(EchoInferenceClient::new(Duration::from_millis(args.echo_latency_ms)))
    } else {
        info!(endpoint = %config.inference.endpoint, "using HTTP collaborator");
        Arc::new(HttpInferenceClient::new(
            config.inference.endpoint.clone(),
            config.dispatch.request_timeout(),
        )?)
    };
    let grace = config.dispatch.request_timeout() + Duration::from_millis(250);

    let mut pipeline = PipelineController::new(config, client, Box::new(ManualSource::new()))?;
    let (tx, mut results) = mpsc::unbounded_channel::<PredictionResult>();
    pipeline.on_result(move |result| {
        let _ = tx.send(result);
    });

    // --- 4. Replay Loop ---
    let file = std::fs::File::open(&args.input)
        .with_context(|| format!("failed to open {}", args.input.display()))?;
    let start = Instant::now();
    pipeline.activate(start)?;

    let mut frames = 0u64;
    let mut dispatched = 0u64;
    let mut received = 0u64;
    let mut replay_ms = 0u64;

    for (index, line) in std::io::BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let recorded: RecordedFrame = serde_json::from_str(&line)
            .with_context(|| format!("line {}: not a recorded frame", index + 1))?;
        let detection = recorded
            .detection()
            .with_context(|| format!("line {}: invalid hand", index + 1))?;

        let at = start + Duration::from_millis(recorded.t_ms);
        if args.realtime {
            tokio::time::sleep_until(at.into()).await;
        }

        frames += 1;
        replay_ms = recorded.t_ms;
        let outcome = pipeline.on_results(&detection, at);
        if let FrameAction::Dispatched { ticket, frames: count } = outcome.action {
            dispatched += 1;
            info!(t_ms = recorded.t_ms, seq = ticket.seq, frames = count, "batch dispatched");
            tokio::task::yield_now().await;
        }

        while let Ok(result) = results.try_recv() {
            received += 1;
            println!("{}", result_line(replay_ms, &result));
        }
    }

    // --- 5. Drain ---
    let deadline = tokio::time::Instant::now() + grace;
    while received < dispatched {
        match tokio::time::timeout_at(deadline, results.recv()).await {
            Ok(Some(result)) => {
                received += 1;
                println!("{}", result_line(replay_ms, &result));
            }
            Ok(None) => break,
            Err(_) => {
                warn!(missing = dispatched - received, "gave up waiting for results");
                break;
            }
        }
    }

    let stats = pipeline.stats().unwrap_or_default();
    pipeline.deactivate();

    println!(
        "frames={} admitted={} resets={} flushes={} results={}",
        frames, stats.frames_admitted, stats.resets, dispatched, received
    );
    if frames == 0 {
        bail!("{} contained no frames", args.input.display());
    }
    Ok(())
}

/// `t=` is on the recording's timeline: the `t_ms` of the latest frame fed
/// when the result was observed. Results drained after the last frame carry
/// that frame's time.
fn result_line(replay_ms: u64, result: &PredictionResult) -> String {
    format!(
        "t={} label={} confidence={:.3}",
        replay_ms,
        if result.label.is_empty() { "-" } else { result.label.as_str() },
        result.confidence
    )
}
