//! sync-replay - Feed a recorded event stream through the sync client.
//!
//! Usage: `sync-replay <recording.jsonl> [--fps N] [--config path]`
//!
//! Each line of the recording is one server text frame. Between frames the
//! client is advanced at the requested frame rate for as long as the frames'
//! timestamps say elapsed.

use anyhow::{bail, Context};
use client::{Config, SyncState};
use protocol::ServerMessage;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_FPS: f32 = 60.0;
const DEFAULT_CONFIG: &str = "sync.toml";
/// Gaps longer than this (paused recordings, reconnects) are not simulated.
const MAX_GAP_SECS: f32 = 5.0;

struct Args {
    recording: PathBuf,
    fps: f32,
    config: PathBuf,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> anyhow::Result<Args> {
    let mut recording = None;
    let mut fps = DEFAULT_FPS;
    let mut config = PathBuf::from(DEFAULT_CONFIG);

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--fps" => {
                let value = args.next().context("--fps needs a value")?;
                fps = value.parse().with_context(|| format!("invalid --fps {value}"))?;
                if !(fps.is_finite() && fps > 0.0) {
                    bail!("--fps must be positive");
                }
            }
            "--config" => {
                config = args.next().context("--config needs a path")?.into();
            }
            _ if recording.is_none() => recording = Some(PathBuf::from(&arg)),
            other => bail!("unexpected argument {other}"),
        }
    }

    Ok(Args {
        recording: recording
            .context("usage: sync-replay <recording.jsonl> [--fps N] [--config path]")?,
        fps,
        config,
    })
}

#[derive(Debug, Default, PartialEq)]
struct ReplaySummary {
    lines: usize,
    frames: usize,
    simulated_secs: f32,
}

/// Advance `state` through `secs` of simulated time in `1/fps` steps.
fn simulate(state: &mut SyncState, secs: f32, fps: f32, summary: &mut ReplaySummary) {
    let frames = (secs * fps).ceil().max(1.0) as usize;
    let step = secs / frames as f32;
    for _ in 0..frames {
        state.advance(step);
    }
    summary.frames += frames;
    summary.simulated_secs += secs;
}

fn replay(reader: impl BufRead, state: &mut SyncState, fps: f32) -> anyhow::Result<ReplaySummary> {
    let mut summary = ReplaySummary::default();
    let mut last_timestamp: Option<i64> = None;

    for (index, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading line {}", index + 1))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        summary.lines += 1;

        let timestamp = ServerMessage::parse(line).ok().and_then(|m| m.timestamp());
        if let (Some(previous), Some(current)) = (last_timestamp, timestamp) {
            let gap = (current - previous) as f32 / 1000.0;
            if gap > MAX_GAP_SECS {
                debug!("Line {}: {:.1}s gap, simulating {}s", index + 1, gap, MAX_GAP_SECS);
            }
            if gap > 0.0 {
                simulate(state, gap.min(MAX_GAP_SECS), fps, &mut summary);
            }
        }
        if timestamp.is_some() {
            last_timestamp = timestamp.max(last_timestamp);
        }

        state.handle_message(line);
    }

    // Let the last corrections settle.
    simulate(state, 1.0, fps, &mut summary);
    Ok(summary)
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Sync Replay v{}", env!("CARGO_PKG_VERSION"));

    let args = parse_args(std::env::args().skip(1))?;
    let config = Config::load(&args.config)?;
    let file = File::open(&args.recording)
        .with_context(|| format!("opening {}", args.recording.display()))?;

    let mut state = SyncState::new(config);
    let summary = replay(BufReader::new(file), &mut state, args.fps)?;
    let stats = state.stats();

    info!("Replayed {} lines from {}", summary.lines, args.recording.display());
    info!("  Frames: {} ({:.1}s simulated at {} fps)", summary.frames, summary.simulated_secs, args.fps);
    info!(
        "  Events: {} applied, {} ignored, {} dropped",
        stats.events_applied, stats.events_ignored, stats.events_dropped
    );
    info!("  World: {} players, {} cells, {} food", stats.players, stats.cells, stats.food);
    info!("  Max reconciliation error: {:.2}", stats.max_error);
    if let Some(player) = state.local_player() {
        info!("  Local player {} has {} cells", player.name, player.cell_count());
    }
    if stats.events_dropped > 0 {
        warn!("{} events were dropped, see the log above", stats.events_dropped);
    }

    Ok(())
}
