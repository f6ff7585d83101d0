//! sync-probe - Join a live arena server and mirror its world.
//!
//! Usage: `sync-probe <ws-url> [name]`
//!
//! The probe joins as a player, steers in a slow circle around the world
//! center and keeps a `SyncState` in step with the server, logging a summary
//! every few seconds.

use anyhow::Context;
use client::{Config, SyncState};
use futures_util::{SinkExt, StreamExt};
use glam::Vec2;
use protocol::ClientMessage;
use std::time::{Duration, Instant};
use tokio::time::{interval, MissedTickBehavior};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const FRAME_INTERVAL: Duration = Duration::from_millis(16);
const MOVE_INTERVAL: Duration = Duration::from_millis(100);
const STATS_INTERVAL: Duration = Duration::from_secs(5);
const ORBIT_RADIUS_FRACTION: f32 = 0.25;
const ORBIT_PERIOD_SECS: f32 = 20.0;

/// Point on a circle around the world center, `elapsed` seconds into the orbit.
fn orbit_target(state: &SyncState, elapsed: f32) -> Vec2 {
    let bounds = state.world().bounds();
    let center = Vec2::new(bounds.width, bounds.height) / 2.0;
    let radius = bounds.width.min(bounds.height) * ORBIT_RADIUS_FRACTION;
    let angle = elapsed / ORBIT_PERIOD_SECS * std::f32::consts::TAU;
    center + Vec2::from_angle(angle) * radius
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Sync Probe v{}", env!("CARGO_PKG_VERSION"));

    let mut args = std::env::args().skip(1);
    let url = args.next().context("usage: sync-probe <ws-url> [name]")?;
    let name = args.next().unwrap_or_else(|| "probe".to_string());
    let config = Config::load(std::env::var("SYNC_CONFIG").unwrap_or_else(|_| "sync.toml".to_string()))?;

    let (ws_stream, _) = connect_async(url.as_str())
        .await
        .with_context(|| format!("connecting to {url}"))?;
    info!("Connected to {}", url);

    let (mut write, mut read) = ws_stream.split();
    write
        .send(Message::Text(ClientMessage::Join { name: name.clone() }.to_json().into()))
        .await?;
    info!("Joined as {}", name);

    let mut state = SyncState::new(config);
    let started = Instant::now();
    let mut last_frame = Instant::now();

    let mut frame_ticker = interval(FRAME_INTERVAL);
    frame_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut move_ticker = interval(MOVE_INTERVAL);
    move_ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut stats_ticker = interval(STATS_INTERVAL);

    loop {
        tokio::select! {
            // Handle incoming WebSocket messages
            msg = read.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        state.handle_message(text.as_str());
                    }
                    Some(Ok(Message::Close(frame))) => {
                        info!("Server closed the connection: {:?}", frame);
                        break;
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        break;
                    }
                    _ => {}
                }
            }
            // Run prediction at frame rate
            _ = frame_ticker.tick() => {
                let now = Instant::now();
                state.advance(now.duration_since(last_frame).as_secs_f32());
                last_frame = now;
            }
            // Steer the local player
            _ = move_ticker.tick() => {
                if state.local_player().is_none() {
                    continue;
                }
                let target = orbit_target(&state, started.elapsed().as_secs_f32());
                let message = ClientMessage::Move { x: target.x, y: target.y };
                if let Err(e) = write.send(Message::Text(message.to_json().into())).await {
                    warn!("Failed to send move: {}", e);
                    break;
                }
            }
            _ = stats_ticker.tick() => {
                let stats = state.stats();
                info!(
                    "players={} cells={} food={} max_error={:.2} events={}/{}/{}",
                    stats.players,
                    stats.cells,
                    stats.food,
                    stats.max_error,
                    stats.events_applied,
                    stats.events_ignored,
                    stats.events_dropped,
                );
                if let Some(player) = state.local_player() {
                    info!("  {} has {} cells, mass {:.0}", player.name, player.cell_count(), player.total_mass());
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, closing connection");
                write.send(Message::Close(None)).await.ok();
                break;
            }
        }
    }

    info!("Probe finished after {:.1}s", started.elapsed().as_secs_f32());
    Ok(())
}
