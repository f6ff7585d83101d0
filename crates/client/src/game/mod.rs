//! Client-side world synchronization.
//!
//! [`SyncState`] is the single owner of the reconstructed world. Hosts feed it
//! raw server frames with [`SyncState::handle_message`], call
//! [`SyncState::advance`] once per rendered frame and read the result back
//! through the query methods.

pub mod entities;
pub mod events;
pub mod prediction;
pub mod snapshot;
pub mod world;

use crate::config::Config;
use entities::{Food, Player};
use events::Outcome;
use protocol::{GameEvent, InitData, ServerMessage};
use serde::Serialize;
use tracing::{debug, info, warn};
use world::{World, WorldBounds};

/// Point-in-time summary of the synchronized world.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SyncStats {
    pub players: usize,
    pub cells: usize,
    pub food: usize,
    /// Largest distance between a predicted cell and its server position.
    pub max_error: f32,
    pub events_applied: u64,
    pub events_ignored: u64,
    pub events_dropped: u64,
}

/// Event-sourced replica of the server's world.
#[derive(Debug, Clone)]
pub struct SyncState {
    config: Config,
    world: World,
    applied: u64,
    ignored: u64,
    dropped: u64,
}

impl SyncState {
    pub fn new(config: Config) -> Self {
        let bounds = WorldBounds::new(config.world.width, config.world.height);
        Self {
            config,
            world: World::new(bounds),
            applied: 0,
            ignored: 0,
            dropped: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Start a new session: install the local player id and world bounds.
    ///
    /// Entities from a previous session are discarded.
    pub fn init(&mut self, init: InitData) {
        let InitData { player_id, world_size } = init;
        info!(
            "Session init: player {} in {}x{} world",
            player_id, world_size.width, world_size.height
        );
        self.world.clear();
        self.world
            .set_bounds(WorldBounds::new(world_size.width, world_size.height));
        self.world.set_local_player_id(Some(player_id));
    }

    /// Decode and apply one server text frame.
    ///
    /// Malformed frames and events are logged and dropped; a bad event inside
    /// a batch does not stop the ones after it.
    pub fn handle_message(&mut self, text: &str) {
        let message = match ServerMessage::parse(text) {
            Ok(message) => message,
            Err(e) => {
                warn!("Dropping unparseable server message: {}", e);
                self.dropped += 1;
                return;
            }
        };

        if let ServerMessage::Init(init) = message {
            self.init(init);
            return;
        }

        for decoded in message.into_events() {
            match decoded {
                Ok(event) => self.apply(event),
                Err(e) => {
                    warn!("Dropping malformed event: {}", e);
                    self.dropped += 1;
                }
            }
        }
    }

    /// Apply a decoded event.
    pub fn apply(&mut self, event: GameEvent) {
        match events::apply(&mut self.world, &self.config.events, event) {
            Outcome::Applied => self.applied += 1,
            Outcome::Ignored => self.ignored += 1,
            Outcome::Dropped => self.dropped += 1,
        }
    }

    /// Apply events in order.
    pub fn apply_batch(&mut self, events: impl IntoIterator<Item = GameEvent>) {
        for event in events {
            self.apply(event);
        }
    }

    /// Run prediction and reconciliation for `dt_secs` of wall time.
    ///
    /// A single call simulates at most `world.max_frame_dt` seconds (0.1 by
    /// default). After a stall, the excess time is not replayed: cells resume
    /// from where they were and reconciliation absorbs the gap.
    pub fn advance(&mut self, dt_secs: f32) {
        prediction::advance(&mut self.world, &self.config, dt_secs);
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.world.players()
    }

    pub fn food(&self) -> impl Iterator<Item = &Food> {
        self.world.food()
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.world.player(id)
    }

    pub fn food_item(&self, id: &str) -> Option<&Food> {
        self.world.food_item(id)
    }

    pub fn local_player(&self) -> Option<&Player> {
        self.world.local_player()
    }

    pub fn snapshot_timestamp(&self) -> Option<i64> {
        self.world.snapshot_timestamp()
    }

    /// Forget every entity, e.g. after a disconnect.
    pub fn clear(&mut self) {
        debug!(
            "Clearing world ({} players, {} food)",
            self.world.player_count(),
            self.world.food_count()
        );
        self.world.clear();
    }

    pub fn stats(&self) -> SyncStats {
        let max_error = self
            .world
            .players()
            .flat_map(|player| player.cells())
            .map(|cell| cell.authority_error())
            .fold(0.0_f32, f32::max);

        SyncStats {
            players: self.world.player_count(),
            cells: self.world.cell_count(),
            food: self.world.food_count(),
            max_error,
            events_applied: self.applied,
            events_ignored: self.ignored,
            events_dropped: self.dropped,
        }
    }
}

impl Default for SyncState {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
