//! The client's world model.
//!
//! `World` owns every player, cell and food item plus a reverse index from
//! cell id to owning player id. All cell inserts and removals go through the
//! methods here so the index and the "no empty player" rule never drift.

use super::entities::{Cell, Food, Player};
use glam::Vec2;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Rectangular world extent, `[0, width] × [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    /// Clamp a circle's center so its edge stays inside the world.
    #[inline]
    pub fn clamp_circle(&self, center: Vec2, radius: f32) -> Vec2 {
        Vec2::new(
            clamp_axis(center.x, radius, self.width),
            clamp_axis(center.y, radius, self.height),
        )
    }

    /// Clamp a point into the world.
    #[inline]
    pub fn clamp_point(&self, point: Vec2) -> Vec2 {
        self.clamp_circle(point, 0.0)
    }
}

/// Clamp to `[margin, extent - margin]`, collapsing to the middle when the
/// margin does not fit.
#[inline]
fn clamp_axis(value: f32, margin: f32, extent: f32) -> f32 {
    let margin = margin.max(0.0);
    let (min, max) = (margin, extent - margin);
    if min > max {
        extent / 2.0
    } else {
        value.clamp(min, max)
    }
}

/// The game world as reconstructed from the server's event stream.
#[derive(Debug, Clone, PartialEq)]
pub struct World {
    pub(crate) players: HashMap<String, Player>,
    pub(crate) food: HashMap<String, Food>,
    /// cell id -> owning player id
    owners: HashMap<String, String>,
    bounds: WorldBounds,
    local_player_id: Option<String>,
    snapshot_timestamp: Option<i64>,
}

impl World {
    pub fn new(bounds: WorldBounds) -> Self {
        Self {
            players: HashMap::new(),
            food: HashMap::new(),
            owners: HashMap::new(),
            bounds,
            local_player_id: None,
            snapshot_timestamp: None,
        }
    }

    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.players.values()
    }

    pub fn player(&self, id: &str) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn food(&self) -> impl Iterator<Item = &Food> {
        self.food.values()
    }

    pub fn food_item(&self, id: &str) -> Option<&Food> {
        self.food.get(id)
    }

    /// Id of the player that owns `cell_id`.
    pub fn owner_of(&self, cell_id: &str) -> Option<&str> {
        self.owners.get(cell_id).map(String::as_str)
    }

    pub fn cell(&self, cell_id: &str) -> Option<&Cell> {
        let owner = self.owners.get(cell_id)?;
        self.players.get(owner)?.cells.get(cell_id)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn cell_count(&self) -> usize {
        self.owners.len()
    }

    pub fn food_count(&self) -> usize {
        self.food.len()
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn local_player_id(&self) -> Option<&str> {
        self.local_player_id.as_deref()
    }

    /// The player controlled by this client, while it is alive.
    pub fn local_player(&self) -> Option<&Player> {
        self.players.get(self.local_player_id.as_deref()?)
    }

    /// Server time of the last applied snapshot.
    pub fn snapshot_timestamp(&self) -> Option<i64> {
        self.snapshot_timestamp
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty() && self.food.is_empty()
    }

    pub(crate) fn set_bounds(&mut self, bounds: WorldBounds) {
        self.bounds = bounds;
    }

    pub(crate) fn set_local_player_id(&mut self, id: Option<String>) {
        self.local_player_id = id;
    }

    pub(crate) fn set_snapshot_timestamp(&mut self, timestamp: i64) {
        self.snapshot_timestamp = Some(timestamp);
    }

    pub(crate) fn player_mut(&mut self, id: &str) -> Option<&mut Player> {
        self.players.get_mut(id)
    }

    pub(crate) fn cell_mut(&mut self, cell_id: &str) -> Option<&mut Cell> {
        let owner = self.owners.get(cell_id)?;
        self.players.get_mut(owner)?.cells.get_mut(cell_id)
    }

    /// Install a player together with its cells.
    ///
    /// Returns false (and installs nothing) if the player owns no cells or the
    /// id is taken. Cells already owned by someone else change hands.
    pub(crate) fn add_player(&mut self, mut player: Player) -> bool {
        if player.cells.is_empty() || self.players.contains_key(&player.id) {
            return false;
        }
        let cells: Vec<Cell> = player.cells.drain().map(|(_, cell)| cell).collect();
        let player_id = player.id.clone();
        self.players.insert(player_id.clone(), player);
        for cell in cells {
            self.attach_cell(&player_id, cell);
        }
        true
    }

    /// Give `cell` to `player_id`, replacing any cell with the same id.
    ///
    /// Returns false if the player does not exist.
    pub(crate) fn attach_cell(&mut self, player_id: &str, cell: Cell) -> bool {
        if !self.players.contains_key(player_id) {
            return false;
        }
        if let Some(previous) = self.owners.get(&cell.id).cloned() {
            if previous != player_id {
                warn!("Cell {} moved from player {} to {}", cell.id, previous, player_id);
                self.take_cell(&cell.id);
                self.prune_if_empty(&previous);
            }
        }
        self.owners.insert(cell.id.clone(), player_id.to_string());
        if let Some(player) = self.players.get_mut(player_id) {
            player.cells.insert(cell.id.clone(), cell);
        }
        true
    }

    /// Remove a cell without enforcing the empty-player rule.
    ///
    /// Callers doing a multi-step change (merge, split) must finish with
    /// [`World::prune_if_empty`].
    pub(crate) fn take_cell(&mut self, cell_id: &str) -> Option<(String, Cell)> {
        let owner = self.owners.remove(cell_id)?;
        let cell = self.players.get_mut(&owner)?.cells.remove(cell_id)?;
        Some((owner, cell))
    }

    /// Remove a cell; its owner goes too if that was the last one.
    pub(crate) fn detach_cell(&mut self, cell_id: &str) -> Option<(String, Cell)> {
        let (owner, cell) = self.take_cell(cell_id)?;
        self.prune_if_empty(&owner);
        Some((owner, cell))
    }

    /// Remove `player_id` if it owns no cells. Returns true if it was removed.
    pub(crate) fn prune_if_empty(&mut self, player_id: &str) -> bool {
        let empty = self
            .players
            .get(player_id)
            .is_some_and(|p| p.cells.is_empty());
        if empty {
            self.players.remove(player_id);
            debug!("Player {} has no cells left, removed", player_id);
        }
        empty
    }

    pub(crate) fn remove_player(&mut self, player_id: &str) -> Option<Player> {
        let player = self.players.remove(player_id)?;
        for cell_id in player.cells.keys() {
            self.owners.remove(cell_id);
        }
        Some(player)
    }

    pub(crate) fn insert_food(&mut self, food: Food) {
        self.food.insert(food.id.clone(), food);
    }

    pub(crate) fn remove_food(&mut self, food_id: &str) -> Option<Food> {
        self.food.remove(food_id)
    }

    /// Drop every entity. Bounds and the local player id survive.
    pub(crate) fn clear(&mut self) {
        self.players.clear();
        self.food.clear();
        self.owners.clear();
        self.snapshot_timestamp = None;
    }

    /// Check the ownership invariants, reporting the first violation.
    pub fn check_invariants(&self) -> Result<(), String> {
        let mut seen = 0usize;
        for (player_id, player) in &self.players {
            if player.id != *player_id {
                return Err(format!("player keyed {} has id {}", player_id, player.id));
            }
            if player.cells.is_empty() {
                return Err(format!("player {} has no cells", player_id));
            }
            for (cell_id, cell) in &player.cells {
                if cell.id != *cell_id {
                    return Err(format!("cell keyed {} has id {}", cell_id, cell.id));
                }
                if cell.radius < 0.0 {
                    return Err(format!("cell {} has negative radius", cell_id));
                }
                match self.owners.get(cell_id) {
                    Some(owner) if owner == player_id => {}
                    other => {
                        return Err(format!(
                            "cell {} under player {} indexed to {:?}",
                            cell_id, player_id, other
                        ));
                    }
                }
                seen += 1;
            }
        }
        if seen != self.owners.len() {
            return Err(format!(
                "index holds {} cells but players own {}",
                self.owners.len(),
                seen
            ));
        }
        Ok(())
    }
}
