//! Players, cells and food as the client sees them.

use glam::Vec2;
use protocol::Color;
use serde::Serialize;
use std::collections::HashMap;

const MASS_DIVISOR: f32 = 100.0; // mass = radius² / 100

/// mass = radius² / 100
#[inline]
pub fn radius_to_mass(radius: f32) -> f32 {
    let radius = radius.max(0.0);
    radius * radius / MASS_DIVISOR
}

/// Last position and radius the server reported for a cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Authority {
    pub position: Vec2,
    pub radius: f32,
}

/// A player-owned cell.
///
/// `position`/`radius` are what the renderer draws. They are never overwritten
/// by server data directly: deltas land in `authority` and the prediction engine
/// blends toward them, with `progress` counting up from 0 after each delta.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cell {
    pub id: String,
    /// Predicted position.
    pub position: Vec2,
    pub radius: f32,
    /// Decaying split/eject velocity. Suspends steering while set.
    pub impulse: Option<Vec2>,
    /// Where the server last said this cell is heading.
    pub target: Option<Vec2>,
    pub authority: Option<Authority>,
    /// Reconciliation progress in [0, 1].
    pub progress: f32,
}

impl Cell {
    pub fn new(id: impl Into<String>, position: Vec2, radius: f32) -> Self {
        Self {
            id: id.into(),
            position,
            radius: radius.max(0.0),
            impulse: None,
            target: None,
            authority: None,
            progress: 0.0,
        }
    }

    /// Launch the cell with an impulse. A zero velocity leaves it at rest.
    pub fn with_impulse(mut self, velocity: Vec2) -> Self {
        self.impulse = (velocity != Vec2::ZERO).then_some(velocity);
        self
    }

    pub fn with_target(mut self, target: Option<Vec2>) -> Self {
        self.target = target;
        self
    }

    #[inline]
    pub fn mass(&self) -> f32 {
        radius_to_mass(self.radius)
    }

    /// Record a fresh authoritative position/radius and restart reconciliation.
    pub fn set_authority(&mut self, position: Vec2, radius: f32) {
        self.authority = Some(Authority {
            position,
            radius: radius.max(0.0),
        });
        self.progress = 0.0;
    }

    /// Distance between the predicted and the authoritative position.
    pub fn authority_error(&self) -> f32 {
        self.authority
            .map(|a| a.position.distance(self.position))
            .unwrap_or(0.0)
    }
}

/// A player and the cells it owns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub color: Color,
    pub is_bot: bool,
    pub score: i64,
    /// Player-wide steering target, inherited by cells created later.
    pub target: Option<Vec2>,
    pub(crate) cells: HashMap<String, Cell>,
}

impl Player {
    /// An empty player shell. Only `World` turns it into a live player, and
    /// only once it owns at least one cell.
    pub(crate) fn new(id: impl Into<String>, name: impl Into<String>, color: Color, is_bot: bool) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color,
            is_bot,
            score: 0,
            target: None,
            cells: HashMap::new(),
        }
    }

    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.cells.values()
    }

    pub fn cell(&self, id: &str) -> Option<&Cell> {
        self.cells.get(id)
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn total_mass(&self) -> f32 {
        self.cells.values().map(Cell::mass).sum()
    }

    /// Mass-weighted centroid of the player's cells, for camera tracking.
    pub fn center(&self) -> Option<Vec2> {
        let total = self.total_mass();
        if self.cells.is_empty() {
            return None;
        }
        if total <= f32::EPSILON {
            let sum: Vec2 = self.cells.values().map(|c| c.position).sum();
            return Some(sum / self.cells.len() as f32);
        }
        let weighted: Vec2 = self.cells.values().map(|c| c.position * c.mass()).sum();
        Some(weighted / total)
    }
}

/// A food pellet or ejected mass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Food {
    pub id: String,
    pub position: Vec2,
    pub radius: f32,
    pub color: Color,
    pub impulse: Option<Vec2>,
}

impl Food {
    pub fn new(id: impl Into<String>, position: Vec2, radius: f32, color: Color) -> Self {
        Self {
            id: id.into(),
            position,
            radius: radius.max(0.0),
            color,
            impulse: None,
        }
    }

    pub fn with_impulse(mut self, velocity: Vec2) -> Self {
        self.impulse = (velocity != Vec2::ZERO).then_some(velocity);
        self
    }
}
