//! Per-frame prediction and reconciliation.
//!
//! The server ticks at 30 Hz but only publishes cell positions at ~10 Hz, so
//! the client fills the gaps itself. Each frame, every cell is driven by at
//! most one motion source, in priority order:
//!
//! 1. its split/eject impulse, while one is active;
//! 2. otherwise steering toward its target with the server's speed law.
//!
//! Then, if the server has reported a position for the cell, the predicted
//! position and radius are nudged toward it. The nudge is proportional to the
//! error and never a direct assignment, so a late correction is absorbed over
//! a few frames instead of showing up as a teleport.

use super::entities::{Cell, Food};
use super::world::{World, WorldBounds};
use crate::config::{Config, ImpulseConfig, MotionConfig, ReconcileConfig};
use glam::Vec2;

/// Server speed law: `base_speed / mass^speed_decay`.
#[inline]
pub fn speed_for_mass(mass: f32, motion: &MotionConfig) -> f32 {
    motion.base_speed / mass.max(motion.min_mass).powf(motion.speed_decay)
}

/// Advance every cell and food item by `dt` seconds.
pub fn advance(world: &mut World, config: &Config, dt: f32) {
    if !dt.is_finite() || dt <= 0.0 {
        return;
    }
    let dt = dt.min(config.world.max_frame_dt);
    let bounds = world.bounds();

    for player in world.players.values_mut() {
        for cell in player.cells.values_mut() {
            advance_cell(cell, bounds, config, dt);
        }
    }
    for food in world.food.values_mut() {
        advance_food(food, bounds, &config.impulse, dt);
    }
}

fn advance_cell(cell: &mut Cell, bounds: WorldBounds, config: &Config, dt: f32) {
    if let Some(velocity) = cell.impulse {
        cell.position += velocity * dt;
        cell.impulse = decay_impulse(velocity, &config.impulse);
    } else if let Some(target) = cell.target {
        cell.position = steer(cell.position, target, cell.mass(), &config.motion, dt);
    }

    reconcile(cell, &config.reconcile, dt);

    cell.position = bounds.clamp_circle(cell.position, cell.radius);
}

fn advance_food(food: &mut Food, bounds: WorldBounds, impulse: &ImpulseConfig, dt: f32) {
    let Some(velocity) = food.impulse else {
        return;
    };
    food.position = bounds.clamp_point(food.position + velocity * dt);
    food.impulse = decay_impulse(velocity, impulse);
}

/// One decay step. `None` once both components are at rest.
#[inline]
fn decay_impulse(velocity: Vec2, impulse: &ImpulseConfig) -> Option<Vec2> {
    let decayed = velocity * impulse.decay;
    if decayed.x.abs() < impulse.rest_speed && decayed.y.abs() < impulse.rest_speed {
        None
    } else {
        Some(decayed)
    }
}

/// Move toward `target` at the server's speed, without overshooting it.
fn steer(position: Vec2, target: Vec2, mass: f32, motion: &MotionConfig, dt: f32) -> Vec2 {
    let offset = target - position;
    let distance = offset.length();
    if distance <= motion.min_steer_distance {
        return position;
    }
    let step = (speed_for_mass(mass, motion) * dt).min(distance);
    position + offset / distance * step
}

fn reconcile(cell: &mut Cell, reconcile: &ReconcileConfig, dt: f32) {
    let Some(authority) = cell.authority else {
        return;
    };
    cell.progress = (cell.progress + reconcile.progress_rate * dt).min(1.0);

    let error = authority.position - cell.position;
    let rate = if error.length() > reconcile.snap_distance {
        reconcile.fast_rate
    } else {
        reconcile.gentle_rate
    };
    // Fresh corrections start at half strength and ramp up with progress.
    // 1 - e^(-x) ~= x for small frames and stays below 1 for long ones.
    let strength = rate * dt * (0.5 + 0.5 * cell.progress);
    let k = 1.0 - (-strength).exp();

    cell.position += error * k;
    cell.radius = (cell.radius + (authority.radius - cell.radius) * k).max(0.0);
}
