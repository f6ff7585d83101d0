//! Full resynchronization from a `world_snapshot`.
//!
//! The replacement world is built off to the side and swapped in with a single
//! assignment, so no caller can ever see a mix of the old and new world.

use super::entities::{Cell, Food, Player};
use super::world::World;
use protocol::WorldSnapshot;
use tracing::{info, warn};

#[inline]
fn finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Build a world from `snapshot`, keeping `current`'s bounds and local player.
pub fn rebuild(current: &World, snapshot: &WorldSnapshot) -> World {
    let mut world = World::new(current.bounds());
    world.set_local_player_id(current.local_player_id().map(str::to_string));
    world.set_snapshot_timestamp(snapshot.timestamp);

    for state in &snapshot.players {
        let mut player = Player::new(&state.id, &state.name, state.color, state.is_bot);
        player.score = state.score;
        for cell in &state.cells {
            if !finite(&[cell.x, cell.y, cell.radius]) {
                warn!("Snapshot cell {} has non-finite geometry, skipped", cell.id);
                continue;
            }
            if world.owner_of(&cell.id).is_some() || player.cells.contains_key(&cell.id) {
                warn!("Snapshot lists cell {} twice, keeping the first owner", cell.id);
                continue;
            }
            player.cells.insert(
                cell.id.clone(),
                Cell::new(&cell.id, glam::Vec2::new(cell.x, cell.y), cell.radius),
            );
        }
        if !world.add_player(player) {
            warn!("Snapshot player {} skipped (no cells or duplicate id)", state.id);
        }
    }

    for food in &snapshot.food {
        if !finite(&[food.x, food.y, food.radius]) {
            warn!("Snapshot food {} has non-finite geometry, skipped", food.id);
            continue;
        }
        world.insert_food(Food::new(
            &food.id,
            glam::Vec2::new(food.x, food.y),
            food.radius,
            food.color,
        ));
    }

    world
}

/// Replace `world` wholesale with the contents of `snapshot`.
pub fn apply(world: &mut World, snapshot: &WorldSnapshot) {
    let rebuilt = rebuild(world, snapshot);
    info!(
        "Applied world snapshot @{}: {} players, {} cells, {} food",
        snapshot.timestamp,
        rebuilt.player_count(),
        rebuilt.cell_count(),
        rebuilt.food_count()
    );
    *world = rebuilt;
}
