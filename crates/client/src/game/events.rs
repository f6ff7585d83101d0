//! Event applicator: one state transition per event kind.
//!
//! Every transition either applies completely or leaves the world untouched.
//! References to entities we no longer know about are expected under packet
//! loss and are ignored; unknown kinds are logged and dropped.

use super::entities::{Cell, Food, Player};
use super::snapshot;
use super::world::World;
use crate::config::EventsConfig;
use protocol::{
    CellEaten, CellMerged, CellUpdated, FoodEaten, FoodInfo, GameEvent, PlayerJoined, PlayerMoved,
    PlayerSplit,
};
use tracing::{debug, info, trace, warn};

/// What applying an event did to the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The world changed.
    Applied,
    /// The event referred to something we don't have; nothing changed.
    Ignored,
    /// The event could not be used at all (unknown kind, non-finite numbers).
    Dropped,
}

#[inline]
fn finite(values: &[f32]) -> bool {
    values.iter().all(|v| v.is_finite())
}

/// Apply a single event to `world`.
pub fn apply(world: &mut World, config: &EventsConfig, event: GameEvent) -> Outcome {
    trace!("Handling event: {}", event.kind());

    match event {
        GameEvent::PlayerJoined(joined) => player_joined(world, joined),
        GameEvent::PlayerMoved(moved) => player_moved(world, moved),
        GameEvent::CellUpdated(update) => cell_updated(world, update),
        GameEvent::PlayerSplit(split) => player_split(world, split),
        GameEvent::PlayerEjected(ejected) => spawn_food(world, ejected.food),
        GameEvent::PlayerDied(died) => match world.remove_player(&died.player_id) {
            Some(player) => {
                info!("Player died: {} ({})", player.name, player.id);
                Outcome::Applied
            }
            None => Outcome::Ignored,
        },
        GameEvent::FoodSpawned(spawned) => spawn_food(world, spawned.foods),
        GameEvent::FoodEaten(eaten) => food_eaten(world, config, eaten),
        GameEvent::CellEaten(eaten) => cell_eaten(world, eaten),
        GameEvent::CellMerged(merged) => cell_merged(world, merged),
        GameEvent::WorldSnapshot(snap) => {
            snapshot::apply(world, &snap);
            Outcome::Applied
        }
        GameEvent::Unknown { kind } => {
            warn!("Unknown event type: {}", kind);
            Outcome::Dropped
        }
    }
}

fn player_joined(world: &mut World, joined: PlayerJoined) -> Outcome {
    if world.player(&joined.player_id).is_some() {
        debug!("Player {} already exists, join ignored", joined.player_id);
        return Outcome::Ignored;
    }
    if !finite(&[joined.x, joined.y, joined.radius]) {
        warn!("Join for {} has non-finite geometry", joined.player_id);
        return Outcome::Dropped;
    }

    let position = joined.position();
    let PlayerJoined {
        player_id,
        name,
        color,
        is_bot,
        cell_id,
        radius,
        ..
    } = joined;

    let mut player = Player::new(player_id, name, color, is_bot);
    player
        .cells
        .insert(cell_id.clone(), Cell::new(cell_id, position, radius));

    info!("Player joined: {} ({})", player.name, player.id);
    if world.add_player(player) {
        Outcome::Applied
    } else {
        Outcome::Ignored
    }
}

fn player_moved(world: &mut World, moved: PlayerMoved) -> Outcome {
    if !finite(&[moved.target_x, moved.target_y]) {
        return Outcome::Dropped;
    }
    let target = moved.target();
    let Some(player) = world.player_mut(&moved.player_id) else {
        return Outcome::Ignored;
    };

    match moved.cell_id {
        Some(cell_id) => match player.cells.get_mut(&cell_id) {
            Some(cell) => {
                cell.target = Some(target);
                Outcome::Applied
            }
            None => Outcome::Ignored,
        },
        None => {
            player.target = Some(target);
            for cell in player.cells.values_mut() {
                cell.target = Some(target);
            }
            Outcome::Applied
        }
    }
}

fn cell_updated(world: &mut World, update: CellUpdated) -> Outcome {
    if !finite(&[update.x, update.y, update.radius]) {
        return Outcome::Dropped;
    }
    if let (Some(claimed), Some(owner)) = (update.player_id.as_deref(), world.owner_of(&update.cell_id)) {
        if claimed != owner {
            debug!(
                "Delta for cell {} names player {}, index says {}",
                update.cell_id, claimed, owner
            );
        }
    }
    match world.cell_mut(&update.cell_id) {
        Some(cell) => {
            cell.set_authority(update.position(), update.radius);
            Outcome::Applied
        }
        None => {
            trace!("Delta for unknown cell {}", update.cell_id);
            Outcome::Ignored
        }
    }
}

fn player_split(world: &mut World, split: PlayerSplit) -> Outcome {
    let Some(player) = world.player(&split.player_id) else {
        return Outcome::Ignored;
    };
    let target = player.target;

    let mut changed = false;
    for info in split.new_cells {
        if !finite(&[info.x, info.y, info.radius, info.vel_x, info.vel_y]) {
            warn!("Split cell {} has non-finite geometry, skipped", info.cell_id);
            continue;
        }
        let cell = Cell::new(info.cell_id.as_str(), info.position(), info.radius)
            .with_impulse(info.velocity())
            .with_target(target);
        changed |= world.attach_cell(&split.player_id, cell);
    }

    for cell_id in &split.remove_cell_ids {
        if world.owner_of(cell_id) == Some(split.player_id.as_str()) {
            world.take_cell(cell_id);
            changed = true;
        }
    }
    world.prune_if_empty(&split.player_id);

    if changed { Outcome::Applied } else { Outcome::Ignored }
}

fn spawn_food(world: &mut World, foods: Vec<FoodInfo>) -> Outcome {
    let mut changed = false;
    for info in foods {
        if !finite(&[info.x, info.y, info.radius, info.vel_x, info.vel_y]) {
            warn!("Food {} has non-finite geometry, skipped", info.food_id);
            continue;
        }
        let food = Food::new(info.food_id.as_str(), info.position(), info.radius, info.color)
            .with_impulse(info.velocity());
        world.insert_food(food);
        changed = true;
    }
    if changed { Outcome::Applied } else { Outcome::Ignored }
}

fn food_eaten(world: &mut World, config: &EventsConfig, eaten: FoodEaten) -> Outcome {
    if world.remove_food(&eaten.food_id).is_none() {
        return Outcome::Ignored;
    }
    // Local growth cue; the next delta carries the real radius.
    if let Some(cell) = eaten.cell_id.as_deref().and_then(|id| world.cell_mut(id)) {
        cell.radius += config.food_eaten_growth;
    }
    Outcome::Applied
}

fn cell_eaten(world: &mut World, eaten: CellEaten) -> Outcome {
    let Some((owner, _)) = world.detach_cell(&eaten.eaten_cell_id) else {
        return Outcome::Ignored;
    };
    if world.player(&owner).is_none() {
        info!(
            "Player {} eliminated (last cell eaten by {})",
            owner,
            eaten.eaten_by.as_deref().unwrap_or("?")
        );
    }
    Outcome::Applied
}

fn cell_merged(world: &mut World, merged: CellMerged) -> Outcome {
    if !finite(&[merged.x, merged.y, merged.radius]) {
        return Outcome::Dropped;
    }
    let Some(player) = world.player(&merged.player_id) else {
        return Outcome::Ignored;
    };
    let target = player.target;
    let position = merged.position();

    let mut survivor: Option<Cell> = None;
    for source in [&merged.cell1_id, &merged.cell2_id] {
        if world.owner_of(source) != Some(merged.player_id.as_str()) {
            continue;
        }
        if let Some((_, cell)) = world.take_cell(source) {
            if *source == merged.new_cell_id {
                survivor = Some(cell);
            }
        }
    }

    // A reused id keeps its predicted state and glides into the merged shape.
    let cell = match survivor {
        Some(mut cell) => {
            cell.impulse = None;
            cell.set_authority(position, merged.radius);
            cell
        }
        None => Cell::new(merged.new_cell_id.as_str(), position, merged.radius).with_target(target),
    };
    world.attach_cell(&merged.player_id, cell);
    world.prune_if_empty(&merged.player_id);
    Outcome::Applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::world::WorldBounds;
    use glam::Vec2;
    use protocol::{
        CellState, Color, FoodSpawned, PlayerDied, PlayerEjected, PlayerState, SplitCell, WorldSnapshot,
    };

    fn world() -> World {
        World::new(WorldBounds::new(1000.0, 1000.0))
    }

    fn cfg() -> EventsConfig {
        EventsConfig::default()
    }

    fn join(player: &str, cell: &str, x: f32, y: f32, radius: f32) -> GameEvent {
        GameEvent::PlayerJoined(PlayerJoined {
            player_id: player.into(),
            name: player.into(),
            color: Color::new(10, 20, 30),
            is_bot: false,
            cell_id: cell.into(),
            x,
            y,
            radius,
        })
    }

    fn split(player: &str, cells: &[(&str, f32, f32)]) -> GameEvent {
        GameEvent::PlayerSplit(PlayerSplit {
            player_id: player.into(),
            new_cells: cells
                .iter()
                .map(|(id, vx, vy)| SplitCell {
                    cell_id: id.to_string(),
                    x: 100.0,
                    y: 100.0,
                    radius: 7.0,
                    vel_x: *vx,
                    vel_y: *vy,
                })
                .collect(),
            remove_cell_ids: vec![],
        })
    }

    fn food(id: &str, vel_x: f32) -> FoodInfo {
        FoodInfo {
            food_id: id.into(),
            x: 5.0,
            y: 5.0,
            radius: 5.0,
            color: Color::default(),
            vel_x,
            vel_y: 0.0,
        }
    }

    #[test]
    fn test_player_joined() {
        let mut world = world();
        assert_eq!(apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0)), Outcome::Applied);

        let player = world.player("p1").unwrap();
        assert_eq!(player.cell_count(), 1);
        assert_eq!(player.score, 0);
        let cell = player.cell("c1").unwrap();
        assert_eq!(cell.position, Vec2::new(100.0, 100.0));
        assert_eq!(cell.radius, 10.0);
    }

    #[test]
    fn test_duplicate_join_is_noop() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        let before = world.clone();
        assert_eq!(apply(&mut world, &cfg(), join("p1", "c9", 1.0, 1.0, 1.0)), Outcome::Ignored);
        assert_eq!(world, before);
    }

    #[test]
    fn test_non_finite_join_dropped() {
        let mut world = world();
        assert_eq!(apply(&mut world, &cfg(), join("p1", "c1", f32::NAN, 1.0, 1.0)), Outcome::Dropped);
        assert!(world.is_empty());
    }

    #[test]
    fn test_player_moved_sets_targets_only() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        let event = GameEvent::PlayerMoved(PlayerMoved {
            player_id: "p1".into(),
            cell_id: None,
            target_x: 300.0,
            target_y: 400.0,
        });
        assert_eq!(apply(&mut world, &cfg(), event), Outcome::Applied);

        let player = world.player("p1").unwrap();
        assert_eq!(player.target, Some(Vec2::new(300.0, 400.0)));
        let cell = player.cell("c1").unwrap();
        assert_eq!(cell.target, Some(Vec2::new(300.0, 400.0)));
        assert_eq!(cell.position, Vec2::new(100.0, 100.0));
    }

    #[test]
    fn test_player_moved_single_cell() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        apply(&mut world, &cfg(), split("p1", &[("c2", 0.0, 0.0)]));
        let event = GameEvent::PlayerMoved(PlayerMoved {
            player_id: "p1".into(),
            cell_id: Some("c2".into()),
            target_x: 1.0,
            target_y: 2.0,
        });
        apply(&mut world, &cfg(), event);

        assert_eq!(world.cell("c2").unwrap().target, Some(Vec2::new(1.0, 2.0)));
        assert_eq!(world.cell("c1").unwrap().target, None);
        assert_eq!(world.player("p1").unwrap().target, None);
    }

    #[test]
    fn test_cell_updated_sets_authority_not_position() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        world.cell_mut("c1").unwrap().progress = 0.6;

        let event = GameEvent::CellUpdated(CellUpdated {
            cell_id: "c1".into(),
            player_id: Some("p1".into()),
            x: 120.0,
            y: 90.0,
            radius: 11.0,
        });
        assert_eq!(apply(&mut world, &cfg(), event), Outcome::Applied);

        let cell = world.cell("c1").unwrap();
        assert_eq!(cell.position, Vec2::new(100.0, 100.0));
        assert_eq!(cell.radius, 10.0);
        let authority = cell.authority.unwrap();
        assert_eq!(authority.position, Vec2::new(120.0, 90.0));
        assert_eq!(authority.radius, 11.0);
        assert_eq!(cell.progress, 0.0);
    }

    #[test]
    fn test_cell_updated_unknown_cell_ignored() {
        let mut world = world();
        let event = GameEvent::CellUpdated(CellUpdated {
            cell_id: "gone".into(),
            player_id: None,
            x: 1.0,
            y: 1.0,
            radius: 1.0,
        });
        assert_eq!(apply(&mut world, &cfg(), event), Outcome::Ignored);
    }

    #[test]
    fn test_split_adds_cells_with_impulse() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        assert_eq!(apply(&mut world, &cfg(), split("p1", &[("c2", 50.0, 0.0)])), Outcome::Applied);

        let player = world.player("p1").unwrap();
        assert_eq!(player.cell_count(), 2);
        assert_eq!(player.cell("c2").unwrap().impulse, Some(Vec2::new(50.0, 0.0)));
        assert!(player.cell("c1").is_some());
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_split_inherits_player_target() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        apply(
            &mut world,
            &cfg(),
            GameEvent::PlayerMoved(PlayerMoved {
                player_id: "p1".into(),
                cell_id: None,
                target_x: 800.0,
                target_y: 100.0,
            }),
        );
        apply(&mut world, &cfg(), split("p1", &[("c2", 50.0, 0.0)]));
        assert_eq!(world.cell("c2").unwrap().target, Some(Vec2::new(800.0, 100.0)));
    }

    #[test]
    fn test_split_remove_listed_cells() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        let event = GameEvent::PlayerSplit(PlayerSplit {
            player_id: "p1".into(),
            new_cells: vec![SplitCell {
                cell_id: "c2".into(),
                x: 100.0,
                y: 100.0,
                radius: 7.0,
                vel_x: 0.0,
                vel_y: 10.0,
            }],
            remove_cell_ids: vec!["c1".into()],
        });
        apply(&mut world, &cfg(), event);

        let player = world.player("p1").unwrap();
        assert_eq!(player.cell_count(), 1);
        assert!(player.cell("c2").is_some());
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_split_unknown_player_ignored() {
        let mut world = world();
        assert_eq!(apply(&mut world, &cfg(), split("nobody", &[("c2", 1.0, 0.0)])), Outcome::Ignored);
        assert_eq!(world.cell_count(), 0);
    }

    #[test]
    fn test_player_died_removes_cells() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        apply(&mut world, &cfg(), split("p1", &[("c2", 1.0, 0.0)]));
        let died = GameEvent::PlayerDied(PlayerDied { player_id: "p1".into() });

        assert_eq!(apply(&mut world, &cfg(), died.clone()), Outcome::Applied);
        assert!(world.player("p1").is_none());
        assert_eq!(world.cell_count(), 0);
        assert_eq!(apply(&mut world, &cfg(), died), Outcome::Ignored);
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_food_spawned_and_ejected() {
        let mut world = world();
        let spawned = GameEvent::FoodSpawned(FoodSpawned {
            foods: vec![food("f1", 0.0), food("f2", 0.0)],
        });
        assert_eq!(apply(&mut world, &cfg(), spawned), Outcome::Applied);
        assert_eq!(world.food_count(), 2);
        assert!(world.food_item("f1").unwrap().impulse.is_none());

        let ejected = GameEvent::PlayerEjected(PlayerEjected {
            player_id: "p1".into(),
            food: vec![food("f3", 900.0)],
        });
        apply(&mut world, &cfg(), ejected);
        assert_eq!(world.food_item("f3").unwrap().impulse, Some(Vec2::new(900.0, 0.0)));
    }

    #[test]
    fn test_food_eaten_nudges_eater_once() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        apply(
            &mut world,
            &cfg(),
            GameEvent::FoodSpawned(FoodSpawned { foods: vec![food("f1", 0.0)] }),
        );
        let eaten = GameEvent::FoodEaten(FoodEaten {
            food_id: "f1".into(),
            player_id: Some("p1".into()),
            cell_id: Some("c1".into()),
        });

        assert_eq!(apply(&mut world, &cfg(), eaten.clone()), Outcome::Applied);
        assert!(world.food_item("f1").is_none());
        assert_eq!(world.cell("c1").unwrap().radius, 10.5);

        // A repeated notice does not grow the cell again.
        assert_eq!(apply(&mut world, &cfg(), eaten), Outcome::Ignored);
        assert_eq!(world.cell("c1").unwrap().radius, 10.5);
    }

    #[test]
    fn test_cell_eaten_last_cell_removes_player() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        let eaten = GameEvent::CellEaten(CellEaten {
            eaten_cell_id: "c1".into(),
            eaten_by: Some("p2".into()),
            eater_cell_id: Some("x".into()),
        });
        assert_eq!(apply(&mut world, &cfg(), eaten), Outcome::Applied);
        assert!(world.player("p1").is_none());
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_cell_eaten_keeps_player_with_cells_left() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        apply(&mut world, &cfg(), split("p1", &[("c2", 1.0, 0.0)]));
        let eaten = GameEvent::CellEaten(CellEaten {
            eaten_cell_id: "c1".into(),
            eaten_by: None,
            eater_cell_id: None,
        });
        apply(&mut world, &cfg(), eaten);

        let player = world.player("p1").unwrap();
        assert_eq!(player.cell_count(), 1);
        assert!(player.cell("c2").is_some());
    }

    #[test]
    fn test_cell_merged_new_id() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "a", 100.0, 100.0, 10.0));
        apply(&mut world, &cfg(), split("p1", &[("b", 1.0, 0.0)]));
        let merged = GameEvent::CellMerged(CellMerged {
            player_id: "p1".into(),
            cell1_id: "a".into(),
            cell2_id: "b".into(),
            new_cell_id: "m".into(),
            x: 110.0,
            y: 100.0,
            radius: 12.2,
        });
        assert_eq!(apply(&mut world, &cfg(), merged), Outcome::Applied);

        let player = world.player("p1").unwrap();
        assert_eq!(player.cell_count(), 1);
        let cell = player.cell("m").unwrap();
        assert_eq!(cell.position, Vec2::new(110.0, 100.0));
        assert_eq!(cell.radius, 12.2);
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_cell_merged_reused_id_does_not_snap() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "a", 100.0, 100.0, 10.0));
        apply(&mut world, &cfg(), split("p1", &[("b", 1.0, 0.0)]));
        let merged = GameEvent::CellMerged(CellMerged {
            player_id: "p1".into(),
            cell1_id: "a".into(),
            cell2_id: "b".into(),
            new_cell_id: "a".into(),
            x: 130.0,
            y: 100.0,
            radius: 12.2,
        });
        apply(&mut world, &cfg(), merged);

        let player = world.player("p1").unwrap();
        assert_eq!(player.cell_count(), 1);
        let cell = player.cell("a").unwrap();
        assert_eq!(cell.position, Vec2::new(100.0, 100.0));
        assert_eq!(cell.radius, 10.0);
        assert_eq!(cell.authority.unwrap().position, Vec2::new(130.0, 100.0));
        assert_eq!(cell.authority.unwrap().radius, 12.2);
        world.check_invariants().unwrap();
    }

    #[test]
    fn test_cell_merged_unknown_player_ignored() {
        let mut world = world();
        let merged = GameEvent::CellMerged(CellMerged {
            player_id: "p1".into(),
            cell1_id: "a".into(),
            cell2_id: "b".into(),
            new_cell_id: "a".into(),
            x: 1.0,
            y: 1.0,
            radius: 1.0,
        });
        assert_eq!(apply(&mut world, &cfg(), merged), Outcome::Ignored);
        assert!(world.is_empty());
    }

    #[test]
    fn test_snapshot_replaces_everything() {
        let mut world = world();
        apply(&mut world, &cfg(), join("old", "o1", 1.0, 1.0, 10.0));
        apply(
            &mut world,
            &cfg(),
            GameEvent::FoodSpawned(FoodSpawned { foods: vec![food("old-food", 0.0)] }),
        );
        let snapshot = GameEvent::WorldSnapshot(WorldSnapshot {
            timestamp: 9,
            players: vec![PlayerState {
                id: "p1".into(),
                name: "n".into(),
                color: Color::default(),
                is_bot: true,
                score: 4,
                cells: vec![CellState { id: "c1".into(), x: 5.0, y: 5.0, radius: 20.0 }],
            }],
            food: vec![],
        });
        assert_eq!(apply(&mut world, &cfg(), snapshot), Outcome::Applied);

        assert!(world.player("old").is_none());
        assert!(world.food_item("old-food").is_none());
        assert!(world.cell("o1").is_none());
        assert_eq!(world.player("p1").unwrap().score, 4);
        assert_eq!(world.snapshot_timestamp(), Some(9));
    }

    #[test]
    fn test_unknown_event_dropped() {
        let mut world = world();
        apply(&mut world, &cfg(), join("p1", "c1", 100.0, 100.0, 10.0));
        let before = world.clone();
        let outcome = apply(&mut world, &cfg(), GameEvent::Unknown { kind: "virus_spawned".into() });
        assert_eq!(outcome, Outcome::Dropped);
        assert_eq!(world, before);
    }
}
