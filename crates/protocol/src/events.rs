//! World events streamed by the server.
//!
//! On the wire every event is `{"type": <kind>, "timestamp": <ms>, "data": {..}}`.
//! Decoding is two-staged: the envelope is read into a [`RawEvent`] first, then
//! the payload is decoded according to its kind. This keeps one malformed event
//! from poisoning a whole batch and lets unknown kinds through as
//! [`GameEvent::Unknown`].

use crate::{Color, Position, ProtocolError};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};

/// Wire names of every event kind the client understands.
pub mod event_kind {
    pub const PLAYER_JOINED: &str = "player_joined";
    pub const PLAYER_MOVED: &str = "player_moved";
    pub const CELL_UPDATED: &str = "cell_updated";
    pub const PLAYER_SPLIT: &str = "player_split";
    pub const PLAYER_EJECTED: &str = "player_ejected";
    pub const PLAYER_DIED: &str = "player_died";
    pub const FOOD_SPAWNED: &str = "food_spawned";
    pub const FOOD_EATEN: &str = "food_eaten";
    pub const CELL_EATEN: &str = "cell_eaten";
    pub const CELL_MERGED: &str = "cell_merged";
    pub const WORLD_SNAPSHOT: &str = "world_snapshot";
}

/// Go encodes empty slices as `null`; treat that as an empty list.
fn nullable_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

/// A player entered the world with a single cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerJoined {
    pub player_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub is_bot: bool,
    pub cell_id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl PlayerJoined {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Steering update. Without `cell_id` it applies to every cell of the player.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMoved {
    pub player_id: String,
    #[serde(default)]
    pub cell_id: Option<String>,
    pub target_x: f32,
    pub target_y: f32,
}

impl PlayerMoved {
    pub fn target(&self) -> Position {
        Position::new(self.target_x, self.target_y)
    }
}

/// Authoritative position/radius of one cell (~10 Hz).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellUpdated {
    pub cell_id: String,
    #[serde(default)]
    pub player_id: Option<String>,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl CellUpdated {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// A cell produced by a split, launched with an impulse velocity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SplitCell {
    pub cell_id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    #[serde(default)]
    pub vel_x: f32,
    #[serde(default)]
    pub vel_y: f32,
}

impl SplitCell {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn velocity(&self) -> glam::Vec2 {
        glam::Vec2::new(self.vel_x, self.vel_y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSplit {
    pub player_id: String,
    #[serde(deserialize_with = "nullable_vec")]
    pub new_cells: Vec<SplitCell>,
    /// Cells the split consumed. The stock server never sends any.
    #[serde(default, deserialize_with = "nullable_vec")]
    pub remove_cell_ids: Vec<String>,
}

/// A food pellet or a blob of ejected mass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodInfo {
    pub food_id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub vel_x: f32,
    #[serde(default)]
    pub vel_y: f32,
}

impl FoodInfo {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }

    pub fn velocity(&self) -> glam::Vec2 {
        glam::Vec2::new(self.vel_x, self.vel_y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEjected {
    pub player_id: String,
    #[serde(deserialize_with = "nullable_vec")]
    pub food: Vec<FoodInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerDied {
    pub player_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodSpawned {
    #[serde(deserialize_with = "nullable_vec")]
    pub foods: Vec<FoodInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodEaten {
    pub food_id: String,
    #[serde(default)]
    pub player_id: Option<String>,
    #[serde(default)]
    pub cell_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEaten {
    pub eaten_cell_id: String,
    /// Player id of the eater.
    #[serde(default)]
    pub eaten_by: Option<String>,
    #[serde(default)]
    pub eater_cell_id: Option<String>,
}

/// Two cells of one player fused. The server reuses `cell1_id` as `new_cell_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellMerged {
    pub player_id: String,
    pub cell1_id: String,
    pub cell2_id: String,
    pub new_cell_id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

impl CellMerged {
    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellState {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerState {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub score: i64,
    #[serde(deserialize_with = "nullable_vec")]
    pub cells: Vec<CellState>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FoodState {
    pub id: String,
    pub x: f32,
    pub y: f32,
    pub radius: f32,
    #[serde(default)]
    pub color: Color,
}

/// Complete description of the world, used for total resynchronization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorldSnapshot {
    #[serde(default)]
    pub timestamp: i64,
    #[serde(deserialize_with = "nullable_vec")]
    pub players: Vec<PlayerState>,
    #[serde(default, deserialize_with = "nullable_vec")]
    pub food: Vec<FoodState>,
}

/// A decoded world event.
#[derive(Debug, Clone, PartialEq)]
pub enum GameEvent {
    PlayerJoined(PlayerJoined),
    PlayerMoved(PlayerMoved),
    CellUpdated(CellUpdated),
    PlayerSplit(PlayerSplit),
    PlayerEjected(PlayerEjected),
    PlayerDied(PlayerDied),
    FoodSpawned(FoodSpawned),
    FoodEaten(FoodEaten),
    CellEaten(CellEaten),
    CellMerged(CellMerged),
    WorldSnapshot(WorldSnapshot),
    /// A kind this client does not know. Kept so callers can log and drop it.
    Unknown { kind: String },
}

impl GameEvent {
    /// Wire name of this event's kind.
    pub fn kind(&self) -> &str {
        match self {
            GameEvent::PlayerJoined(_) => event_kind::PLAYER_JOINED,
            GameEvent::PlayerMoved(_) => event_kind::PLAYER_MOVED,
            GameEvent::CellUpdated(_) => event_kind::CELL_UPDATED,
            GameEvent::PlayerSplit(_) => event_kind::PLAYER_SPLIT,
            GameEvent::PlayerEjected(_) => event_kind::PLAYER_EJECTED,
            GameEvent::PlayerDied(_) => event_kind::PLAYER_DIED,
            GameEvent::FoodSpawned(_) => event_kind::FOOD_SPAWNED,
            GameEvent::FoodEaten(_) => event_kind::FOOD_EATEN,
            GameEvent::CellEaten(_) => event_kind::CELL_EATEN,
            GameEvent::CellMerged(_) => event_kind::CELL_MERGED,
            GameEvent::WorldSnapshot(_) => event_kind::WORLD_SNAPSHOT,
            GameEvent::Unknown { kind } => kind,
        }
    }
}

/// An event envelope whose payload has not been decoded yet.
#[derive(Debug, Clone, Deserialize)]
pub struct RawEvent {
    #[serde(rename = "type")]
    pub kind: String,
    /// Server time in milliseconds when the event was published.
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub data: serde_json::Value,
}

fn payload<T: DeserializeOwned>(kind: &str, data: serde_json::Value) -> Result<T, ProtocolError> {
    serde_json::from_value(data).map_err(|source| ProtocolError::MalformedPayload {
        kind: kind.to_string(),
        source,
    })
}

impl RawEvent {
    /// Decode the payload according to the event kind.
    ///
    /// Unknown kinds decode successfully to [`GameEvent::Unknown`]; a known kind
    /// with a payload missing required fields is an error.
    pub fn decode(self) -> Result<GameEvent, ProtocolError> {
        let RawEvent { kind, data, .. } = self;
        let event = match kind.as_str() {
            event_kind::PLAYER_JOINED => GameEvent::PlayerJoined(payload(&kind, data)?),
            event_kind::PLAYER_MOVED => GameEvent::PlayerMoved(payload(&kind, data)?),
            event_kind::CELL_UPDATED => GameEvent::CellUpdated(payload(&kind, data)?),
            event_kind::PLAYER_SPLIT => GameEvent::PlayerSplit(payload(&kind, data)?),
            event_kind::PLAYER_EJECTED => GameEvent::PlayerEjected(payload(&kind, data)?),
            event_kind::PLAYER_DIED => GameEvent::PlayerDied(payload(&kind, data)?),
            event_kind::FOOD_SPAWNED => GameEvent::FoodSpawned(payload(&kind, data)?),
            event_kind::FOOD_EATEN => GameEvent::FoodEaten(payload(&kind, data)?),
            event_kind::CELL_EATEN => GameEvent::CellEaten(payload(&kind, data)?),
            event_kind::CELL_MERGED => GameEvent::CellMerged(payload(&kind, data)?),
            event_kind::WORLD_SNAPSHOT => GameEvent::WorldSnapshot(payload(&kind, data)?),
            _ => GameEvent::Unknown { kind },
        };
        Ok(event)
    }
}
