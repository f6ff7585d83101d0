//! Client -> Server message building.

use serde::Serialize;

/// Outbound client message, serialized as `{"type": .., "data": ..}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the game with a nickname.
    Join { name: String },
    /// Steer toward a world position.
    Move { x: f32, y: f32 },
    /// Split every eligible cell.
    Split,
    /// Eject mass.
    Eject,
}

impl ClientMessage {
    /// Encode for a websocket text frame.
    pub fn to_json(&self) -> String {
        match self {
            // The server reads `data` for every message; unit variants send null.
            ClientMessage::Split => r#"{"type":"split","data":null}"#.to_string(),
            ClientMessage::Eject => r#"{"type":"eject","data":null}"#.to_string(),
            _ => serde_json::to_string(self).unwrap_or_default(),
        }
    }
}
