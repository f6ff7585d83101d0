//! Server -> Client message parsing.

use super::message_type;
use crate::{GameEvent, ProtocolError, RawEvent};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// World dimensions announced at session start.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldSize {
    pub width: f32,
    pub height: f32,
}

/// One-time initialization payload, delivered before any event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitData {
    pub player_id: String,
    pub world_size: WorldSize,
}

/// Parsed server message.
#[derive(Debug, Clone)]
pub enum ServerMessage {
    /// Session start (`init`).
    Init(InitData),
    /// A single world event, including `world_snapshot`.
    Event(RawEvent),
    /// An ordered batch (`event_batch`). Items are decoded one by one so a
    /// malformed entry only costs itself.
    Batch(Vec<Value>),
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    events: Option<Vec<Value>>,
}

impl ServerMessage {
    /// Parse a server message from a websocket text frame.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let envelope: Envelope = serde_json::from_str(text)?;
        let kind = envelope.kind.ok_or(ProtocolError::MissingType)?;

        match kind.as_str() {
            message_type::INIT => {
                let init = serde_json::from_value(envelope.data).map_err(|source| {
                    ProtocolError::MalformedPayload {
                        kind: kind.clone(),
                        source,
                    }
                })?;
                Ok(ServerMessage::Init(init))
            }
            message_type::EVENT_BATCH => Ok(ServerMessage::Batch(envelope.events.unwrap_or_default())),
            _ => Ok(ServerMessage::Event(RawEvent {
                kind,
                timestamp: envelope.timestamp,
                data: envelope.data,
            })),
        }
    }

    /// Decode the world events carried by this message, in order.
    ///
    /// `Init` carries none.
    pub fn into_events(self) -> Vec<Result<GameEvent, ProtocolError>> {
        match self {
            ServerMessage::Init(_) => Vec::new(),
            ServerMessage::Event(raw) => vec![raw.decode()],
            ServerMessage::Batch(items) => items
                .into_iter()
                .map(|item| RawEvent::from_value(item)?.decode())
                .collect(),
        }
    }

    /// Latest event timestamp carried by this message, in server milliseconds.
    pub fn timestamp(&self) -> Option<i64> {
        match self {
            ServerMessage::Init(_) => None,
            ServerMessage::Event(raw) => raw.timestamp,
            ServerMessage::Batch(items) => items
                .iter()
                .filter_map(|item| item.get("timestamp").and_then(Value::as_i64))
                .max(),
        }
    }
}

impl RawEvent {
    /// Read an event envelope out of an already parsed JSON value.
    pub fn from_value(value: Value) -> Result<Self, ProtocolError> {
        if value.get("type").and_then(Value::as_str).is_none() {
            return Err(ProtocolError::MissingType);
        }
        Ok(serde_json::from_value(value)?)
    }
}
