//! Shared protocol crate for ogar-sync.
//!
//! This crate contains:
//! - Typed event payloads and the closed `GameEvent` sum type
//! - Server -> client message envelopes (init, single event, event batch)
//! - Client -> server messages (join, move, split, eject)
//! - Shared types (Color, Position)

mod error;
pub mod events;
pub mod messages;

pub use error::ProtocolError;
pub use events::*;
pub use messages::*;

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::warn;

/// RGB color used for players and food.
///
/// Travels on the wire as a `#RRGGBB` string. Color is cosmetic, so a missing
/// or unreadable value decodes to the default instead of failing the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(into = "String")]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#RRGGBB` (the leading `#` is optional).
    pub fn from_hex(s: &str) -> Result<Self, ProtocolError> {
        let hex = s.strip_prefix('#').unwrap_or(s);
        if hex.len() != 6 || !hex.is_ascii() {
            return Err(ProtocolError::InvalidColor(s.to_string()));
        }
        let channel = |i: usize| {
            u8::from_str_radix(&hex[i..i + 2], 16)
                .map_err(|_| ProtocolError::InvalidColor(s.to_string()))
        };
        Ok(Self::new(channel(0)?, channel(2)?, channel(4)?))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Some(text) = Option::<String>::deserialize(deserializer)? else {
            return Ok(Self::default());
        };
        Ok(Self::from_hex(&text).unwrap_or_else(|e| {
            warn!("{}, using default color", e);
            Self::default()
        }))
    }
}

impl From<Color> for String {
    fn from(color: Color) -> Self {
        color.to_string()
    }
}

/// Represents a 2D position using glam's Vec2.
pub type Position = glam::Vec2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#FF6B6B").unwrap(), Color::new(0xFF, 0x6B, 0x6B));
        assert_eq!(Color::from_hex("4ecdc4").unwrap(), Color::new(0x4E, 0xCD, 0xC4));
        assert!(Color::from_hex("#FFF").is_err());
        assert!(Color::from_hex("#GG0000").is_err());
    }

    #[test]
    fn test_unreadable_color_decodes_to_default() {
        let short: Color = serde_json::from_str(r##""#fff""##).unwrap();
        assert_eq!(short, Color::default());
        let null: Color = serde_json::from_str("null").unwrap();
        assert_eq!(null, Color::default());
        let good: Color = serde_json::from_str(r##""#4ECDC4""##).unwrap();
        assert_eq!(good, Color::new(0x4E, 0xCD, 0xC4));
    }

    #[test]
    fn test_color_display() {
        assert_eq!(Color::new(0x45, 0xB7, 0xD1).to_string(), "#45B7D1");
    }
}
