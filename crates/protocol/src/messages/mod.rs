//! Message envelopes exchanged with the arena server.
//!
//! This module contains both client->server and server->client message types.

mod client;
mod server;

pub use client::*;
pub use server::*;

/// Envelope `type` values for server -> client messages that are not world events.
pub mod message_type {
    /// Session start: local player id and world size.
    pub const INIT: &str = "init";
    /// Ordered list of world events flushed in one server tick.
    pub const EVENT_BATCH: &str = "event_batch";
}
