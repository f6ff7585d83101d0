// Client-side world synchronization for native-agar
// Rebuilds the server's world from its event stream and predicts motion between updates

pub mod config;
pub mod game;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use config::Config;
pub use game::entities::{Authority, Cell, Food, Player};
pub use game::world::{World, WorldBounds};
pub use game::{SyncState, SyncStats};
