// Browser bindings: JS owns the socket and the render loop, Rust owns the world

use crate::{Config, SyncState};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

#[wasm_bindgen]
pub struct SyncClient {
    state: SyncState,
}

#[wasm_bindgen]
impl SyncClient {
    /// Create a client, optionally tuned by a TOML config string
    #[wasm_bindgen(constructor)]
    pub fn new(config_toml: Option<String>) -> Result<SyncClient, JsValue> {
        let config = match config_toml {
            Some(text) => Config::from_toml(&text).map_err(|e| JsValue::from_str(&e.to_string()))?,
            None => Config::default(),
        };
        Ok(SyncClient {
            state: SyncState::new(config),
        })
    }

    /// Feed one websocket text frame
    pub fn handle_message(&mut self, text: &str) {
        self.state.handle_message(text);
    }

    /// Step prediction by `dt` seconds (call once per animation frame)
    pub fn advance(&mut self, dt: f32) {
        self.state.advance(dt);
    }

    pub fn players(&self) -> Result<JsValue, JsValue> {
        let players: Vec<_> = self.state.players().collect();
        Ok(serde_wasm_bindgen::to_value(&players)?)
    }

    pub fn food(&self) -> Result<JsValue, JsValue> {
        let food: Vec<_> = self.state.food().collect();
        Ok(serde_wasm_bindgen::to_value(&food)?)
    }

    pub fn local_player(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.state.local_player())?)
    }

    pub fn stats(&self) -> Result<JsValue, JsValue> {
        Ok(serde_wasm_bindgen::to_value(&self.state.stats())?)
    }

    pub fn clear(&mut self) {
        self.state.clear();
    }
}
