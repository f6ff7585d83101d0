//! Sync engine configuration.
//!
//! Every constant the prediction engine and event applicator use lives here so a
//! host can retune them from a `config.toml` without rebuilding.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Root configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub world: WorldConfig,
    #[serde(default)]
    pub motion: MotionConfig,
    #[serde(default)]
    pub impulse: ImpulseConfig,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    #[serde(default)]
    pub events: EventsConfig,
}

impl Config {
    /// Load configuration from `path`, or use defaults if the file is absent.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config = Self::from_toml(&contents)?;
            info!("Loaded sync config from {}", path.display());
            Ok(config)
        } else {
            info!("No {} found, using default sync config", path.display());
            Ok(Self::default())
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(contents: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Render the configuration as TOML (used to write a starter file).
    pub fn to_toml(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

/// World bounds used until the server's `init` message arrives.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorldConfig {
    #[serde(default = "default_world_size")]
    pub width: f32,
    #[serde(default = "default_world_size")]
    pub height: f32,
    /// Longest frame the engine will simulate in one step, in seconds.
    #[serde(default = "default_max_frame_dt")]
    pub max_frame_dt: f32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: default_world_size(),
            height: default_world_size(),
            max_frame_dt: default_max_frame_dt(),
        }
    }
}

fn default_world_size() -> f32 {
    5000.0
}
fn default_max_frame_dt() -> f32 {
    0.1
}

/// Steering prediction. Must match the server's movement law.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MotionConfig {
    /// speed = base_speed / mass^speed_decay
    #[serde(default = "default_base_speed")]
    pub base_speed: f32,
    #[serde(default = "default_speed_decay")]
    pub speed_decay: f32,
    /// Mass floor for the speed law (the server never lets a cell go below it).
    #[serde(default = "default_min_mass")]
    pub min_mass: f32,
    /// Cells closer than this to their target stop steering.
    #[serde(default = "default_min_steer_distance")]
    pub min_steer_distance: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            base_speed: default_base_speed(),
            speed_decay: default_speed_decay(),
            min_mass: default_min_mass(),
            min_steer_distance: default_min_steer_distance(),
        }
    }
}

fn default_base_speed() -> f32 {
    600.0
}
fn default_speed_decay() -> f32 {
    0.3
}
fn default_min_mass() -> f32 {
    1.0
}
fn default_min_steer_distance() -> f32 {
    1.0
}

/// Split/eject impulse motion.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ImpulseConfig {
    /// Multiplier applied to the impulse velocity on every advance.
    #[serde(default = "default_impulse_decay")]
    pub decay: f32,
    /// The impulse ends once both velocity components are below this.
    #[serde(default = "default_rest_speed")]
    pub rest_speed: f32,
}

impl Default for ImpulseConfig {
    fn default() -> Self {
        Self {
            decay: default_impulse_decay(),
            rest_speed: default_rest_speed(),
        }
    }
}

fn default_impulse_decay() -> f32 {
    0.95
}
fn default_rest_speed() -> f32 {
    0.1
}

/// Blending of predicted state toward authoritative corrections.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ReconcileConfig {
    /// Reconciliation progress gained per second (10 = one server update period).
    #[serde(default = "default_progress_rate")]
    pub progress_rate: f32,
    /// Errors longer than this use `fast_rate`.
    #[serde(default = "default_snap_distance")]
    pub snap_distance: f32,
    #[serde(default = "default_fast_rate")]
    pub fast_rate: f32,
    #[serde(default = "default_gentle_rate")]
    pub gentle_rate: f32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            progress_rate: default_progress_rate(),
            snap_distance: default_snap_distance(),
            fast_rate: default_fast_rate(),
            gentle_rate: default_gentle_rate(),
        }
    }
}

fn default_progress_rate() -> f32 {
    10.0
}
fn default_snap_distance() -> f32 {
    120.0
}
fn default_fast_rate() -> f32 {
    12.0
}
fn default_gentle_rate() -> f32 {
    4.0
}

/// Local cues applied by the event applicator.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EventsConfig {
    /// Radius added to a cell when it eats food, until the server corrects it.
    #[serde(default = "default_food_eaten_growth")]
    pub food_eaten_growth: f32,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            food_eaten_growth: default_food_eaten_growth(),
        }
    }
}

fn default_food_eaten_growth() -> f32 {
    0.5
}
