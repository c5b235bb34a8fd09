//! Configuration Types
//!
//! Defines the structure of `keros.toml`. Every field has a default, so an
//! empty file (or no file at all) reproduces the stock terminal.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::facility::{
    AlertThresholds, GridPosition, MetricBounds, MetricKind, MovementPattern, Sector,
    SignatureType, ThreatLevel, default_sectors,
};

/// Root of `keros.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KerosConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub chat: ChatConfig,
    #[serde(default)]
    pub facility: FacilityConfig,
}

/// HTTP listener
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9600
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Model provider and generation parameters for the chat relay
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    #[serde(default = "default_model")]
    pub model: String,
    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_api_base")]
    pub api_base: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_top_p")]
    pub top_p: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    /// Prefix put in front of every streamed chunk that does not already
    /// start with `[`. Set to an empty string to disable.
    #[serde(default = "default_chunk_label")]
    pub chunk_label: String,
    /// Replaces the built-in persona prompt
    #[serde(default)]
    pub persona: Option<String>,
    /// Bounds connection setup only; a streamed reply may run as long as
    /// the model keeps sending
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_model() -> String {
    "gemini-2.0-pro-exp-02-05".to_string()
}

fn default_api_key_env() -> String {
    "GOOGLE_GENERATIVE_AI_API_KEY".to_string()
}

fn default_api_base() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_temperature() -> f32 {
    0.7
}

fn default_top_p() -> f32 {
    0.4
}

fn default_max_tokens() -> u32 {
    2000
}

fn default_chunk_label() -> String {
    "[ARI]".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    30
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            api_key_env: default_api_key_env(),
            api_base: default_api_base(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            max_tokens: default_max_tokens(),
            chunk_label: default_chunk_label(),
            persona: None,
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl ChatConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        std::env::var(&self.api_key_env)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Facility simulator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,
    #[serde(default = "default_grid_max")]
    pub grid_max: i32,
    #[serde(default = "default_static_burst_ms")]
    pub static_burst_ms: u64,
    /// Chance that a motion sensor reads true on a given tick
    #[serde(default = "default_motion_probability")]
    pub motion_probability: f64,
    #[serde(default = "default_lockdown_success_rate")]
    pub lockdown_success_rate: f64,
    /// Fixed RNG seed for reproducible runs
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub thresholds: AlertThresholds,
    #[serde(default)]
    pub entity: EntityConfig,
    /// Per-kind overrides of the built-in metric bounds
    #[serde(default)]
    pub metrics: BTreeMap<MetricKind, MetricBounds>,
    #[serde(default = "default_sectors")]
    pub sectors: Vec<Sector>,
}

fn default_tick_interval_ms() -> u64 {
    5_000
}

fn default_log_capacity() -> usize {
    8
}

fn default_grid_max() -> i32 {
    10
}

fn default_static_burst_ms() -> u64 {
    1_500
}

fn default_motion_probability() -> f64 {
    0.3
}

fn default_lockdown_success_rate() -> f64 {
    0.8
}

impl Default for FacilityConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            log_capacity: default_log_capacity(),
            grid_max: default_grid_max(),
            static_burst_ms: default_static_burst_ms(),
            motion_probability: default_motion_probability(),
            lockdown_success_rate: default_lockdown_success_rate(),
            seed: None,
            thresholds: AlertThresholds::default(),
            entity: EntityConfig::default(),
            metrics: BTreeMap::new(),
            sectors: default_sectors(),
        }
    }
}

impl FacilityConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn static_burst(&self) -> Duration {
        Duration::from_millis(self.static_burst_ms)
    }
}

/// Unknown entity start state and probability tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityConfig {
    #[serde(default = "default_start")]
    pub start: GridPosition,
    #[serde(default = "default_start_sector")]
    pub start_sector: String,
    /// Sectors the entity can be sighted in
    #[serde(default = "default_entity_sectors")]
    pub sectors: Vec<WeightedSector>,
    #[serde(default = "default_movement")]
    pub movement: BTreeMap<MovementPattern, f64>,
    #[serde(default = "default_threat")]
    pub threat: BTreeMap<ThreatLevel, f64>,
    #[serde(default = "default_signature")]
    pub signature: BTreeMap<SignatureType, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightedSector {
    pub code: String,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

fn default_start() -> GridPosition {
    GridPosition::new(5, 5)
}

fn default_start_sector() -> String {
    "B".to_string()
}

fn default_entity_sectors() -> Vec<WeightedSector> {
    ["A", "B", "C"]
        .into_iter()
        .map(|code| WeightedSector {
            code: code.to_string(),
            weight: default_weight(),
        })
        .collect()
}

fn default_movement() -> BTreeMap<MovementPattern, f64> {
    BTreeMap::from([
        (MovementPattern::Erratic, 0.5),
        (MovementPattern::Hunting, 0.3),
        (MovementPattern::Stalking, 0.2),
    ])
}

fn default_threat() -> BTreeMap<ThreatLevel, f64> {
    BTreeMap::from([
        (ThreatLevel::Unknown, 0.6),
        (ThreatLevel::High, 0.3),
        (ThreatLevel::Extreme, 0.1),
    ])
}

fn default_signature() -> BTreeMap<SignatureType, f64> {
    BTreeMap::from([
        (SignatureType::Anomalous, 0.5),
        (SignatureType::Biological, 0.3),
        (SignatureType::Unknown, 0.2),
    ])
}

impl Default for EntityConfig {
    fn default() -> Self {
        Self {
            start: default_start(),
            start_sector: default_start_sector(),
            sectors: default_entity_sectors(),
            movement: default_movement(),
            threat: default_threat(),
            signature: default_signature(),
        }
    }
}
