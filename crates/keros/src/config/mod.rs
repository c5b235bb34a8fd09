//! Terminal Configuration
//!
//! `keros.toml` drives the listener, the chat relay and the facility
//! simulator. Command-line flags override individual fields in `main`.

mod loader;
mod settings;

pub use loader::{ConfigError, ConfigLoader, DEFAULT_CONFIG_FILE};
pub use settings::{ChatConfig, EntityConfig, FacilityConfig, KerosConfig, ServerConfig, WeightedSector};
