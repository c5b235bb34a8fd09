//! Configuration Loader
//!
//! Reads `keros.toml` from disk and validates it.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{debug, info, warn};

use super::settings::KerosConfig;
use crate::facility::{EntityModel, FacilityError, MetricKind, MetricTable};

/// File looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "keros.toml";

/// Error type for configuration loading
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Config file does not exist: {0}")]
    PathNotFound(PathBuf),

    #[error("Failed to read file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Facility(#[from] FacilityError),
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from `path`, or from `./keros.toml` if it exists,
    /// falling back to built-in defaults.
    ///
    /// An explicitly given path must exist.
    pub async fn load(path: Option<&Path>) -> Result<KerosConfig, ConfigError> {
        let config = match path {
            Some(path) => {
                if !fs::try_exists(path).await.unwrap_or(false) {
                    return Err(ConfigError::PathNotFound(path.to_path_buf()));
                }
                Self::load_file(path).await?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if fs::try_exists(default_path).await.unwrap_or(false) {
                    Self::load_file(default_path).await?
                } else {
                    debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    KerosConfig::default()
                }
            }
        };

        Self::validate(&config)?;
        Ok(config)
    }

    async fn load_file(path: &Path) -> Result<KerosConfig, ConfigError> {
        info!("Loading configuration from: {}", path.display());
        let content = fs::read_to_string(path).await?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<KerosConfig, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reject settings the simulator cannot run with. Suspicious but
    /// workable settings are only logged.
    pub fn validate(config: &KerosConfig) -> Result<(), ConfigError> {
        let facility = &config.facility;

        if facility.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid("facility.tick_interval_ms must be positive".into()));
        }
        if facility.log_capacity == 0 {
            return Err(ConfigError::Invalid("facility.log_capacity must be at least 1".into()));
        }

        for (name, p) in [
            ("facility.motion_probability", facility.motion_probability),
            ("facility.lockdown_success_rate", facility.lockdown_success_rate),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid(format!("{name} must be within [0, 1], got {p}")));
            }
        }

        let mut codes = HashSet::new();
        for sector in &facility.sectors {
            if sector.code.is_empty() {
                return Err(ConfigError::Invalid(format!("sector '{}' has an empty code", sector.name)));
            }
            if !codes.insert(sector.code.as_str()) {
                return Err(ConfigError::Invalid(format!("duplicate sector code '{}'", sector.code)));
            }
            if let Some((kind, value)) = sector.metrics.iter().find(|(_, v)| !v.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "sector {} has a non-finite {} reading: {value}",
                    sector.code,
                    kind.label()
                )));
            }
        }

        let table = MetricTable::new(facility.metrics.clone());
        for kind in MetricKind::ALL {
            let bounds = table.bounds(kind);
            if !(bounds.min.is_finite() && bounds.max.is_finite() && bounds.fluctuation.is_finite()) {
                return Err(ConfigError::Invalid(format!(
                    "{} bounds must be finite",
                    kind.label()
                )));
            }
            if bounds.min > bounds.max {
                warn!(
                    metric = kind.label(),
                    min = bounds.min,
                    max = bounds.max,
                    "Metric min exceeds max; readings will be pinned to max"
                );
            }
        }

        let thresholds = &facility.thresholds;
        if !codes.contains(thresholds.reactor_sector.as_str()) {
            warn!(
                sector = %thresholds.reactor_sector,
                "Reactor sector not found; reactor alerts are disabled"
            );
        }
        if thresholds.warning_temperature > thresholds.critical_temperature {
            warn!(
                warning = thresholds.warning_temperature,
                critical = thresholds.critical_temperature,
                "Warning temperature is above the critical temperature"
            );
        }

        for sector in &facility.entity.sectors {
            if !codes.contains(sector.code.as_str()) {
                warn!(sector = %sector.code, "Entity sighting sector is not a configured sector");
            }
        }

        EntityModel::new(&facility.entity, facility.grid_max)?;

        Ok(())
    }
}
