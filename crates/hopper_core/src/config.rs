//! Runtime configuration.
//!
//! # Responsibility
//! - Derive file locations from one data root.
//! - Apply `HOPPER_*` environment overrides with validation.
//!
//! # Invariants
//! - `tick_interval` is at least one second.
//! - `max_add_amount` is finite and positive.

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DATA_FILE_NAME: &str = "hopper_state.json";
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_ADD_AMOUNT: f64 = 100.0;

pub const ENV_DATA_FILE: &str = "HOPPER_DATA_FILE";
pub const ENV_UPLOAD_DIR: &str = "HOPPER_UPLOAD_DIR";
pub const ENV_LOG_DIR: &str = "HOPPER_LOG_DIR";
pub const ENV_LOG_LEVEL: &str = "HOPPER_LOG_LEVEL";
pub const ENV_TICK_SECS: &str = "HOPPER_TICK_SECS";
pub const ENV_MAX_ADD: &str = "HOPPER_MAX_ADD";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidValue { key: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, value } => write!(f, "invalid value for {key}: `{value}`"),
        }
    }
}

impl Error for ConfigError {}

/// Resolved service configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct HopperConfig {
    /// JSON snapshot file.
    pub data_file: PathBuf,
    /// Directory backing the `/uploads/` namespace.
    pub upload_dir: PathBuf,
    pub log_dir: PathBuf,
    pub log_level: String,
    /// Background rollover check period.
    pub tick_interval: Duration,
    /// Largest accepted single hopper contribution.
    pub max_add_amount: f64,
}

impl HopperConfig {
    /// Default layout under `root`: `data/`, `uploads/`, `logs/`.
    pub fn with_root(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        Self {
            data_file: root.join("data").join(DEFAULT_DATA_FILE_NAME),
            upload_dir: root.join("uploads"),
            log_dir: root.join("logs"),
            log_level: default_log_level().to_string(),
            tick_interval: Duration::from_secs(DEFAULT_TICK_INTERVAL_SECS),
            max_add_amount: DEFAULT_MAX_ADD_AMOUNT,
        }
    }

    /// Defaults under `root` overridden by process environment variables.
    pub fn from_env(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_lookup(root, |key| std::env::var(key).ok())
    }

    /// Defaults under `root` overridden by values from `lookup`.
    pub fn from_lookup(
        root: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::with_root(root);
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(value) = read(ENV_DATA_FILE) {
            config.data_file = PathBuf::from(value.trim());
        }
        if let Some(value) = read(ENV_UPLOAD_DIR) {
            config.upload_dir = PathBuf::from(value.trim());
        }
        if let Some(value) = read(ENV_LOG_DIR) {
            config.log_dir = PathBuf::from(value.trim());
        }
        if let Some(value) = read(ENV_LOG_LEVEL) {
            config.log_level = normalize_level(&value)
                .map_err(|_| invalid(ENV_LOG_LEVEL, &value))?
                .to_string();
        }
        if let Some(value) = read(ENV_TICK_SECS) {
            let secs = value
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs >= 1)
                .ok_or_else(|| invalid(ENV_TICK_SECS, &value))?;
            config.tick_interval = Duration::from_secs(secs);
        }
        if let Some(value) = read(ENV_MAX_ADD) {
            config.max_add_amount = value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|max| max.is_finite() && *max > 0.0)
                .ok_or_else(|| invalid(ENV_MAX_ADD, &value))?;
        }

        Ok(config)
    }
}

fn invalid(key: &'static str, value: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
    }
}
