// SPDX-License-Identifier: MIT

//! Engine configuration loaded from environment variables.
//!
//! Everything has a sensible default so the engine can run without any
//! environment set up. The filter thresholds (accuracy, jump distance) are
//! deliberately *not* configurable: they are invariants of the recording
//! contract, defined in [`crate::services::filter`].

use std::env;
use std::path::PathBuf;

/// Engine configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the remote sync service (no trailing slash).
    pub remote_base_url: String,
    /// Path of the local SQLite database file.
    pub db_path: PathBuf,
    /// Directory for generated thumbnail artifacts.
    pub data_dir: PathBuf,
    /// Thumbnail canvas edge length in pixels (square canvas).
    pub thumbnail_size: u32,
    /// Rider weight for the calorie estimate. The original app hardcoded
    /// 70 kg; changing this changes the semantics of newly created records
    /// only, never of stored ones.
    pub rider_weight_kg: f64,
    /// Capacity of the bounded fix channel between the location provider
    /// adapter and the recording loop.
    pub fix_channel_capacity: usize,
}

impl Default for Config {
    /// Default config for tests and local development.
    fn default() -> Self {
        Self {
            remote_base_url: "http://localhost:8080".to_string(),
            db_path: PathBuf::from("veloride.db"),
            data_dir: PathBuf::from("data"),
            thumbnail_size: 300,
            rider_weight_kg: 70.0,
            fix_channel_capacity: 32,
        }
    }
}

impl Config {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok(); // Load .env file if present

        let defaults = Self::default();

        let rider_weight_kg = match env::var("VELORIDE_RIDER_WEIGHT_KG") {
            Ok(raw) => raw
                .trim()
                .parse::<f64>()
                .map_err(|_| ConfigError::Invalid("VELORIDE_RIDER_WEIGHT_KG"))?,
            Err(_) => defaults.rider_weight_kg,
        };
        if !rider_weight_kg.is_finite() || rider_weight_kg <= 0.0 {
            return Err(ConfigError::Invalid("VELORIDE_RIDER_WEIGHT_KG"));
        }

        Ok(Self {
            remote_base_url: env::var("VELORIDE_REMOTE_URL")
                .map(|v| v.trim_end_matches('/').to_string())
                .unwrap_or(defaults.remote_base_url),
            db_path: env::var("VELORIDE_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            data_dir: env::var("VELORIDE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            thumbnail_size: env::var("VELORIDE_THUMBNAIL_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.thumbnail_size),
            rider_weight_kg,
            fix_channel_capacity: env::var("VELORIDE_FIX_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.fix_channel_capacity),
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),
}
