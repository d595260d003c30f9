//! Configuration loading for the bingo server
//!
//! Reads an optional TOML file, applies `BINGO_*` environment overrides and
//! validates the result.

use crate::config::{EngineConfig, StorageBackend};
use crate::errors::{BingoResult, ConfigurationError};
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self { config_path: None }
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> BingoResult<EngineConfig> {
        let mut config = match self.config_path {
            Some(ref path) => self.load_from_file(path)?,
            None => EngineConfig::default(),
        };

        self.apply_env_overrides(&mut config)?;
        config.validate()?;

        Ok(config)
    }

    fn load_from_file(&self, path: &str) -> Result<EngineConfig, ConfigurationError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;

        toml::from_str(&content)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to parse TOML: {}", e)))
    }

    fn apply_env_overrides(&self, config: &mut EngineConfig) -> Result<(), ConfigurationError> {
        if let Ok(host) = env::var("BINGO_HOST") {
            config.server.host = host;
        }
        if let Some(port) = parse_env("BINGO_PORT")? {
            config.server.port = port;
        }
        if let Ok(dir) = env::var("BINGO_DATA_DIR") {
            config.storage.data_directory = dir;
        }
        if let Ok(path) = env::var("BINGO_CARDS_PATH") {
            config.storage.cards_path = path;
        }
        if let Ok(backend) = env::var("BINGO_STORAGE_BACKEND") {
            config.storage.backend = match backend.to_ascii_lowercase().as_str() {
                "rocksdb" | "rocks_db" => StorageBackend::RocksDb,
                "memory" => StorageBackend::Memory,
                _ => {
                    return Err(ConfigurationError::InvalidValue {
                        field: "BINGO_STORAGE_BACKEND".to_string(),
                        value: backend,
                        reason: "expected rocksdb or memory".to_string(),
                    })
                }
            };
        }
        if let Some(min_cards) = parse_env("BINGO_MIN_CARDS")? {
            config.lobby.min_cards = min_cards;
        }
        if let Some(countdown) = parse_env("BINGO_COUNTDOWN_SECS")? {
            config.lobby.countdown_secs = countdown;
        }
        if let Some(interval) = parse_env("BINGO_DRAW_INTERVAL_MS")? {
            config.lobby.draw_interval_ms = interval;
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, config: &EngineConfig, path: &str) -> BingoResult<()> {
        let toml_string = toml::to_string_pretty(config)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, toml_string)
            .map_err(|e| ConfigurationError::SaveFailed(format!("Failed to write to {}: {}", path, e)))?;
        Ok(())
    }
}

fn parse_env<T: FromStr>(key: &str) -> Result<Option<T>, ConfigurationError> {
    match env::var(key) {
        Ok(raw) => raw.parse().map(Some).map_err(|_| ConfigurationError::InvalidValue {
            field: key.to_string(),
            value: raw,
            reason: "not a valid number".to_string(),
        }),
        Err(_) => Ok(None),
    }
}

/// Generate a sample configuration file
pub fn generate_sample_config(path: &str) -> BingoResult<()> {
    ConfigLoader::new().save(&EngineConfig::default(), path)
}
