//! Configuration management with validation and defaults

use crate::common::types::{Stake, BPS_DENOMINATOR};
use crate::errors::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

/// Complete engine configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub server: ServerConfig,
    pub lobby: LobbyConfig,
    pub storage: StorageConfig,
    pub monitoring: MonitoringConfig,
}

/// HTTP / WebSocket listener configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

/// What happens to the stakes when every number is drawn without a claim
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NoWinnerPolicy {
    /// Stakes stay with the house, the lobby simply resets
    HouseRetains,
    /// Every player who paid gets the stake credited back
    Refund,
}

/// Round lifecycle parameters shared by every lobby
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LobbyConfig {
    /// Stake tiers, one lobby each
    pub stakes: Vec<Stake>,
    /// Countdown length in ticks
    pub countdown_secs: u32,
    /// Length of one countdown tick
    pub tick_ms: u64,
    /// Delay between two drawn numbers
    pub draw_interval_ms: u64,
    /// Selected cards needed when the countdown expires
    pub min_cards: usize,
    /// Share of the pot paid to the winner, in basis points
    pub payout_bps: u32,
    /// Delay between a winning claim and the round reset
    pub claim_grace_ms: u64,
    pub no_winner_policy: NoWinnerPolicy,
    /// Per-session outbound queue capacity
    pub outbound_capacity: usize,
    /// Fixed seed for reproducible draw orders (testing only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw_seed: Option<u64>,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            stakes: vec![10, 20, 50, 100],
            countdown_secs: 30,
            tick_ms: 1_000,
            draw_interval_ms: 5_000,
            min_cards: 1,
            payout_bps: 8_000,
            claim_grace_ms: 5_000,
            no_winner_policy: NoWinnerPolicy::HouseRetains,
            outbound_capacity: 64,
            draw_seed: None,
        }
    }
}

impl LobbyConfig {
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn draw_interval(&self) -> Duration {
        Duration::from_millis(self.draw_interval_ms)
    }

    pub fn claim_grace(&self) -> Duration {
        Duration::from_millis(self.claim_grace_ms)
    }

    /// Millisecond-scale timings for tests and local demos
    pub fn fast() -> Self {
        Self {
            countdown_secs: 3,
            tick_ms: 10,
            draw_interval_ms: 10,
            claim_grace_ms: 50,
            ..Default::default()
        }
    }
}

/// Storage backend selection
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    RocksDb,
    Memory,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    /// JSON card definitions, loaded once at startup
    pub cards_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::RocksDb,
            data_directory: "./DB/bingo_data".to_string(),
            cards_path: "./cards.json".to_string(),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    /// Default tracing filter, overridden by RUST_LOG
    pub log_filter: String,
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            log_filter: "bingo_hall=info,tower_http=info".to_string(),
        }
    }
}

impl EngineConfig {
    /// Validate configuration for logical consistency
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let lobby = &self.lobby;

        if lobby.stakes.is_empty() {
            return Err(ConfigurationError::MissingRequired("lobby.stakes".to_string()));
        }
        let mut seen = HashSet::new();
        for stake in &lobby.stakes {
            if *stake == 0 {
                return Err(invalid("lobby.stakes", stake, "stake must be > 0"));
            }
            if !seen.insert(*stake) {
                return Err(invalid("lobby.stakes", stake, "duplicate stake tier"));
            }
        }

        if lobby.countdown_secs == 0 {
            return Err(invalid("lobby.countdown_secs", 0, "countdown must be > 0"));
        }
        if lobby.tick_ms == 0 {
            return Err(invalid("lobby.tick_ms", 0, "tick must be > 0"));
        }
        if lobby.draw_interval_ms == 0 {
            return Err(invalid("lobby.draw_interval_ms", 0, "draw interval must be > 0"));
        }
        if lobby.min_cards == 0 {
            return Err(invalid("lobby.min_cards", 0, "at least one card is required"));
        }
        if lobby.payout_bps as u64 > BPS_DENOMINATOR {
            return Err(invalid(
                "lobby.payout_bps",
                lobby.payout_bps,
                "payout cannot exceed the pot",
            ));
        }
        if lobby.outbound_capacity == 0 {
            return Err(invalid("lobby.outbound_capacity", 0, "queue capacity must be > 0"));
        }

        if self.server.port == 0 {
            return Err(invalid("server.port", 0, "Port cannot be zero"));
        }

        if self.storage.backend == StorageBackend::RocksDb && self.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()));
        }
        if self.storage.cards_path.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.cards_path".to_string()));
        }

        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ConfigurationError {
    ConfigurationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
