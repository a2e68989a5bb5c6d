//! Bot configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use foul_engine::{EngineConfig, DEFAULT_POLL_DURATION_SECS};

use crate::logging::LogFormat;
use crate::BotError;

/// Configuration for a foulbot instance.
///
/// Can be loaded from a TOML file via [`BotConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BotConfig {
    /// Data directory for the poll database.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// LMDB map size in MiB.
    #[serde(default = "default_map_size_mb")]
    pub map_size_mb: usize,

    /// How long a poll accepts votes.
    #[serde(default = "default_poll_duration_secs")]
    pub poll_duration_secs: u64,

    /// Period of the expiry sweep.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Minimum gap between two polls by the same creator.
    #[serde(default = "default_creator_cooldown_secs")]
    pub creator_cooldown_secs: u64,

    /// Upper bound on a single store call made from async code.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,

    /// Rows shown by the leaderboard command.
    #[serde(default = "default_leaderboard_size")]
    pub leaderboard_size: usize,

    /// Chance that a resolution lists who voted which way.
    #[serde(default = "default_show_votes_probability")]
    pub show_votes_probability: f64,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Whether to collect Prometheus metrics.
    #[serde(default)]
    pub enable_metrics: bool,

    /// Chat server the bot serves.
    #[serde(default)]
    pub guild_id: Option<String>,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./foulbot_data")
}

fn default_map_size_mb() -> usize {
    256
}

fn default_poll_duration_secs() -> u64 {
    DEFAULT_POLL_DURATION_SECS
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_creator_cooldown_secs() -> u64 {
    300
}

fn default_store_timeout_ms() -> u64 {
    5_000
}

fn default_leaderboard_size() -> usize {
    10
}

fn default_show_votes_probability() -> f64 {
    0.5
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl BotConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, BotError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| BotError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, BotError> {
        let config: Self = toml::from_str(s).map_err(|e| BotError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, BotError> {
        toml::to_string_pretty(self).map_err(|e| BotError::Config(e.to_string()))
    }

    /// Reject values the runtime cannot work with.
    pub fn validate(&self) -> Result<(), BotError> {
        if self.sweep_interval_secs == 0 {
            return Err(BotError::Config("sweep_interval_secs must be positive".into()));
        }
        if self.store_timeout_ms == 0 {
            return Err(BotError::Config("store_timeout_ms must be positive".into()));
        }
        if self.map_size_mb == 0 {
            return Err(BotError::Config("map_size_mb must be positive".into()));
        }
        if !(0.0..=1.0).contains(&self.show_votes_probability) {
            return Err(BotError::Config(
                "show_votes_probability must be within 0.0..=1.0".into(),
            ));
        }
        self.log_format()?;
        Ok(())
    }

    pub fn log_format(&self) -> Result<LogFormat, BotError> {
        self.log_format.parse()
    }

    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            poll_duration_secs: self.poll_duration_secs,
        }
    }

    pub fn map_size_bytes(&self) -> usize {
        self.map_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            map_size_mb: default_map_size_mb(),
            poll_duration_secs: default_poll_duration_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            creator_cooldown_secs: default_creator_cooldown_secs(),
            store_timeout_ms: default_store_timeout_ms(),
            leaderboard_size: default_leaderboard_size(),
            show_votes_probability: default_show_votes_probability(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            enable_metrics: false,
            guild_id: None,
        }
    }
}
