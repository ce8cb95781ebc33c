//! Configuration for distribution rounds.
//!
//! `EngineConfig::load` reads a TOML file, falling back to the embedded
//! `config/default.toml` when the file does not exist. Runtime settings can be
//! overridden from the environment; pool amounts cannot, they come from the
//! sponsor list only.

use crate::boost::DEFAULT_BOOST_FACTOR;
use crate::error::{Result, RewardsError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

pub const DEFAULT_RANK_THRESHOLD: u32 = 200;

const EMBEDDED_DEFAULT: &str = include_str!("../config/default.toml");

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SponsorContribution {
    pub sponsor: String,
    pub amount: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardsConfig {
    #[serde(default = "default_boost_factor")]
    pub boost_factor: f64,
    #[serde(default = "default_rank_threshold")]
    pub rank_threshold: u32,
    /// The pool for a round is the sum of these amounts.
    pub sponsors: Vec<SponsorContribution>,
}

fn default_boost_factor() -> f64 {
    DEFAULT_BOOST_FACTOR
}

fn default_rank_threshold() -> u32 {
    DEFAULT_RANK_THRESHOLD
}

impl Default for RewardsConfig {
    fn default() -> Self {
        Self {
            boost_factor: DEFAULT_BOOST_FACTOR,
            rank_threshold: DEFAULT_RANK_THRESHOLD,
            sponsors: Vec::new(),
        }
    }
}

impl RewardsConfig {
    /// Single-sponsor configuration for callers that only know the pool total.
    pub fn with_total_pool(total_pool: f64) -> Self {
        Self {
            sponsors: vec![SponsorContribution {
                sponsor: "pool".to_string(),
                amount: total_pool,
            }],
            ..Self::default()
        }
    }

    pub fn total_pool(&self) -> f64 {
        self.sponsors.iter().map(|s| s.amount).sum()
    }

    pub fn is_eligible(&self, rank: Option<u32>) -> bool {
        matches!(rank, Some(r) if r >= 1 && r <= self.rank_threshold)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.boost_factor.is_finite() || self.boost_factor < 1.0 {
            return Err(RewardsError::InvalidConfiguration(format!(
                "boost_factor must be a finite number >= 1.0, got {}",
                self.boost_factor
            )));
        }

        if self.rank_threshold == 0 {
            return Err(RewardsError::InvalidConfiguration(
                "rank_threshold must be at least 1".to_string(),
            ));
        }

        for sponsor in &self.sponsors {
            if !sponsor.amount.is_finite() || sponsor.amount < 0.0 {
                return Err(RewardsError::InvalidConfiguration(format!(
                    "sponsor '{}' has invalid amount {}",
                    sponsor.sponsor, sponsor.amount
                )));
            }
        }

        let total = self.total_pool();
        if !total.is_finite() || total <= 0.0 {
            return Err(RewardsError::InvalidConfiguration(format!(
                "total pool must be positive, got {}",
                total
            )));
        }

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageConfig {
    /// `memory` or `rocksdb`
    pub backend: String,
    #[serde(default)]
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: "memory".to_string(),
            path: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    /// `pretty`, `compact` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: default_log_format(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub rewards: RewardsConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let contents = if path.exists() {
            info!(path = %path.display(), "Loading rewards configuration from file");
            std::fs::read_to_string(path).map_err(|source| RewardsError::ConfigIo {
                path: path.display().to_string(),
                source,
            })?
        } else {
            info!(path = %path.display(), "Configuration file not found, using embedded defaults");
            EMBEDDED_DEFAULT.to_string()
        };

        let mut config = Self::from_toml_str(&contents)?;
        config.apply_env_overrides();
        config.validate()?;

        info!(
            total_pool = config.rewards.total_pool(),
            sponsors = config.rewards.sponsors.len(),
            boost_factor = config.rewards.boost_factor,
            rank_threshold = config.rewards.rank_threshold,
            backend = %config.storage.backend,
            "⚙️ Rewards configuration loaded"
        );

        Ok(config)
    }

    pub fn embedded_default() -> Result<Self> {
        Self::from_toml_str(EMBEDDED_DEFAULT)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("REWARDS_BOOST_FACTOR") {
            match value.parse::<f64>() {
                Ok(factor) => {
                    info!(
                        old = self.rewards.boost_factor,
                        new = factor,
                        "Overriding boost factor from environment"
                    );
                    self.rewards.boost_factor = factor;
                }
                Err(_) => warn!(value = %value, "Ignoring unparseable REWARDS_BOOST_FACTOR"),
            }
        }

        if let Ok(value) = std::env::var("REWARDS_RANK_THRESHOLD") {
            match value.parse::<u32>() {
                Ok(threshold) => {
                    info!(
                        old = self.rewards.rank_threshold,
                        new = threshold,
                        "Overriding rank threshold from environment"
                    );
                    self.rewards.rank_threshold = threshold;
                }
                Err(_) => warn!(value = %value, "Ignoring unparseable REWARDS_RANK_THRESHOLD"),
            }
        }

        if let Ok(backend) = std::env::var("REWARDS_STORAGE_BACKEND") {
            info!(
                old = %self.storage.backend,
                new = %backend,
                "Overriding storage backend from environment"
            );
            self.storage.backend = backend;
        }

        if let Ok(path) = std::env::var("REWARDS_STORAGE_PATH") {
            info!(
                old = %self.storage.path,
                new = %path,
                "Overriding storage path from environment"
            );
            self.storage.path = path;
        }

        if let Ok(level) = std::env::var("LOG_LEVEL") {
            info!(old = %self.logging.level, new = %level, "Overriding log level from environment");
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.rewards.validate()?;

        match self.storage.backend.as_str() {
            "memory" => {}
            "rocksdb" => {
                if self.storage.path.is_empty() {
                    return Err(RewardsError::InvalidConfiguration(
                        "rocksdb backend requires a storage path".to_string(),
                    ));
                }
            }
            other => {
                return Err(RewardsError::InvalidConfiguration(format!(
                    "unknown storage backend '{}', expected memory or rocksdb",
                    other
                )));
            }
        }

        match self.logging.format.as_str() {
            "pretty" | "compact" | "json" => Ok(()),
            other => Err(RewardsError::InvalidConfiguration(format!(
                "unknown log format '{}'",
                other
            ))),
        }
    }
}
