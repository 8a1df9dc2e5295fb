//! Configuration management for PeerVault
//!
//! Environment-based configuration with defaults, TOML file support and
//! validation. Environment variables follow the pattern
//! `PEERVAULT_<SECTION>_<KEY>` and override file values.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Main node configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Node identity and cadence
    pub node: NodeConfig,

    /// Storage engine and worker pool
    pub storage: StorageConfig,

    /// Capacity allocation policy inputs
    pub allocation: AllocationConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Node identity and control-loop cadence
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeConfig {
    /// Identity of this node, used to derive per-peer table names
    pub local_id: String,

    /// Wall-clock interval between control-loop ticks
    #[serde(with = "humantime_serde")]
    pub tick_interval: Duration,

    /// Number of ticks between reallocations
    pub steps_per_reallocate: u64,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for per-peer table files
    pub data_root: PathBuf,

    /// Number of request-serving workers, each owning its own handles
    pub request_workers: usize,

    /// Concurrent provisioning tasks during generate
    pub generate_workers: usize,
}

/// Allocation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AllocationConfig {
    /// Total byte budget split across the peer set
    pub budget_bytes: u64,

    /// Fraction of the budget actually filled, in (0, 1]
    pub threshold: f64,

    /// Destructively reinitialize all peer tables at startup
    pub restart: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeConfig::default(),
            storage: StorageConfig::default(),
            allocation: AllocationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            local_id: "peervault-node".to_string(),
            tick_interval: Duration::from_secs(1),
            steps_per_reallocate: 1000,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./peervault-db"),
            request_workers: 4,
            generate_workers: 10,
        }
    }
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            budget_bytes: 1024 * 1024 * 1024, // 1 GiB
            threshold: 0.001,
            restart: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_target: true,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Example: `PEERVAULT_STORAGE_DATA_ROOT=/var/lib/peervault`
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file, then apply env overrides
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError(e.to_string()))?;

        let mut config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Ok(local_id) = env::var("PEERVAULT_NODE_LOCAL_ID") {
            self.node.local_id = local_id;
        }
        if let Ok(steps) = env::var("PEERVAULT_NODE_STEPS_PER_REALLOCATE") {
            self.node.steps_per_reallocate = steps.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid steps_per_reallocate: {}", e))
            })?;
        }
        if let Ok(data_root) = env::var("PEERVAULT_STORAGE_DATA_ROOT") {
            self.storage.data_root = PathBuf::from(data_root);
        }
        if let Ok(workers) = env::var("PEERVAULT_STORAGE_REQUEST_WORKERS") {
            self.storage.request_workers = workers.parse().map_err(|e| {
                ConfigError::InvalidValue(format!("Invalid request_workers: {}", e))
            })?;
        }
        if let Ok(budget) = env::var("PEERVAULT_ALLOCATION_BUDGET_BYTES") {
            self.allocation.budget_bytes = budget
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid budget_bytes: {}", e)))?;
        }
        if let Ok(threshold) = env::var("PEERVAULT_ALLOCATION_THRESHOLD") {
            self.allocation.threshold = threshold
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid threshold: {}", e)))?;
        }
        if let Ok(level) = env::var("PEERVAULT_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Ok(json) = env::var("PEERVAULT_LOG_JSON") {
            self.logging.json_format = json
                .parse()
                .map_err(|e| ConfigError::InvalidValue(format!("Invalid JSON flag: {}", e)))?;
        }
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.local_id.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "local_id must not be empty".to_string(),
            ));
        }

        if self.node.steps_per_reallocate == 0 {
            return Err(ConfigError::ValidationFailed(
                "steps_per_reallocate must be greater than 0".to_string(),
            ));
        }

        if self.node.tick_interval.is_zero() {
            return Err(ConfigError::ValidationFailed(
                "tick_interval must be greater than zero".to_string(),
            ));
        }

        if self.storage.request_workers == 0 {
            return Err(ConfigError::ValidationFailed(
                "request_workers must be greater than 0".to_string(),
            ));
        }

        if self.storage.generate_workers == 0 {
            return Err(ConfigError::ValidationFailed(
                "generate_workers must be greater than 0".to_string(),
            ));
        }

        if !(self.allocation.threshold > 0.0 && self.allocation.threshold <= 1.0) {
            return Err(ConfigError::ValidationFailed(format!(
                "threshold must be in (0, 1], got {}",
                self.allocation.threshold
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::ValidationFailed(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let contents =
            toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

        std::fs::write(path, contents).map_err(|e| ConfigError::FileWriteError(e.to_string()))?;

        Ok(())
    }
}
