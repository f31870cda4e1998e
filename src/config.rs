//! Configuration for the orchestration layer
//!
//! Loaded from TOML with `LEDGER_ORCH_*` environment overrides. The governing
//! protocol chunk limit lives here as data, not in the chunking algorithm.

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    #[serde(default)]
    pub batch: BatchConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub monitoring: MonitoringConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Maximum items per sub-transaction imposed by the ledger protocol
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default `tracing` level when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringConfig {
    /// Dump Prometheus metrics when the harness exits
    #[serde(default = "default_true")]
    pub enable_metrics: bool,
}

// Default value functions
fn default_max_chunk_size() -> usize {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_chunk_size: default_max_chunk_size(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            enable_metrics: default_true(),
        }
    }
}

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl OrchestratorConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        Ok(config)
    }

    /// Load from file, apply environment overrides, validate
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `LEDGER_ORCH_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        if let Ok(size) = std::env::var("LEDGER_ORCH_MAX_CHUNK_SIZE") {
            self.batch.max_chunk_size = size
                .parse()
                .map_err(|e| anyhow!("Invalid LEDGER_ORCH_MAX_CHUNK_SIZE: {}", e))?;
        }

        if let Ok(level) = std::env::var("LEDGER_ORCH_LOG_LEVEL") {
            self.logging.level = level;
        }

        if let Ok(json) = std::env::var("LEDGER_ORCH_LOG_JSON") {
            self.logging.json = json
                .parse()
                .map_err(|e| anyhow!("Invalid LEDGER_ORCH_LOG_JSON: {}", e))?;
        }

        if let Ok(enabled) = std::env::var("LEDGER_ORCH_ENABLE_METRICS") {
            self.monitoring.enable_metrics = enabled
                .parse()
                .map_err(|e| anyhow!("Invalid LEDGER_ORCH_ENABLE_METRICS: {}", e))?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch.max_chunk_size == 0 {
            return Err(anyhow!("batch.max_chunk_size must be > 0"));
        }
        if !LOG_LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(anyhow!(
                "logging.level must be one of {:?}, got {:?}",
                LOG_LEVELS,
                self.logging.level
            ));
        }
        Ok(())
    }
}
