//! Deployment and logging configuration

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::types::{LedgerError, LedgerResult};

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct OptioConfig {
    pub ledger: LedgerSection,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Constructor arguments of the ledger
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LedgerSection {
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for OptioConfig {
    fn default() -> Self {
        Self {
            ledger: LedgerSection {
                name: "Optio".to_string(),
                symbol: "ETH".to_string(),
            },
            logging: LoggingConfig::default(),
        }
    }
}

impl OptioConfig {
    pub fn from_toml_str(text: &str) -> LedgerResult<Self> {
        toml::from_str(text).map_err(|e| LedgerError::Config(format!("invalid config: {}", e)))
    }

    pub fn to_toml_string(&self) -> LedgerResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| LedgerError::Config(format!("cannot serialize config: {}", e)))
    }

    /// Read a config file
    pub fn load(path: impl AsRef<Path>) -> LedgerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            LedgerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&text)?;
        info!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it is missing or invalid
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(error) => {
                warn!(%error, "using default config");
                Self::default()
            }
        }
    }

    /// Install a global `fmt` subscriber filtered by `RUST_LOG` or the
    /// configured level
    pub fn init_tracing(&self) -> LedgerResult<()> {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.logging.level))
            .map_err(|e| {
                LedgerError::Config(format!("invalid log level '{}': {}", self.logging.level, e))
            })?;

        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .try_init()
            .map_err(|e| LedgerError::Config(format!("cannot install subscriber: {}", e)))
    }
}
