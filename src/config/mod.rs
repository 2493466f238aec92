//! Configuration for the signer CLI and library defaults

pub mod env;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub use env::SignerEnv;

/// Typed-data parsing options
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedDataSettings {
    /// Accept `"chainId": "0x1"` in the domain (decimal strings and integers are always accepted)
    #[serde(default)]
    pub accept_hex_chain_id: bool,
}

/// Logging output settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSettings {
    /// Default filter directive when `--verbose` is not given
    pub level: String,
    /// Emit JSON lines instead of human readable output
    #[serde(default)]
    pub json: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Main configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Chain id used when signing, unless overridden by CHAIN_ID
    pub chain_id: u64,
    /// Typed-data settings
    #[serde(default)]
    pub typed_data: TypedDataSettings,
    /// Logging settings
    #[serde(default)]
    pub logging: LogSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            chain_id: 1, // Ethereum mainnet
            typed_data: TypedDataSettings::default(),
            logging: LogSettings::default(),
        }
    }
}

impl Config {
    /// Load a JSON config file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&content).map_err(|e| Error::Config(e.to_string()))
    }

    /// Apply environment overrides
    pub fn with_env(mut self, env: &SignerEnv) -> Self {
        if let Some(chain_id) = env.chain_id {
            tracing::debug!(chain_id, "Using CHAIN_ID from environment");
            self.chain_id = chain_id;
        }
        self
    }
}
