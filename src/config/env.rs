//! Environment configuration
//!
//! Follows the usual Ethereum tooling conventions:
//! - `PRIVATE_KEY`: hex-encoded signing key (with or without 0x)
//! - `CHAIN_ID`: decimal chain id overriding the config file
//!
//! A `.env` file is loaded by the binary before these are read.
//!
//! ```bash
//! export PRIVATE_KEY="0x..."
//! export CHAIN_ID=11155111
//! ```

use crate::{Error, Result};
use secrecy::SecretString;

/// Environment variable names
pub mod env_vars {
    pub const PRIVATE_KEY: &str = "PRIVATE_KEY";
    pub const CHAIN_ID: &str = "CHAIN_ID";
}

/// Signer settings read from the environment
#[derive(Debug, Default)]
pub struct SignerEnv {
    /// Signing key, kept out of Debug output
    pub private_key: Option<SecretString>,
    /// Chain id override
    pub chain_id: Option<u64>,
}

impl SignerEnv {
    /// Read PRIVATE_KEY and CHAIN_ID
    pub fn from_env() -> Result<Self> {
        let private_key = std::env::var(env_vars::PRIVATE_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty())
            .map(SecretString::from);

        let chain_id = match std::env::var(env_vars::CHAIN_ID) {
            Ok(raw) => Some(parse_chain_id(&raw)?),
            Err(_) => None,
        };

        if private_key.is_none() {
            tracing::debug!("No PRIVATE_KEY set - signing commands are unavailable");
        }

        Ok(Self {
            private_key,
            chain_id,
        })
    }
}

fn parse_chain_id(raw: &str) -> Result<u64> {
    raw.trim()
        .parse()
        .map_err(|_| {
            Error::Config(format!(
                "{} must be a decimal integer, got {:?}",
                env_vars::CHAIN_ID,
                raw
            ))
        })
}
