//! Single-key wallet
//!
//! SECURITY: the key lives only inside alloy's PrivateKeySigner.
//! - Keys are never serialized
//! - Keys are never logged
//! - Debug output is redacted

use super::KeyService;
use crate::config::env::{env_vars, SignerEnv};
use crate::{Error, Result};
use alloy::primitives::{Address, Signature, B256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use secrecy::ExposeSecret;

/// Parse a hex private key, with or without `0x`
pub(crate) fn parse_signer(key_hex: &str) -> Result<PrivateKeySigner> {
    let key_hex = key_hex.trim();
    let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

    key_hex
        .parse()
        .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))
}

/// Wallet holding exactly one always-available key
pub struct SecureWallet {
    signer: PrivateKeySigner,
    /// Public address (safe to expose)
    address: Address,
}

impl SecureWallet {
    /// Create a wallet from the `PRIVATE_KEY` read into `env`
    pub fn from_env(env: &SignerEnv) -> Result<Self> {
        let key = env.private_key.as_ref().ok_or_else(|| {
            Error::Wallet(format!(
                "{} not set. Required for signing.",
                env_vars::PRIVATE_KEY
            ))
        })?;

        Self::from_hex(key.expose_secret())
    }

    /// Create a wallet from a hex-encoded private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        let signer = parse_signer(key_hex)?;
        let address = signer.address();
        Ok(Self { signer, address })
    }

    /// Get the public address (safe to share)
    pub fn address(&self) -> Address {
        self.address
    }

    /// Get the address as a checksummed string
    pub fn address_string(&self) -> String {
        self.address.to_checksum(None)
    }

    /// Sign a 32 byte digest
    pub fn sign_hash(&self, hash: &B256) -> Result<Signature> {
        self.signer
            .sign_hash_sync(hash)
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))
    }
}

impl KeyService for SecureWallet {
    fn sign_digest(&self, account: &Address, digest: &B256) -> Result<Signature> {
        if *account != self.address {
            return Err(Error::UnknownAccount(*account));
        }
        self.sign_hash(digest)
    }
}

impl std::fmt::Debug for SecureWallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecureWallet")
            .field("address", &self.address)
            .field("signer", &"[REDACTED]")
            .finish()
    }
}
