//! Error types for typed-data hashing, transaction signing and receipt decoding

use alloy::primitives::Address;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Invalid chain id: {0}")]
    InvalidChainId(String),

    #[error("Unsupported transaction type: {0}")]
    UnsupportedType(String),

    #[error("Account {0} is locked")]
    AccountLocked(Address),

    #[error("Unknown account: {0}")]
    UnknownAccount(Address),

    #[error("Invalid signature length: expected 65 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Signature recovery failed: {0}")]
    RecoveryFailed(String),

    #[error("Wallet error: {0}")]
    Wallet(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for input that failed to parse
    pub(crate) fn malformed(msg: impl Into<String>) -> Self {
        Error::MalformedInput(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
