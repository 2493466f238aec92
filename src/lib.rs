//! Ethereum signing primitives for mobile and command line clients
//!
//! - EIP-712 typed-data hashing driven by the declared types
//! - Legacy, access-list and fee-market transactions with RLP hashing,
//!   signing and a stable JSON form
//! - Receipt and log decoding with lossless re-encoding
//! - `personal_sign` recovery
//!
//! # Security Model
//!
//! - Private keys never leave the `wallet` module
//! - Signing goes through [`KeyService`], which only returns signatures
//! - Keys are never logged or serialized

pub mod config;
pub mod personal;
pub mod primitives;
pub mod receipt;
pub mod transaction;
pub mod typed_data;
pub mod wallet;

mod error;

// Re-export commonly used types
pub use config::{Config, SignerEnv, TypedDataSettings};
pub use error::{Error, Result};
pub use personal::{personal_ec_recover, text_hash};
pub use primitives::BigInt;
pub use receipt::{Log, Receipt};
pub use transaction::{sign_tx, Transaction, TransactionRequest, TxType};
pub use typed_data::{hash_typed_data, hash_typed_data_with, TypedData};
pub use wallet::{KeyService, KeyStore, SecureWallet};
