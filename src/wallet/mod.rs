//! Key management and signing
//!
//! Private keys never leave this module. Callers sign through
//! [`KeyService`], which only ever hands back signatures.

mod keystore;
mod signer;

pub use keystore::{AccountInfo, KeyStore};
pub use signer::SecureWallet;

use crate::Result;
use alloy::primitives::{Address, Signature, B256};

/// Anything that can sign a 32 byte digest on behalf of an account
pub trait KeyService {
    /// Sign `digest` with the key for `account`.
    ///
    /// Fails with `UnknownAccount` when the key is not held and
    /// `AccountLocked` when it is held but unavailable.
    fn sign_digest(&self, account: &Address, digest: &B256) -> Result<Signature>;
}
