//! In-memory multi-account key store
//!
//! Every account starts locked. Signing requires an explicit unlock, and
//! locking again makes the key unusable without removing it.

use super::signer::parse_signer;
use super::KeyService;
use crate::personal::text_hash;
use crate::transaction::{self, Transaction};
use crate::{Error, Result};
use alloy::primitives::{Address, Signature, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::SignerSync;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Public view of a stored account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AccountInfo {
    pub id: Uuid,
    pub address: Address,
}

struct Account {
    id: Uuid,
    signer: PrivateKeySigner,
    unlocked: bool,
}

/// Thread-safe set of signing accounts
#[derive(Default)]
pub struct KeyStore {
    accounts: RwLock<HashMap<Address, Account>>,
}

impl KeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Address, Account>>> {
        self.accounts
            .read()
            .map_err(|_| Error::Wallet("key store lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<Address, Account>>> {
        self.accounts
            .write()
            .map_err(|_| Error::Wallet("key store lock poisoned".into()))
    }

    fn insert(&self, signer: PrivateKeySigner) -> Result<AccountInfo> {
        let address = signer.address();
        let mut accounts = self.write()?;
        if let Some(existing) = accounts.get(&address) {
            tracing::debug!(%address, "Account already present");
            return Ok(AccountInfo {
                id: existing.id,
                address,
            });
        }

        let id = Uuid::new_v4();
        accounts.insert(
            address,
            Account {
                id,
                signer,
                unlocked: false,
            },
        );
        tracing::info!(%address, %id, "Added account");
        Ok(AccountInfo { id, address })
    }

    /// Generate a fresh random key
    pub fn new_account(&self) -> Result<AccountInfo> {
        self.insert(PrivateKeySigner::random())
    }

    /// Import a hex private key; importing a known key returns the existing account
    pub fn import_key(&self, key_hex: &str) -> Result<AccountInfo> {
        self.insert(parse_signer(key_hex)?)
    }

    /// All accounts, ordered by address
    pub fn accounts(&self) -> Result<Vec<AccountInfo>> {
        let accounts = self.read()?;
        let mut list: Vec<AccountInfo> = accounts
            .iter()
            .map(|(address, account)| AccountInfo {
                id: account.id,
                address: *address,
            })
            .collect();
        list.sort_by_key(|info| info.address);
        Ok(list)
    }

    pub fn has_address(&self, address: &Address) -> Result<bool> {
        Ok(self.read()?.contains_key(address))
    }

    pub fn unlock(&self, address: &Address) -> Result<()> {
        self.set_unlocked(address, true)
    }

    pub fn lock(&self, address: &Address) -> Result<()> {
        self.set_unlocked(address, false)
    }

    fn set_unlocked(&self, address: &Address, unlocked: bool) -> Result<()> {
        let mut accounts = self.write()?;
        let account = accounts
            .get_mut(address)
            .ok_or(Error::UnknownAccount(*address))?;
        account.unlocked = unlocked;
        tracing::debug!(%address, unlocked, "Account lock state changed");
        Ok(())
    }

    /// Sign a raw digest with an unlocked account
    pub fn sign_hash(&self, address: &Address, hash: &B256) -> Result<Signature> {
        let accounts = self.read()?;
        let account = accounts
            .get(address)
            .ok_or(Error::UnknownAccount(*address))?;
        if !account.unlocked {
            return Err(Error::AccountLocked(*address));
        }
        account
            .signer
            .sign_hash_sync(hash)
            .map_err(|e| Error::Wallet(format!("Signing failed: {}", e)))
    }

    /// Sign a transaction for `chain_id`
    pub fn sign_tx(&self, address: &Address, tx: &Transaction, chain_id: U256) -> Result<Transaction> {
        transaction::sign_tx(self, address, tx, chain_id)
    }

    /// `personal_sign` a message
    pub fn sign_text(&self, address: &Address, message: &[u8]) -> Result<Signature> {
        self.sign_hash(address, &text_hash(message))
    }
}

impl KeyService for KeyStore {
    fn sign_digest(&self, account: &Address, digest: &B256) -> Result<Signature> {
        self.sign_hash(account, digest)
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.accounts.read().map(|a| a.len()).unwrap_or_default();
        f.debug_struct("KeyStore")
            .field("accounts", &count)
            .field("keys", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::personal::{personal_ec_recover, signature_to_bytes};
    use alloy::primitives::address;
    use std::sync::Arc;
    use std::thread;

    const TEST_KEY: &str = "289c2857d4598e37fb9647507e47a309d6133539bf21a8b9cb6df88fd5232032";

    #[test]
    fn new_accounts_start_locked() {
        let keystore = KeyStore::new();
        let account = keystore.new_account().unwrap();

        assert!(keystore.has_address(&account.address).unwrap());
        assert!(matches!(
            keystore.sign_hash(&account.address, &B256::ZERO),
            Err(Error::AccountLocked(_))
        ));

        keystore.unlock(&account.address).unwrap();
        assert!(keystore.sign_hash(&account.address, &B256::ZERO).is_ok());

        keystore.lock(&account.address).unwrap();
        assert!(matches!(
            keystore.sign_hash(&account.address, &B256::ZERO),
            Err(Error::AccountLocked(_))
        ));
    }

    #[test]
    fn import_is_idempotent() {
        let keystore = KeyStore::new();
        let first = keystore.import_key(TEST_KEY).unwrap();
        let second = keystore.import_key(&format!("0x{}", TEST_KEY)).unwrap();

        assert_eq!(first, second);
        assert_eq!(
            first.address,
            address!("970e8128ab834e8eac17ab8e3812f010678cf791")
        );
        assert_eq!(keystore.accounts().unwrap().len(), 1);
    }

    #[test]
    fn unknown_account_is_reported() {
        let keystore = KeyStore::new();
        let missing = Address::repeat_byte(0x33);

        assert!(!keystore.has_address(&missing).unwrap());
        assert!(matches!(keystore.unlock(&missing), Err(Error::UnknownAccount(_))));
        assert!(matches!(
            keystore.sign_text(&missing, b"foo"),
            Err(Error::UnknownAccount(addr)) if addr == missing
        ));
    }

    #[test]
    fn sign_text_recovers_to_account() {
        let keystore = KeyStore::new();
        let account = keystore.import_key(TEST_KEY).unwrap();
        keystore.unlock(&account.address).unwrap();

        let signature = keystore.sign_text(&account.address, b"foo").unwrap();
        let recovered = personal_ec_recover(b"foo", &signature_to_bytes(&signature)).unwrap();
        assert_eq!(recovered, account.address);
    }

    #[test]
    fn accounts_are_sorted_by_address() {
        let keystore = KeyStore::new();
        for _ in 0..5 {
            keystore.new_account().unwrap();
        }
        let accounts = keystore.accounts().unwrap();
        assert_eq!(accounts.len(), 5);
        assert!(accounts.windows(2).all(|w| w[0].address < w[1].address));
    }

    #[test]
    fn concurrent_signing() {
        let keystore = Arc::new(KeyStore::new());
        let account = keystore.new_account().unwrap();
        keystore.unlock(&account.address).unwrap();

        let handles: Vec<_> = (0..4u8)
            .map(|i| {
                let keystore = Arc::clone(&keystore);
                thread::spawn(move || {
                    let digest = B256::repeat_byte(i);
                    let signature = keystore.sign_hash(&account.address, &digest).unwrap();
                    signature.recover_address_from_prehash(&digest).unwrap()
                })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.join().unwrap(), account.address);
        }
    }

    #[test]
    fn debug_does_not_leak_keys() {
        let keystore = KeyStore::new();
        keystore.import_key(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", keystore);
        assert!(!debug_str.contains("289c2857"));
        assert!(debug_str.contains("accounts: 1"));
    }
}
