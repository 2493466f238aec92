//! Transaction model, signing and recovery
//!
//! A [`Transaction`] is a plain value: signing returns a new value with the
//! signature filled in. Three envelopes are supported:
//! - legacy (`0x0`), EIP-155 replay protected when the chain id is non-zero
//! - access list (`0x1`, EIP-2930)
//! - fee market (`0x2`, EIP-1559)

mod json;
mod rlp;

use crate::wallet::KeyService;
use crate::{Error, Result};
use alloy::primitives::{keccak256, Address, Bytes, Signature, B256, U256};

/// EIP-2718 envelope type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TxType {
    Legacy,
    AccessList,
    FeeMarket,
}

impl TxType {
    pub fn as_u8(self) -> u8 {
        match self {
            TxType::Legacy => 0,
            TxType::AccessList => 1,
            TxType::FeeMarket => 2,
        }
    }
}

impl TryFrom<u64> for TxType {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self> {
        match value {
            0 => Ok(TxType::Legacy),
            1 => Ok(TxType::AccessList),
            2 => Ok(TxType::FeeMarket),
            other => Err(Error::UnsupportedType(format!("type 0x{:x}", other))),
        }
    }
}

/// One access list entry: an address and the storage slots it touches
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AccessListItem {
    pub address: Address,
    pub storage_keys: Vec<B256>,
}

/// `(v, r, s)` as stored on the transaction; all zero until signed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TxSignature {
    pub v: U256,
    pub r: U256,
    pub s: U256,
}

impl TxSignature {
    pub fn is_signed(&self) -> bool {
        !(self.r.is_zero() && self.s.is_zero())
    }
}

/// Inputs for [`Transaction::new`]
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    /// Sender hint; not part of the signed payload
    pub from: Option<Address>,
    /// Receiver, `None` for contract creation
    pub to: Option<Address>,
    pub nonce: u64,
    pub gas: u64,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub value: U256,
    pub chain_id: U256,
    pub input: Bytes,
    pub access_list: Option<Vec<AccessListItem>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub tx_type: TxType,
    pub nonce: u64,
    pub gas: u64,
    pub gas_price: Option<U256>,
    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub to: Option<Address>,
    pub value: U256,
    pub input: Bytes,
    pub chain_id: U256,
    pub access_list: Vec<AccessListItem>,
    pub signature: TxSignature,
}

impl Transaction {
    /// Build an unsigned transaction, inferring its type
    ///
    /// Both fee-market fields make a `0x2` transaction; otherwise an access
    /// list makes a `0x1` transaction; otherwise it is legacy.
    pub fn new(request: TransactionRequest) -> Self {
        let tx_type = if request.max_fee_per_gas.is_some()
            && request.max_priority_fee_per_gas.is_some()
        {
            TxType::FeeMarket
        } else if request.access_list.is_some() {
            TxType::AccessList
        } else {
            TxType::Legacy
        };

        tracing::debug!(
            from = ?request.from,
            to = ?request.to,
            nonce = request.nonce,
            tx_type = ?tx_type,
            "Built transaction"
        );

        Self {
            tx_type,
            nonce: request.nonce,
            gas: request.gas,
            gas_price: request.gas_price,
            max_fee_per_gas: request.max_fee_per_gas,
            max_priority_fee_per_gas: request.max_priority_fee_per_gas,
            to: request.to,
            value: request.value,
            input: request.input,
            chain_id: request.chain_id,
            access_list: request.access_list.unwrap_or_default(),
            signature: TxSignature::default(),
        }
    }

    /// Reject field combinations that do not fit the declared type
    pub fn validate(&self) -> Result<()> {
        let has_fee_cap = self.max_fee_per_gas.is_some();
        let has_tip = self.max_priority_fee_per_gas.is_some();

        match self.tx_type {
            TxType::FeeMarket => {
                if self.gas_price.is_some() {
                    return Err(Error::UnsupportedType(
                        "fee market transaction cannot carry gasPrice".to_string(),
                    ));
                }
                if !(has_fee_cap && has_tip) {
                    return Err(Error::UnsupportedType(
                        "fee market transaction requires maxFeePerGas and maxPriorityFeePerGas"
                            .to_string(),
                    ));
                }
            }
            TxType::Legacy | TxType::AccessList => {
                if has_fee_cap || has_tip {
                    return Err(Error::UnsupportedType(format!(
                        "{:?} transaction cannot carry fee market fields",
                        self.tx_type
                    )));
                }
                if self.gas_price.is_none() {
                    return Err(Error::UnsupportedType(format!(
                        "{:?} transaction requires gasPrice",
                        self.tx_type
                    )));
                }
                if self.tx_type == TxType::Legacy && !self.access_list.is_empty() {
                    return Err(Error::UnsupportedType(
                        "legacy transaction cannot carry an access list".to_string(),
                    ));
                }
            }
        }
        Ok(())
    }

    pub fn is_signed(&self) -> bool {
        self.signature.is_signed()
    }

    /// Digest signed by the sender (excludes the signature)
    pub fn signing_hash(&self) -> Result<B256> {
        Ok(keccak256(self.signing_payload()?))
    }

    /// Transaction hash over the full encoding, signature included
    pub fn hash(&self) -> Result<B256> {
        Ok(keccak256(self.encoded()?))
    }

    /// Copy with the signature replaced
    pub fn with_signature(&self, signature: TxSignature) -> Self {
        Self {
            signature,
            ..self.clone()
        }
    }

    /// y-parity and the chain id the signature commits to
    fn signature_parity(&self) -> Result<(bool, U256)> {
        let v = self.signature.v;
        match self.tx_type {
            TxType::Legacy => {
                if v == U256::from(27) || v == U256::from(28) {
                    return Ok((v == U256::from(28), U256::ZERO));
                }
                let base = self.chain_id * U256::from(2) + U256::from(35);
                if v == base || v == base + U256::from(1) {
                    Ok((v != base, self.chain_id))
                } else {
                    Err(Error::RecoveryFailed(format!(
                        "v {} does not match chain id {}",
                        v, self.chain_id
                    )))
                }
            }
            TxType::AccessList | TxType::FeeMarket => {
                if v <= U256::from(1) {
                    Ok((v == U256::from(1), self.chain_id))
                } else {
                    Err(Error::RecoveryFailed(format!("invalid y-parity {}", v)))
                }
            }
        }
    }

    /// Recover the address that signed this transaction
    pub fn recover_sender(&self) -> Result<Address> {
        if !self.is_signed() {
            return Err(Error::RecoveryFailed("transaction is not signed".to_string()));
        }
        let (parity, chain_id) = self.signature_parity()?;

        let unsigned = Self {
            chain_id,
            signature: TxSignature::default(),
            ..self.clone()
        };
        let hash = unsigned.signing_hash()?;

        Signature::new(self.signature.r, self.signature.s, parity)
            .recover_address_from_prehash(&hash)
            .map_err(|e| Error::RecoveryFailed(e.to_string()))
    }
}

/// Sign `tx` with `account` through a key service
///
/// Legacy transactions adopt `chain_id` for EIP-155; typed transactions must
/// already carry it.
pub fn sign_tx<K: KeyService + ?Sized>(
    keys: &K,
    account: &Address,
    tx: &Transaction,
    chain_id: U256,
) -> Result<Transaction> {
    tx.validate()?;

    let mut unsigned = tx.with_signature(TxSignature::default());
    match tx.tx_type {
        TxType::Legacy => unsigned.chain_id = chain_id,
        TxType::AccessList | TxType::FeeMarket => {
            if tx.chain_id != chain_id {
                return Err(Error::InvalidChainId(format!(
                    "transaction is for chain {}, signer for chain {}",
                    tx.chain_id, chain_id
                )));
            }
        }
    }

    let hash = unsigned.signing_hash()?;
    let signature = keys.sign_digest(account, &hash)?;
    let parity = U256::from(u8::from(signature.v()));

    let v = match tx.tx_type {
        TxType::Legacy if chain_id.is_zero() => U256::from(27) + parity,
        TxType::Legacy => chain_id * U256::from(2) + U256::from(35) + parity,
        TxType::AccessList | TxType::FeeMarket => parity,
    };

    let signed = unsigned.with_signature(TxSignature {
        v,
        r: signature.r(),
        s: signature.s(),
    });

    tracing::info!(
        account = %account,
        tx_type = ?signed.tx_type,
        nonce = signed.nonce,
        hash = %signed.hash()?,
        "Signed transaction"
    );
    Ok(signed)
}
