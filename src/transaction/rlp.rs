//! RLP payloads for signing and hashing
//!
//! Legacy: `rlp([nonce, gasPrice, gas, to, value, data, ...])`.
//! Typed: `type ‖ rlp([chainId, nonce, ..., accessList, ...])`.

use super::{AccessListItem, Transaction, TxType};
use crate::Result;
use alloy::primitives::{Address, U256};
use alloy_rlp::{Encodable, Header, EMPTY_STRING_CODE};

fn wrap_list(payload: &[u8], out: &mut Vec<u8>) {
    Header {
        list: true,
        payload_length: payload.len(),
    }
    .encode(out);
    out.extend_from_slice(payload);
}

fn encode_to(to: &Option<Address>, out: &mut Vec<u8>) {
    match to {
        Some(address) => address.encode(out),
        None => out.push(EMPTY_STRING_CODE),
    }
}

fn encode_access_list(items: &[AccessListItem], out: &mut Vec<u8>) {
    let mut entries = Vec::new();
    for item in items {
        let mut keys = Vec::new();
        for key in &item.storage_keys {
            key.encode(&mut keys);
        }

        let mut entry = Vec::new();
        item.address.encode(&mut entry);
        wrap_list(&keys, &mut entry);

        wrap_list(&entry, &mut entries);
    }
    wrap_list(&entries, out);
}

impl Transaction {
    /// Type specific fields, signature excluded
    fn encode_fields(&self, out: &mut Vec<u8>) -> Result<()> {
        self.validate()?;
        let zero = U256::ZERO;

        match self.tx_type {
            TxType::Legacy => {
                self.nonce.encode(out);
                self.gas_price.as_ref().unwrap_or(&zero).encode(out);
                self.gas.encode(out);
                encode_to(&self.to, out);
                self.value.encode(out);
                self.input.encode(out);
            }
            TxType::AccessList => {
                self.chain_id.encode(out);
                self.nonce.encode(out);
                self.gas_price.as_ref().unwrap_or(&zero).encode(out);
                self.gas.encode(out);
                encode_to(&self.to, out);
                self.value.encode(out);
                self.input.encode(out);
                encode_access_list(&self.access_list, out);
            }
            TxType::FeeMarket => {
                self.chain_id.encode(out);
                self.nonce.encode(out);
                self.max_priority_fee_per_gas.as_ref().unwrap_or(&zero).encode(out);
                self.max_fee_per_gas.as_ref().unwrap_or(&zero).encode(out);
                self.gas.encode(out);
                encode_to(&self.to, out);
                self.value.encode(out);
                self.input.encode(out);
                encode_access_list(&self.access_list, out);
            }
        }
        Ok(())
    }

    fn envelope(&self, payload: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(payload.len() + 10);
        if self.tx_type != TxType::Legacy {
            out.push(self.tx_type.as_u8());
        }
        wrap_list(payload, &mut out);
        out
    }

    /// Bytes hashed for the sender's signature
    pub(crate) fn signing_payload(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload)?;

        // EIP-155: chain id and two empty values
        if self.tx_type == TxType::Legacy && !self.chain_id.is_zero() {
            self.chain_id.encode(&mut payload);
            0u8.encode(&mut payload);
            0u8.encode(&mut payload);
        }
        Ok(self.envelope(&payload))
    }

    /// Network encoding with `v, r, s`
    pub fn encoded(&self) -> Result<Vec<u8>> {
        let mut payload = Vec::new();
        self.encode_fields(&mut payload)?;
        self.signature.v.encode(&mut payload);
        self.signature.r.encode(&mut payload);
        self.signature.s.encode(&mut payload);
        Ok(self.envelope(&payload))
    }
}
