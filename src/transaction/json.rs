//! JSON form of a transaction
//!
//! Keys are emitted in a fixed order and fields that do not apply to the
//! transaction type are `null`, so the output is stable byte-for-byte.

use super::{AccessListItem, Transaction, TxSignature, TxType};
use crate::primitives::{
    decode_bytes, encode_address, encode_bytes, encode_quantity, encode_u64, parse_address,
    parse_b256, parse_quantity, parse_u64_quantity,
};
use crate::{Error, Result};
use alloy::primitives::{Bytes, U256};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccessListEntryJson {
    address: String,
    storage_keys: Vec<String>,
}

// Field order is the output key order.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TransactionJson {
    #[serde(rename = "type")]
    tx_type: String,
    nonce: String,
    gas_price: Option<String>,
    max_priority_fee_per_gas: Option<String>,
    max_fee_per_gas: Option<String>,
    gas: String,
    value: String,
    input: String,
    v: String,
    r: String,
    s: String,
    to: Option<String>,
    chain_id: Option<String>,
    access_list: Option<Vec<AccessListEntryJson>>,
    hash: Option<String>,
}

fn opt_quantity(value: &Option<U256>) -> Option<String> {
    value.as_ref().map(encode_quantity)
}

fn parse_opt_quantity(value: &Option<String>) -> Result<Option<U256>> {
    value.as_deref().map(parse_quantity).transpose()
}

impl Transaction {
    /// Serialize to the fixed-order JSON form, recomputing `hash`
    pub fn encode_json(&self) -> Result<String> {
        let hash = self.hash()?;

        let (chain_id, access_list) = match self.tx_type {
            TxType::Legacy => {
                let chain_id = (!self.chain_id.is_zero()).then(|| encode_quantity(&self.chain_id));
                (chain_id, None)
            }
            TxType::AccessList | TxType::FeeMarket => {
                let entries = self
                    .access_list
                    .iter()
                    .map(|item| AccessListEntryJson {
                        address: encode_address(&item.address),
                        storage_keys: item
                            .storage_keys
                            .iter()
                            .map(|key| encode_bytes(key.as_slice()))
                            .collect(),
                    })
                    .collect();
                (Some(encode_quantity(&self.chain_id)), Some(entries))
            }
        };

        let json = TransactionJson {
            tx_type: encode_u64(u64::from(self.tx_type.as_u8())),
            nonce: encode_u64(self.nonce),
            gas_price: opt_quantity(&self.gas_price),
            max_priority_fee_per_gas: opt_quantity(&self.max_priority_fee_per_gas),
            max_fee_per_gas: opt_quantity(&self.max_fee_per_gas),
            gas: encode_u64(self.gas),
            value: encode_quantity(&self.value),
            input: encode_bytes(&self.input),
            v: encode_quantity(&self.signature.v),
            r: encode_quantity(&self.signature.r),
            s: encode_quantity(&self.signature.s),
            to: self.to.as_ref().map(encode_address),
            chain_id,
            access_list,
            hash: Some(encode_bytes(hash.as_slice())),
        };

        Ok(serde_json::to_string(&json)?)
    }

    /// Parse the JSON form; a present `hash` must match the decoded fields
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: TransactionJson = serde_json::from_str(json)
            .map_err(|e| Error::malformed(format!("Invalid transaction JSON: {}", e)))?;

        let tx_type = TxType::try_from(parse_u64_quantity(&raw.tx_type)?)?;

        let chain_id = match (&raw.chain_id, tx_type) {
            (Some(chain_id), _) => parse_quantity(chain_id)?,
            (None, TxType::Legacy) => U256::ZERO,
            (None, _) => return Err(Error::malformed("typed transaction requires chainId")),
        };

        let access_list = raw
            .access_list
            .unwrap_or_default()
            .into_iter()
            .map(|entry| {
                Ok(AccessListItem {
                    address: parse_address(&entry.address)?,
                    storage_keys: entry
                        .storage_keys
                        .iter()
                        .map(|key| parse_b256(key))
                        .collect::<Result<_>>()?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let tx = Transaction {
            tx_type,
            nonce: parse_u64_quantity(&raw.nonce)?,
            gas: parse_u64_quantity(&raw.gas)?,
            gas_price: parse_opt_quantity(&raw.gas_price)?,
            max_fee_per_gas: parse_opt_quantity(&raw.max_fee_per_gas)?,
            max_priority_fee_per_gas: parse_opt_quantity(&raw.max_priority_fee_per_gas)?,
            to: raw.to.as_deref().map(parse_address).transpose()?,
            value: parse_quantity(&raw.value)?,
            input: Bytes::from(decode_bytes(&raw.input)?),
            chain_id,
            access_list,
            signature: TxSignature {
                v: parse_quantity(&raw.v)?,
                r: parse_quantity(&raw.r)?,
                s: parse_quantity(&raw.s)?,
            },
        };

        if let Some(expected) = raw.hash.as_deref() {
            let expected = parse_b256(expected)?;
            let actual = tx.hash()?;
            if expected != actual {
                return Err(Error::malformed(format!(
                    "hash mismatch: document says {}, fields hash to {}",
                    expected, actual
                )));
            }
        }
        Ok(tx)
    }
}

#[cfg(test)]
mod tests {
    use super::super::fixtures::*;
    use super::*;
    use crate::wallet::KeyStore;
    use alloy::primitives::{Address, B256};

    const RECEIVER: &str = "0x0c54FcCd2e384b4BB6f2E405Bf5Cbc15a017AaFb";

    #[test]
    fn unsigned_fee_market_json() {
        let tx = Transaction::new(fee_market_request(Some(RECEIVER)));
        let expected = r#"{"type":"0x2","nonce":"0x1","gasPrice":null,"maxPriorityFeePerGas":"0x2540be400","maxFeePerGas":"0x2540be400","gas":"0x5208","value":"0x0","input":"0xa9059cbb000000000000000000000000b008e10e6633befd086028691ecc70648b28868900000000000000000000000000000000000000000000000000b1a2bc2ec50000","v":"0x0","r":"0x0","s":"0x0","to":"0x0c54fccd2e384b4bb6f2e405bf5cbc15a017aafb","chainId":"0x1","accessList":[],"hash":"0xaf85ec87dc6bc9c993bfcfa18692c52adea59cc5503a58443b0d054b8951fc70"}"#;
        assert_eq!(tx.encode_json().unwrap(), expected);
    }

    #[test]
    fn contract_creation_json_has_null_receiver() {
        let tx = Transaction::new(fee_market_request(None));
        let expected = r#"{"type":"0x2","nonce":"0x1","gasPrice":null,"maxPriorityFeePerGas":"0x2540be400","maxFeePerGas":"0x2540be400","gas":"0x5208","value":"0x0","input":"0xa9059cbb000000000000000000000000b008e10e6633befd086028691ecc70648b28868900000000000000000000000000000000000000000000000000b1a2bc2ec50000","v":"0x0","r":"0x0","s":"0x0","to":null,"chainId":"0x1","accessList":[],"hash":"0x47150a651e312339694c605c8b8631be729523e265a4491a539143467afa2528"}"#;
        assert_eq!(tx.encode_json().unwrap(), expected);
    }

    #[test]
    fn encode_json_is_idempotent() {
        let tx = Transaction::new(fee_market_request(Some(RECEIVER)));
        assert_eq!(tx.encode_json().unwrap(), tx.encode_json().unwrap());
    }

    #[test]
    fn signed_transaction_round_trips() {
        let keystore = KeyStore::new();
        let account = keystore.new_account().unwrap();
        keystore.unlock(&account.address).unwrap();

        let mut request = fee_market_request(Some(RECEIVER));
        request.access_list = Some(vec![AccessListItem {
            address: Address::repeat_byte(0x11),
            storage_keys: vec![B256::repeat_byte(0x22), B256::ZERO],
        }]);
        let tx = Transaction::new(request);
        let signed = keystore.sign_tx(&account.address, &tx, U256::from(1)).unwrap();

        let json = signed.encode_json().unwrap();
        assert!(!json.contains(r#""r":"0x0""#));

        let decoded = Transaction::from_json(&json).unwrap();
        assert_eq!(decoded, signed);
        assert_eq!(decoded.encode_json().unwrap(), json);
        assert_eq!(decoded.recover_sender().unwrap(), account.address);
    }

    #[test]
    fn legacy_json_has_null_fee_market_fields() {
        let tx = Transaction::new(super::super::TransactionRequest {
            nonce: 3,
            gas: 21000,
            gas_price: Some(U256::from(1_000_000_000u64)),
            ..Default::default()
        });
        let value: serde_json::Value = serde_json::from_str(&tx.encode_json().unwrap()).unwrap();
        assert_eq!(value["type"], "0x0");
        assert_eq!(value["gasPrice"], "0x3b9aca00");
        assert!(value["maxFeePerGas"].is_null());
        assert!(value["maxPriorityFeePerGas"].is_null());
        assert!(value["accessList"].is_null());
        assert!(value["chainId"].is_null());
        assert_eq!(value["input"], "0x");
    }

    #[test]
    fn malformed_type_cannot_be_encoded() {
        let mut tx = Transaction::new(fee_market_request(Some(RECEIVER)));
        tx.gas_price = Some(U256::from(1));
        assert!(matches!(tx.encode_json(), Err(Error::UnsupportedType(_))));
    }

    #[test]
    fn from_json_rejects_bad_input() {
        let tx = Transaction::new(fee_market_request(Some(RECEIVER)));
        let json = tx.encode_json().unwrap();

        let decimal_nonce = json.replace(r#""nonce":"0x1""#, r#""nonce":"1""#);
        assert!(matches!(
            Transaction::from_json(&decimal_nonce),
            Err(Error::MalformedInput(_))
        ));

        let wrong_hash = json.replace("0xaf85ec87", "0xaf85ec88");
        assert!(matches!(
            Transaction::from_json(&wrong_hash),
            Err(Error::MalformedInput(_))
        ));

        let unknown_type = json.replace(r#""type":"0x2""#, r#""type":"0x7""#);
        assert!(matches!(
            Transaction::from_json(&unknown_type),
            Err(Error::UnsupportedType(_))
        ));
    }
}
