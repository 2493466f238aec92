//! Transaction receipts and event logs
//!
//! Decoding is strict: every numeric field must be a `0x` hex quantity and
//! every hash must have its full width. Encoding writes keys in a fixed
//! order so that a decoded receipt re-encodes to the same document.

use crate::primitives::{
    decode_bytes, encode_address, encode_bytes, encode_quantity, encode_u64, parse_address,
    parse_b256, parse_quantity, parse_u64_quantity,
};
use crate::{Error, Result};
use alloy::primitives::{Address, Bloom, BloomInput, Bytes, B256, U256};
use serde::{Deserialize, Serialize};

const BLOOM_BYTES: usize = 256;

/// Event emitted during execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Log {
    pub address: Address,
    pub topics: Vec<B256>,
    pub data: Bytes,
    pub block_number: u64,
    pub transaction_hash: B256,
    pub transaction_index: u64,
    pub block_hash: B256,
    pub log_index: u64,
    /// Set when the log was dropped by a chain reorganisation
    pub removed: bool,
}

impl Log {
    /// Whether `bloom` may contain this log's address and topics
    pub fn matches_bloom(&self, bloom: &Bloom) -> bool {
        bloom.contains_input(BloomInput::Raw(self.address.as_slice()))
            && self
                .topics
                .iter()
                .all(|topic| bloom.contains_input(BloomInput::Raw(topic.as_slice())))
    }
}

/// Result of executing a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub tx_type: u64,
    /// Post-state root (pre-Byzantium receipts)
    pub root: Option<B256>,
    /// 1 for success, 0 for failure
    pub status: Option<u64>,
    pub cumulative_gas_used: u64,
    pub logs_bloom: Bloom,
    pub logs: Vec<Log>,
    pub transaction_hash: B256,
    pub contract_address: Option<Address>,
    pub gas_used: u64,
    pub effective_gas_price: Option<U256>,
    pub block_hash: Option<B256>,
    pub block_number: Option<U256>,
    pub transaction_index: u64,
    pub from: Option<Address>,
    pub to: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LogJson {
    address: String,
    topics: Vec<String>,
    data: String,
    #[serde(default)]
    block_number: Option<String>,
    transaction_hash: String,
    #[serde(default)]
    transaction_index: Option<String>,
    #[serde(default)]
    block_hash: Option<String>,
    #[serde(default)]
    log_index: Option<String>,
    #[serde(default)]
    removed: bool,
}

// Field order is the output key order.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReceiptJson {
    #[serde(rename = "type", default)]
    tx_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    root: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status: Option<String>,
    cumulative_gas_used: String,
    logs_bloom: String,
    logs: Vec<LogJson>,
    transaction_hash: String,
    #[serde(default)]
    contract_address: Option<String>,
    gas_used: String,
    #[serde(default)]
    effective_gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    block_number: Option<String>,
    transaction_index: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    from: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    to: Option<String>,
}

fn parse_u64_or_zero(value: &Option<String>) -> Result<u64> {
    value.as_deref().map(parse_u64_quantity).unwrap_or(Ok(0))
}

fn parse_bloom(input: &str) -> Result<Bloom> {
    let bytes = decode_bytes(input)?;
    if bytes.len() != BLOOM_BYTES {
        return Err(Error::malformed(format!(
            "logsBloom must be {} bytes, got {}",
            BLOOM_BYTES,
            bytes.len()
        )));
    }
    Ok(Bloom::from_slice(&bytes))
}

impl TryFrom<LogJson> for Log {
    type Error = Error;

    fn try_from(raw: LogJson) -> Result<Self> {
        Ok(Log {
            address: parse_address(&raw.address)?,
            topics: raw
                .topics
                .iter()
                .map(|topic| parse_b256(topic))
                .collect::<Result<_>>()?,
            data: Bytes::from(decode_bytes(&raw.data)?),
            block_number: parse_u64_or_zero(&raw.block_number)?,
            transaction_hash: parse_b256(&raw.transaction_hash)?,
            transaction_index: parse_u64_or_zero(&raw.transaction_index)?,
            block_hash: raw
                .block_hash
                .as_deref()
                .map(parse_b256)
                .transpose()?
                .unwrap_or_default(),
            log_index: parse_u64_or_zero(&raw.log_index)?,
            removed: raw.removed,
        })
    }
}

impl From<&Log> for LogJson {
    fn from(log: &Log) -> Self {
        LogJson {
            address: encode_address(&log.address),
            topics: log
                .topics
                .iter()
                .map(|topic| encode_bytes(topic.as_slice()))
                .collect(),
            data: encode_bytes(&log.data),
            block_number: Some(encode_u64(log.block_number)),
            transaction_hash: encode_bytes(log.transaction_hash.as_slice()),
            transaction_index: Some(encode_u64(log.transaction_index)),
            block_hash: Some(encode_bytes(log.block_hash.as_slice())),
            log_index: Some(encode_u64(log.log_index)),
            removed: log.removed,
        }
    }
}

impl Receipt {
    /// Decode a receipt as returned by `eth_getTransactionReceipt`
    pub fn from_json(json: &str) -> Result<Self> {
        let raw: ReceiptJson = serde_json::from_str(json)
            .map_err(|e| Error::malformed(format!("Invalid receipt JSON: {}", e)))?;

        let root = raw.root.as_deref().map(parse_b256).transpose()?;
        let status = raw.status.as_deref().map(parse_u64_quantity).transpose()?;
        match (&root, &status) {
            (None, None) => return Err(Error::malformed("receipt needs either root or status")),
            (Some(_), Some(_)) => {
                return Err(Error::malformed("receipt has both root and status"))
            }
            _ => {}
        }

        let logs = raw
            .logs
            .into_iter()
            .map(Log::try_from)
            .collect::<Result<Vec<_>>>()?;

        let receipt = Receipt {
            tx_type: parse_u64_or_zero(&raw.tx_type)?,
            root,
            status,
            cumulative_gas_used: parse_u64_quantity(&raw.cumulative_gas_used)?,
            logs_bloom: parse_bloom(&raw.logs_bloom)?,
            logs,
            transaction_hash: parse_b256(&raw.transaction_hash)?,
            contract_address: raw.contract_address.as_deref().map(parse_address).transpose()?,
            gas_used: parse_u64_quantity(&raw.gas_used)?,
            effective_gas_price: raw
                .effective_gas_price
                .as_deref()
                .map(parse_quantity)
                .transpose()?,
            block_hash: raw.block_hash.as_deref().map(parse_b256).transpose()?,
            block_number: raw.block_number.as_deref().map(parse_quantity).transpose()?,
            transaction_index: parse_u64_quantity(&raw.transaction_index)?,
            from: raw.from.as_deref().map(parse_address).transpose()?,
            to: raw.to.as_deref().map(parse_address).transpose()?,
        };

        tracing::debug!(
            tx_hash = %receipt.transaction_hash,
            logs = receipt.logs.len(),
            "Decoded receipt"
        );
        Ok(receipt)
    }

    /// Encode with the canonical key order
    pub fn encode_json(&self) -> Result<String> {
        let json = ReceiptJson {
            tx_type: Some(encode_u64(self.tx_type)),
            root: self.root.map(|root| encode_bytes(root.as_slice())),
            status: self.status.map(encode_u64),
            cumulative_gas_used: encode_u64(self.cumulative_gas_used),
            logs_bloom: encode_bytes(self.logs_bloom.as_slice()),
            logs: self.logs.iter().map(LogJson::from).collect(),
            transaction_hash: encode_bytes(self.transaction_hash.as_slice()),
            contract_address: self.contract_address.as_ref().map(encode_address),
            gas_used: encode_u64(self.gas_used),
            effective_gas_price: self.effective_gas_price.as_ref().map(encode_quantity),
            block_hash: self.block_hash.map(|hash| encode_bytes(hash.as_slice())),
            block_number: self.block_number.as_ref().map(encode_quantity),
            transaction_index: encode_u64(self.transaction_index),
            from: self.from.as_ref().map(encode_address),
            to: self.to.as_ref().map(encode_address),
        };
        Ok(serde_json::to_string(&json)?)
    }

    /// True for a post-Byzantium receipt with status 1
    pub fn succeeded(&self) -> bool {
        self.status == Some(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    const RECEIPT: &str = include_str!("../testdata/receipt.json");

    #[test]
    fn decodes_receipt_with_seven_logs() {
        let receipt = Receipt::from_json(RECEIPT).unwrap();

        assert_eq!(receipt.tx_type, 0);
        assert_eq!(receipt.status, Some(1));
        assert!(receipt.succeeded());
        assert_eq!(receipt.root, None);
        assert_eq!(receipt.contract_address, None);
        assert_eq!(receipt.gas_used, 0x31f7c);
        assert_eq!(receipt.cumulative_gas_used, 0xadf850);
        assert_eq!(receipt.transaction_index, 0x40);
        assert_eq!(receipt.block_number, Some(U256::from(0xa044e4u64)));
        assert_eq!(receipt.effective_gas_price, Some(U256::from(0x3b9af54cu64)));

        assert_eq!(receipt.logs.len(), 7);
        let indexes: Vec<u64> = receipt.logs.iter().map(|log| log.log_index).collect();
        assert_eq!(indexes, vec![0x71, 0x72, 0x73, 0x74, 0x75, 0x76, 0x77]);
        assert_eq!(receipt.logs[4].topics.len(), 4);
        assert!(receipt.logs.iter().all(|log| !log.removed));
    }

    #[test]
    fn round_trip_preserves_every_field() {
        let receipt = Receipt::from_json(RECEIPT).unwrap();
        let encoded = receipt.encode_json().unwrap();

        let original: Value = serde_json::from_str(RECEIPT).unwrap();
        let reencoded: Value = serde_json::from_str(&encoded).unwrap();
        assert_eq!(original, reencoded);

        assert_eq!(Receipt::from_json(&encoded).unwrap(), receipt);
    }

    #[test]
    fn encoding_uses_fixed_key_order() {
        let receipt = Receipt::from_json(RECEIPT).unwrap();
        let encoded = receipt.encode_json().unwrap();

        assert!(encoded.starts_with(r#"{"type":"0x0","status":"0x1","cumulativeGasUsed":"0xadf850","logsBloom":"0x"#));
        assert!(encoded.ends_with(r#""transactionIndex":"0x40","from":"0xb008e10e6633befd086028691ecc70648b288689","to":"0xd4a57a3bd3657d0d46b4c5bac12b3f156b9b886b"}"#));
        assert!(encoded.contains(r#"{"address":"0xd4a57a3bd3657d0d46b4c5bac12b3f156b9b886b","topics":["#));
        assert!(encoded.contains(r#""logIndex":"0x71","removed":false}"#));
    }

    #[test]
    fn logs_are_covered_by_receipt_bloom() {
        let receipt = Receipt::from_json(RECEIPT).unwrap();
        assert!(receipt
            .logs
            .iter()
            .all(|log| log.matches_bloom(&receipt.logs_bloom)));
        assert!(!receipt.logs[0].matches_bloom(&Bloom::ZERO));
    }

    #[test]
    fn decimal_quantities_are_rejected() {
        let bad = RECEIPT.replace(r#""gasUsed":"0x31f7c""#, r#""gasUsed":"204668""#);
        assert!(matches!(
            Receipt::from_json(&bad),
            Err(Error::MalformedInput(_))
        ));

        let underscored = RECEIPT.replace(r#""gasUsed":"0x31f7c""#, r#""gasUsed":"0x31_f7c""#);
        assert!(matches!(
            Receipt::from_json(&underscored),
            Err(Error::MalformedInput(_))
        ));

        let plus_sign = RECEIPT.replace(r#""transactionIndex":"0x40","type""#, r#""transactionIndex":"0x+40","type""#);
        assert!(matches!(
            Receipt::from_json(&plus_sign),
            Err(Error::MalformedInput(_))
        ));

        let bad_log = RECEIPT.replacen(r#""logIndex":"0x71""#, r#""logIndex":"113""#, 1);
        assert!(matches!(
            Receipt::from_json(&bad_log),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn short_bloom_is_rejected() {
        let mut value: Value = serde_json::from_str(RECEIPT).unwrap();
        value["logsBloom"] = Value::String("0x00ff".into());
        assert!(matches!(
            Receipt::from_json(&value.to_string()),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn root_and_status_are_exclusive() {
        let mut value: Value = serde_json::from_str(RECEIPT).unwrap();
        value.as_object_mut().unwrap().remove("status");
        assert!(matches!(
            Receipt::from_json(&value.to_string()),
            Err(Error::MalformedInput(_))
        ));

        value["root"] = Value::String(format!("0x{}", "ab".repeat(32)));
        let pre_byzantium = Receipt::from_json(&value.to_string()).unwrap();
        assert!(!pre_byzantium.succeeded());
        assert!(pre_byzantium.encode_json().unwrap().starts_with(r#"{"type":"0x0","root":"0xabab"#));

        value["status"] = Value::String("0x1".into());
        assert!(matches!(
            Receipt::from_json(&value.to_string()),
            Err(Error::MalformedInput(_))
        ));
    }

    #[test]
    fn log_defaults_apply_to_positional_fields() {
        let json = r#"{"type":"0x2","status":"0x0","cumulativeGasUsed":"0x1","logsBloom":"0x"#
            .to_string()
            + &"00".repeat(256)
            + r#"","logs":[{"address":"0x21a932c8e5eac252be0a0860b18c4edb8ee66034","topics":[],"data":"0x","transactionHash":"0xad37193d2ec1d29e39e65a3a8c8a840d16e9c195622613ea2ddf8230efc78e3b"}],"transactionHash":"0xad37193d2ec1d29e39e65a3a8c8a840d16e9c195622613ea2ddf8230efc78e3b","contractAddress":null,"gasUsed":"0x1","effectiveGasPrice":null,"transactionIndex":"0x0"}"#;

        let receipt = Receipt::from_json(&json).unwrap();
        assert!(!receipt.succeeded());
        let log = &receipt.logs[0];
        assert_eq!(log.block_number, 0);
        assert_eq!(log.log_index, 0);
        assert_eq!(log.block_hash, B256::ZERO);
        assert!(!log.removed);
        assert_eq!(receipt.from, None);
        assert_eq!(receipt.block_hash, None);
    }
}
