//! Domain separator fields and chain id normalization

use super::TypedField;
use crate::config::TypedDataSettings;
use crate::primitives::{encode_address, encode_bytes, parse_address, parse_b256};
use crate::{Error, Result};
use alloy::primitives::{Address, B256, U256};
use serde_json::{Map, Value};

/// The recognized EIP-712 domain fields
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Domain {
    pub name: Option<String>,
    pub version: Option<String>,
    pub chain_id: Option<U256>,
    pub verifying_contract: Option<Address>,
    pub salt: Option<B256>,
}

impl Domain {
    pub(crate) fn from_value(value: &Value, settings: &TypedDataSettings) -> Result<Self> {
        let object = value
            .as_object()
            .ok_or_else(|| Error::malformed(format!("`domain` must be an object, got {}", value)))?;

        let mut domain = Domain::default();
        for (key, value) in object {
            match key.as_str() {
                "name" => domain.name = Some(string_field(key, value)?),
                "version" => domain.version = Some(string_field(key, value)?),
                "chainId" => domain.chain_id = Some(normalize_chain_id(value, settings)?),
                "verifyingContract" => {
                    domain.verifying_contract = Some(parse_address(&string_field(key, value)?)?)
                }
                "salt" => domain.salt = Some(parse_b256(&string_field(key, value)?)?),
                other => tracing::debug!(field = other, "Ignoring unrecognized domain field"),
            }
        }
        Ok(domain)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.version.is_none()
            && self.chain_id.is_none()
            && self.verifying_contract.is_none()
            && self.salt.is_none()
    }

    /// `EIP712Domain` declaration for the fields that are set, in canonical order
    pub(crate) fn declared_fields(&self) -> Vec<TypedField> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push(TypedField::new("name", "string"));
        }
        if self.version.is_some() {
            fields.push(TypedField::new("version", "string"));
        }
        if self.chain_id.is_some() {
            fields.push(TypedField::new("chainId", "uint256"));
        }
        if self.verifying_contract.is_some() {
            fields.push(TypedField::new("verifyingContract", "address"));
        }
        if self.salt.is_some() {
            fields.push(TypedField::new("salt", "bytes32"));
        }
        fields
    }

    /// The domain as a message for `hashStruct`, chain id in decimal
    pub(crate) fn to_message(&self) -> Map<String, Value> {
        let mut message = Map::new();
        if let Some(name) = &self.name {
            message.insert("name".into(), Value::String(name.clone()));
        }
        if let Some(version) = &self.version {
            message.insert("version".into(), Value::String(version.clone()));
        }
        if let Some(chain_id) = &self.chain_id {
            message.insert("chainId".into(), Value::String(chain_id.to_string()));
        }
        if let Some(contract) = &self.verifying_contract {
            message.insert("verifyingContract".into(), Value::String(encode_address(contract)));
        }
        if let Some(salt) = &self.salt {
            message.insert("salt".into(), Value::String(encode_bytes(salt.as_slice())));
        }
        message
    }
}

fn string_field(key: &str, value: &Value) -> Result<String> {
    value
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| Error::malformed(format!("domain field `{}` must be a string", key)))
}

/// Accepts a JSON integer or a decimal string; hex strings only when enabled
fn normalize_chain_id(value: &Value, settings: &TypedDataSettings) -> Result<U256> {
    match value {
        Value::Number(number) => number
            .as_u64()
            .map(U256::from)
            .ok_or_else(|| Error::InvalidChainId(number.to_string())),
        Value::String(text) => {
            if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
                if !settings.accept_hex_chain_id {
                    return Err(Error::InvalidChainId(format!(
                        "hex chain id {:?} is not accepted",
                        text
                    )));
                }
                U256::from_str_radix(digits, 16).map_err(|_| Error::InvalidChainId(text.clone()))
            } else if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
                U256::from_str_radix(text, 10).map_err(|_| Error::InvalidChainId(text.clone()))
            } else {
                Err(Error::InvalidChainId(text.clone()))
            }
        }
        other => Err(Error::InvalidChainId(other.to_string())),
    }
}
