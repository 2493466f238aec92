//! EIP-712 structured data hashing
//!
//! A typed-data document is parsed into [`TypedData`], its domain is
//! normalized (so `"chainId": 1` and `"chainId": "1"` hash identically) and
//! the final digest is `keccak256(0x1901 ‖ domainSeparator ‖ hashStruct(message))`.
//!
//! Messages are kept as `serde_json::Value`; every value is encoded
//! according to the type declared for its field, never its JSON shape.

mod domain;
mod encoder;

use crate::config::TypedDataSettings;
use crate::{Error, Result};
use alloy::primitives::{keccak256, B256};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

pub use domain::Domain;

/// Name of the domain struct type
pub const DOMAIN_TYPE: &str = "EIP712Domain";

/// One `(name, type)` entry of a struct type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypedField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl TypedField {
    pub fn new(name: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTypedData {
    types: Option<BTreeMap<String, Vec<TypedField>>>,
    primary_type: Option<String>,
    domain: Option<Value>,
    message: Option<Value>,
}

/// A validated EIP-712 document
#[derive(Debug, Clone)]
pub struct TypedData {
    types: BTreeMap<String, Vec<TypedField>>,
    primary_type: String,
    domain: Domain,
    message: Map<String, Value>,
}

impl TypedData {
    /// Parse a document with default settings
    pub fn from_json(json: &str) -> Result<Self> {
        Self::from_json_with(json, &TypedDataSettings::default())
    }

    /// Parse a document, normalizing the domain according to `settings`
    pub fn from_json_with(json: &str, settings: &TypedDataSettings) -> Result<Self> {
        let raw: RawTypedData = serde_json::from_str(json)
            .map_err(|e| Error::malformed(format!("Invalid typed data JSON: {}", e)))?;

        let mut types = raw.types.ok_or_else(|| Error::malformed("missing `types`"))?;
        let primary_type = raw
            .primary_type
            .ok_or_else(|| Error::malformed("missing `primaryType`"))?;
        let domain_value = raw.domain.ok_or_else(|| Error::malformed("missing `domain`"))?;
        let message = match raw.message {
            Some(Value::Object(map)) => map,
            Some(other) => {
                return Err(Error::malformed(format!(
                    "`message` must be an object, got {}",
                    other
                )))
            }
            None => return Err(Error::malformed("missing `message`")),
        };

        let domain = Domain::from_value(&domain_value, settings)?;
        if domain.is_empty() {
            return Err(Error::malformed("domain is undefined"));
        }

        if !types.contains_key(DOMAIN_TYPE) {
            tracing::debug!("No EIP712Domain type declared, deriving it from the domain fields");
            types.insert(DOMAIN_TYPE.to_string(), domain.declared_fields());
        }

        let typed_data = Self {
            types,
            primary_type,
            domain,
            message,
        };
        typed_data.validate()?;
        Ok(typed_data)
    }

    fn validate(&self) -> Result<()> {
        if !self.types.contains_key(&self.primary_type) {
            return Err(Error::malformed(format!(
                "primary type {:?} is not declared in `types`",
                self.primary_type
            )));
        }

        for (type_name, fields) in &self.types {
            for field in fields {
                let base = encoder::base_type(&field.kind);
                if !encoder::is_primitive(base) && !self.types.contains_key(base) {
                    return Err(Error::malformed(format!(
                        "field {}.{} references unknown type {:?}",
                        type_name, field.name, field.kind
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn primary_type(&self) -> &str {
        &self.primary_type
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn message(&self) -> &Map<String, Value> {
        &self.message
    }

    /// Fields declared for a struct type
    pub fn fields(&self, type_name: &str) -> Option<&[TypedField]> {
        self.types.get(type_name).map(|fields| fields.as_slice())
    }

    /// hashStruct of the normalized domain
    pub fn domain_separator(&self) -> Result<B256> {
        self.hash_struct(DOMAIN_TYPE, &Value::Object(self.domain.to_message()))
    }

    /// The digest a wallet signs for this document
    pub fn signing_hash(&self) -> Result<B256> {
        let domain_separator = self.domain_separator()?;
        let message_hash = self.hash_struct(&self.primary_type, &Value::Object(self.message.clone()))?;

        let mut buf = Vec::with_capacity(66);
        buf.extend_from_slice(&[0x19, 0x01]);
        buf.extend_from_slice(domain_separator.as_slice());
        buf.extend_from_slice(message_hash.as_slice());

        let digest = keccak256(&buf);
        tracing::debug!(
            primary_type = %self.primary_type,
            domain_separator = %domain_separator,
            digest = %digest,
            "Hashed typed data"
        );
        Ok(digest)
    }
}

/// Hash a JSON typed-data document with default settings
pub fn hash_typed_data(json: &str) -> Result<B256> {
    TypedData::from_json(json)?.signing_hash()
}

/// Hash a JSON typed-data document with explicit settings
pub fn hash_typed_data_with(json: &str, settings: &TypedDataSettings) -> Result<B256> {
    TypedData::from_json_with(json, settings)?.signing_hash()
}
