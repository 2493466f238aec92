//! Type signatures and struct hashing
//!
//! `encodeType` lists the root type followed by every struct it references,
//! each once, sorted by name. `encodeData` walks the declared fields in order
//! and produces one 32-byte word per field.

use super::TypedData;
use crate::primitives::{decode_bytes, parse_address};
use crate::{Error, Result};
use alloy::primitives::{keccak256, B256, U256};
use serde_json::{Map, Value};

type Word = [u8; 32];

/// Strip every array suffix: `Part[][2]` -> `Part`
pub(crate) fn base_type(kind: &str) -> &str {
    match kind.find('[') {
        Some(idx) => &kind[..idx],
        None => kind,
    }
}

/// Split off the outermost array dimension: `Part[][2]` -> (`Part[]`, Some(2))
fn split_array(kind: &str) -> Result<Option<(&str, Option<usize>)>> {
    if !kind.ends_with(']') {
        return Ok(None);
    }
    let open = kind
        .rfind('[')
        .ok_or_else(|| Error::malformed(format!("invalid array type {:?}", kind)))?;
    let size = &kind[open + 1..kind.len() - 1];
    let length = if size.is_empty() {
        None
    } else {
        Some(
            size.parse::<usize>()
                .map_err(|_| Error::malformed(format!("invalid array length in {:?}", kind)))?,
        )
    };
    Ok(Some((&kind[..open], length)))
}

/// Size suffix of `uintN`/`bytesN`: plain decimal digits, no leading zero
fn type_width(digits: &str) -> Option<usize> {
    if digits.starts_with('0') || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

fn integer_width(kind: &str) -> Option<(usize, bool)> {
    let (digits, signed) = if let Some(digits) = kind.strip_prefix("uint") {
        (digits, false)
    } else if let Some(digits) = kind.strip_prefix("int") {
        (digits, true)
    } else {
        return None;
    };
    let bits = type_width(digits)?;
    (bits >= 8 && bits <= 256 && bits % 8 == 0).then_some((bits, signed))
}

fn fixed_bytes_width(kind: &str) -> Option<usize> {
    let digits = kind.strip_prefix("bytes")?;
    let width = type_width(digits)?;
    (1..=32).contains(&width).then_some(width)
}

pub(crate) fn is_primitive(kind: &str) -> bool {
    matches!(kind, "address" | "bool" | "string" | "bytes")
        || integer_width(kind).is_some()
        || fixed_bytes_width(kind).is_some()
}

impl TypedData {
    fn collect_dependencies(&self, kind: &str, found: &mut Vec<String>) {
        let base = base_type(kind);
        if found.iter().any(|name| name == base) {
            return;
        }
        let Some(fields) = self.types.get(base) else {
            return;
        };
        found.push(base.to_string());
        for field in fields {
            self.collect_dependencies(&field.kind, found);
        }
    }

    /// Struct types referenced by `type_name`: itself first, then the rest sorted
    pub fn dependencies(&self, type_name: &str) -> Vec<String> {
        let mut found = Vec::new();
        self.collect_dependencies(type_name, &mut found);
        if found.len() > 1 {
            found[1..].sort();
        }
        found
    }

    /// Canonical type signature, e.g. `Mail(Person from,...)Person(...)`
    pub fn encode_type(&self, type_name: &str) -> Result<String> {
        if !self.types.contains_key(type_name) {
            return Err(Error::malformed(format!("unknown type {:?}", type_name)));
        }

        let mut signature = String::new();
        for dependency in self.dependencies(type_name) {
            let fields = &self.types[&dependency];
            let members: Vec<String> = fields
                .iter()
                .map(|field| format!("{} {}", field.kind, field.name))
                .collect();
            signature.push_str(&dependency);
            signature.push('(');
            signature.push_str(&members.join(","));
            signature.push(')');
        }
        Ok(signature)
    }

    pub fn type_hash(&self, type_name: &str) -> Result<B256> {
        Ok(keccak256(self.encode_type(type_name)?.as_bytes()))
    }

    /// `keccak256(typeHash ‖ encodeData(data))`
    pub fn hash_struct(&self, type_name: &str, data: &Value) -> Result<B256> {
        let object = data.as_object().ok_or_else(|| {
            Error::malformed(format!("value for struct {} must be an object", type_name))
        })?;
        let encoded = self.encode_data(type_name, object)?;
        Ok(keccak256(&encoded))
    }

    fn encode_data(&self, type_name: &str, data: &Map<String, Value>) -> Result<Vec<u8>> {
        let fields = self
            .types
            .get(type_name)
            .ok_or_else(|| Error::malformed(format!("unknown type {:?}", type_name)))?;

        if let Some(extra) = data
            .keys()
            .find(|key| !fields.iter().any(|field| &field.name == *key))
        {
            return Err(Error::malformed(format!(
                "field {:?} is not declared in type {}",
                extra, type_name
            )));
        }

        let mut encoded = Vec::with_capacity(32 * (fields.len() + 1));
        encoded.extend_from_slice(self.type_hash(type_name)?.as_slice());
        for field in fields {
            let value = data.get(&field.name).ok_or_else(|| {
                Error::malformed(format!("missing value for {}.{}", type_name, field.name))
            })?;
            encoded.extend_from_slice(&self.encode_field(&field.kind, value)?);
        }
        Ok(encoded)
    }

    fn encode_field(&self, kind: &str, value: &Value) -> Result<Word> {
        if let Some((element, length)) = split_array(kind)? {
            let items = value.as_array().ok_or_else(|| {
                Error::malformed(format!("value for {} must be an array", kind))
            })?;
            if let Some(expected) = length {
                if items.len() != expected {
                    return Err(Error::malformed(format!(
                        "{} expects {} elements, got {}",
                        kind,
                        expected,
                        items.len()
                    )));
                }
            }
            let mut concatenated = Vec::with_capacity(32 * items.len());
            for item in items {
                concatenated.extend_from_slice(&self.encode_field(element, item)?);
            }
            return Ok(keccak256(&concatenated).0);
        }

        if self.types.contains_key(kind) {
            return Ok(self.hash_struct(kind, value)?.0);
        }

        encode_primitive(kind, value)
    }
}

fn mismatch(kind: &str, value: &Value) -> Error {
    Error::malformed(format!("invalid value {} for type {}", value, kind))
}

pub(crate) fn encode_primitive(kind: &str, value: &Value) -> Result<Word> {
    let mut word = [0u8; 32];
    match kind {
        "address" => {
            let text = value.as_str().ok_or_else(|| mismatch(kind, value))?;
            let address = parse_address(text)?;
            word[12..].copy_from_slice(address.as_slice());
        }
        "bool" => {
            let flag = value.as_bool().ok_or_else(|| mismatch(kind, value))?;
            word[31] = u8::from(flag);
        }
        "string" => {
            let text = value.as_str().ok_or_else(|| mismatch(kind, value))?;
            word = keccak256(text.as_bytes()).0;
        }
        "bytes" => {
            let text = value.as_str().ok_or_else(|| mismatch(kind, value))?;
            word = keccak256(decode_bytes(text)?).0;
        }
        _ => {
            if let Some(width) = fixed_bytes_width(kind) {
                let text = value.as_str().ok_or_else(|| mismatch(kind, value))?;
                let bytes = decode_bytes(text)?;
                if bytes.len() != width {
                    return Err(mismatch(kind, value));
                }
                word[..width].copy_from_slice(&bytes);
            } else if let Some((bits, signed)) = integer_width(kind) {
                word = encode_integer(kind, bits, signed, value)?;
            } else {
                return Err(Error::malformed(format!("unsupported type {:?}", kind)));
            }
        }
    }
    Ok(word)
}

/// Sign and magnitude of a JSON integer, decimal string or `0x` string
fn parse_integer(kind: &str, value: &Value) -> Result<(bool, U256)> {
    match value {
        Value::Number(number) => {
            if let Some(unsigned) = number.as_u64() {
                Ok((false, U256::from(unsigned)))
            } else if let Some(signed) = number.as_i64() {
                Ok((signed < 0, U256::from(signed.unsigned_abs())))
            } else {
                // whole floats such as `1000.0`
                let float = number.as_f64().ok_or_else(|| mismatch(kind, value))?;
                if float.fract() != 0.0 || float < i64::MIN as f64 || float >= i64::MAX as f64 {
                    return Err(mismatch(kind, value));
                }
                let signed = float as i64;
                Ok((signed < 0, U256::from(signed.unsigned_abs())))
            }
        }
        Value::String(text) => {
            let (negative, digits) = match text.strip_prefix('-') {
                Some(rest) => (true, rest),
                None => (false, text.as_str()),
            };
            let magnitude = match digits.strip_prefix("0x") {
                Some(hex_digits)
                    if !hex_digits.is_empty()
                        && hex_digits.bytes().all(|b| b.is_ascii_hexdigit()) =>
                {
                    U256::from_str_radix(hex_digits, 16)
                }
                None if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
                    U256::from_str_radix(digits, 10)
                }
                _ => return Err(mismatch(kind, value)),
            }
            .map_err(|_| mismatch(kind, value))?;
            Ok((negative, magnitude))
        }
        _ => Err(mismatch(kind, value)),
    }
}

fn encode_integer(kind: &str, bits: usize, signed: bool, value: &Value) -> Result<Word> {
    let (negative, magnitude) = parse_integer(kind, value)?;

    let in_range = if signed {
        let limit = U256::from(1u8) << (bits - 1);
        if negative {
            magnitude <= limit
        } else {
            magnitude < limit
        }
    } else {
        !negative && magnitude.bit_len() <= bits
    };
    if !in_range {
        return Err(Error::malformed(format!(
            "integer {} out of range for {}",
            value, kind
        )));
    }

    let word = if negative {
        U256::ZERO.wrapping_sub(magnitude)
    } else {
        magnitude
    };
    Ok(word.to_be_bytes::<32>())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn base_type_strips_all_dimensions() {
        assert_eq!(base_type("Part[]"), "Part");
        assert_eq!(base_type("uint8[2][]"), "uint8");
        assert_eq!(base_type("Person"), "Person");
    }

    #[test]
    fn split_array_takes_outer_dimension() {
        assert_eq!(split_array("Part[][2]").unwrap(), Some(("Part[]", Some(2))));
        assert_eq!(split_array("Part[]").unwrap(), Some(("Part", None)));
        assert_eq!(split_array("Part").unwrap(), None);
        assert!(split_array("Part[x]").is_err());
    }

    #[test]
    fn primitive_names() {
        for kind in ["address", "bool", "string", "bytes", "bytes32", "uint96", "int8"] {
            assert!(is_primitive(kind), "{kind}");
        }
        for kind in [
            "uint", "uint7", "uint264", "bytes0", "bytes33", "Person", "uint+8", "uint08",
            "int 8", "bytes+4", "bytes04",
        ] {
            assert!(!is_primitive(kind), "{kind}");
        }
    }

    #[test]
    fn negative_integers_use_twos_complement() {
        assert_eq!(encode_primitive("int8", &json!(-1)).unwrap(), [0xff; 32]);
        assert_eq!(encode_primitive("int256", &json!("-1")).unwrap(), [0xff; 32]);
        assert!(encode_primitive("int8", &json!(-128)).is_ok());
        assert!(encode_primitive("int8", &json!(-129)).is_err());
        assert!(encode_primitive("int8", &json!(128)).is_err());
    }

    #[test]
    fn unsigned_integers_are_range_checked() {
        let word = encode_primitive("uint96", &json!(10000)).unwrap();
        assert_eq!(&word[30..], &[0x27, 0x10]);
        assert!(encode_primitive("uint8", &json!(255)).is_ok());
        assert!(encode_primitive("uint8", &json!(256)).is_err());
        assert!(encode_primitive("uint8", &json!(-1)).is_err());
        assert_eq!(
            encode_primitive("uint256", &json!("0x10")).unwrap(),
            encode_primitive("uint256", &json!("16")).unwrap()
        );
        assert!(encode_primitive("uint256", &json!(1.5)).is_err());

        for bad in ["1_0", "+10", "0x1_0", "0x+a", " 10", ""] {
            assert!(
                matches!(encode_primitive("uint8", &json!(bad)), Err(Error::MalformedInput(_))),
                "{bad:?}"
            );
        }
    }

    #[test]
    fn whole_floats_are_integers() {
        assert_eq!(
            encode_primitive("uint256", &json!(1000.0)).unwrap(),
            encode_primitive("uint256", &json!(1000)).unwrap()
        );
        assert_eq!(encode_primitive("int8", &json!(-1.0)).unwrap(), [0xff; 32]);
        assert!(encode_primitive("uint256", &json!(1e300)).is_err());
        assert!(encode_primitive("uint8", &json!(256.0)).is_err());
    }

    #[test]
    fn fixed_bytes_are_right_padded() {
        let word = encode_primitive("bytes4", &json!("0xa9059cbb")).unwrap();
        assert_eq!(&word[..4], &[0xa9, 0x05, 0x9c, 0xbb]);
        assert!(word[4..].iter().all(|b| *b == 0));
        assert!(encode_primitive("bytes4", &json!("0xa9059c")).is_err());
    }

    #[test]
    fn address_is_left_padded() {
        let word = encode_primitive(
            "address",
            &json!("0xCD2a3d9F938E13CD947Ec05AbC7FE734Df8DD826"),
        )
        .unwrap();
        assert!(word[..12].iter().all(|b| *b == 0));
        assert_eq!(word[12], 0xcd);
    }

    #[test]
    fn dynamic_values_are_hashed() {
        assert_eq!(
            encode_primitive("string", &json!("Hello, Bob!")).unwrap(),
            keccak256("Hello, Bob!").0
        );
        assert_eq!(
            encode_primitive("bytes", &json!("0x")).unwrap(),
            keccak256(b"").0
        );
        assert_eq!(encode_primitive("bool", &json!(true)).unwrap()[31], 1);
        assert!(encode_primitive("bool", &json!("true")).is_err());
    }

    #[test]
    fn dependencies_are_sorted_after_the_root() {
        let json = json!({
            "types": {
                "EIP712Domain": [{"name": "name", "type": "string"}],
                "Zoo": [{"name": "a", "type": "Animal[]"}, {"name": "k", "type": "Keeper"}],
                "Keeper": [{"name": "pet", "type": "Animal"}],
                "Animal": [{"name": "name", "type": "string"}]
            },
            "primaryType": "Zoo",
            "domain": {"name": "zoo"},
            "message": {}
        });
        let typed_data = TypedData::from_json(&json.to_string()).unwrap();
        assert_eq!(typed_data.dependencies("Zoo"), ["Zoo", "Animal", "Keeper"]);
        assert_eq!(
            typed_data.encode_type("Zoo").unwrap(),
            "Zoo(Animal[] a,Keeper k)Animal(string name)Keeper(Animal pet)"
        );
    }

    #[test]
    fn fixed_arrays_check_length() {
        let json = json!({
            "types": {
                "EIP712Domain": [{"name": "name", "type": "string"}],
                "Pair": [{"name": "values", "type": "uint8[2]"}]
            },
            "primaryType": "Pair",
            "domain": {"name": "pair"},
            "message": {"values": [1, 2, 3]}
        });
        let typed_data = TypedData::from_json(&json.to_string()).unwrap();
        assert!(matches!(
            typed_data.signing_hash(),
            Err(Error::MalformedInput(_))
        ));
    }
}
