//! Hex encoding for the value types shared by every codec
//!
//! Integers are `U256` (exposed as [`BigInt`]) and serialize as minimal
//! `0x`-prefixed quantities. Byte strings and addresses serialize as
//! lower-case `0x`-prefixed hex.

use crate::{Error, Result};
use alloy::hex;
use alloy::primitives::{Address, B256, U256};

/// Arbitrary precision integer used for values, fees and chain ids
pub type BigInt = U256;

/// Encode an integer as a minimal hex quantity (`0x0` for zero)
pub fn encode_quantity(value: &U256) -> String {
    format!("0x{:x}", value)
}

/// Encode a u64 as a minimal hex quantity
pub fn encode_u64(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Encode raw bytes as `0x`-prefixed lower-case hex
pub fn encode_bytes(bytes: &[u8]) -> String {
    hex::encode_prefixed(bytes)
}

/// Encode an address in canonical lower-case form
pub fn encode_address(address: &Address) -> String {
    hex::encode_prefixed(address)
}

fn strip_hex_prefix<'a>(input: &'a str, what: &str) -> Result<&'a str> {
    input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| Error::malformed(format!("{} must be 0x-prefixed hex: {:?}", what, input)))
}

/// Decode a `0x`-prefixed hex byte string
pub fn decode_bytes(input: &str) -> Result<Vec<u8>> {
    let digits = strip_hex_prefix(input, "byte string")?;
    hex::decode(digits).map_err(|e| Error::malformed(format!("Invalid hex string: {}", e)))
}

/// Decode hex with an optional `0x` prefix (command line input)
pub fn decode_hex_lenient(input: &str) -> Result<Vec<u8>> {
    let trimmed = input.strip_prefix("0x").unwrap_or(input);
    hex::decode(trimmed).map_err(|e| Error::malformed(format!("Invalid hex string: {}", e)))
}

// from_str_radix alone lets `_` and a leading `+` through
fn quantity_digits(input: &str) -> Result<&str> {
    let digits = strip_hex_prefix(input, "quantity")?;
    if digits.is_empty() {
        return Err(Error::malformed("empty hex quantity"));
    }
    if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(Error::malformed(format!("Invalid hex quantity {:?}", input)));
    }
    Ok(digits)
}

/// Parse a `0x`-prefixed hex quantity
pub fn parse_quantity(input: &str) -> Result<U256> {
    let digits = quantity_digits(input)?;
    U256::from_str_radix(digits, 16)
        .map_err(|e| Error::malformed(format!("Invalid hex quantity {:?}: {}", input, e)))
}

/// Parse a `0x`-prefixed hex quantity that must fit in 64 bits
pub fn parse_u64_quantity(input: &str) -> Result<u64> {
    let digits = quantity_digits(input)?;
    u64::from_str_radix(digits, 16)
        .map_err(|e| Error::malformed(format!("Invalid 64-bit quantity {:?}: {}", input, e)))
}

/// Parse a 20-byte address, any case, prefix optional
pub fn parse_address(input: &str) -> Result<Address> {
    let bytes = decode_hex_lenient(input)?;
    if bytes.len() != 20 {
        return Err(Error::malformed(format!(
            "address must be 20 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Parse a `0x`-prefixed 32-byte hash
pub fn parse_b256(input: &str) -> Result<B256> {
    let bytes = decode_bytes(input)?;
    if bytes.len() != 32 {
        return Err(Error::malformed(format!(
            "hash must be 32 bytes, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_is_minimal() {
        assert_eq!(encode_quantity(&U256::ZERO), "0x0");
        assert_eq!(encode_quantity(&U256::from(10_000_000_000u64)), "0x2540be400");
        assert_eq!(encode_u64(21000), "0x5208");
    }

    #[test]
    fn quantity_requires_prefix() {
        assert!(matches!(parse_quantity("1234"), Err(Error::MalformedInput(_))));
        assert!(matches!(parse_quantity("0x"), Err(Error::MalformedInput(_))));
        assert!(matches!(parse_quantity("0xzz"), Err(Error::MalformedInput(_))));
        assert_eq!(parse_quantity("0xa044e4").unwrap(), U256::from(0xa044e4u64));
        assert_eq!(parse_u64_quantity("0x40").unwrap(), 64);

        for bad in ["0x1_0", "0x+40", "0x-1", "0x 1", "0x1g"] {
            assert!(
                matches!(parse_quantity(bad), Err(Error::MalformedInput(_))),
                "{bad}"
            );
            assert!(
                matches!(parse_u64_quantity(bad), Err(Error::MalformedInput(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn address_is_lower_case() {
        let address = parse_address("0x0c54FcCd2e384b4BB6f2E405Bf5Cbc15a017AaFb").unwrap();
        assert_eq!(
            encode_address(&address),
            "0x0c54fccd2e384b4bb6f2e405bf5cbc15a017aafb"
        );
        assert!(parse_address("0x1234").is_err());
    }

    #[test]
    fn bytes_round_trip() {
        let bytes = decode_bytes("0xa9059cbb").unwrap();
        assert_eq!(bytes, vec![0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(encode_bytes(&bytes), "0xa9059cbb");
        assert_eq!(decode_bytes("0x").unwrap(), Vec::<u8>::new());
        assert!(decode_bytes("a9059cbb").is_err());
    }
}
