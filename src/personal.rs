//! `personal_sign` message hashing and signer recovery

use crate::{Error, Result};
use alloy::primitives::{keccak256, Address, Signature, B256, U256};

const SIGNATURE_LEN: usize = 65;

/// Hash of `"\x19Ethereum Signed Message:\n" ‖ len(message) ‖ message`
pub fn text_hash(message: &[u8]) -> B256 {
    let prefix = format!("\x19Ethereum Signed Message:\n{}", message.len());
    let mut data = Vec::with_capacity(prefix.len() + message.len());
    data.extend_from_slice(prefix.as_bytes());
    data.extend_from_slice(message);
    keccak256(&data)
}

/// Recover the address that produced a 65 byte `r ‖ s ‖ v` personal signature.
///
/// Accepts `v` as 0/1 or 27/28.
pub fn personal_ec_recover(message: &[u8], signature: &[u8]) -> Result<Address> {
    if signature.len() != SIGNATURE_LEN {
        return Err(Error::InvalidSignatureLength(signature.len()));
    }

    let mut v = signature[64];
    if v >= 27 {
        v -= 27;
    }
    let parity = match v {
        0 => false,
        1 => true,
        other => {
            return Err(Error::RecoveryFailed(format!(
                "invalid recovery id {}",
                other
            )))
        }
    };

    let r = U256::from_be_slice(&signature[..32]);
    let s = U256::from_be_slice(&signature[32..64]);
    let hash = text_hash(message);

    let address = Signature::new(r, s, parity)
        .recover_address_from_prehash(&hash)
        .map_err(|e| Error::RecoveryFailed(e.to_string()))?;

    tracing::debug!(%address, message_len = message.len(), "Recovered personal signer");
    Ok(address)
}

/// `r ‖ s ‖ v` with `v` as 27/28
pub fn signature_to_bytes(signature: &Signature) -> [u8; SIGNATURE_LEN] {
    let mut out = [0u8; SIGNATURE_LEN];
    out[..32].copy_from_slice(&signature.r().to_be_bytes::<32>());
    out[32..64].copy_from_slice(&signature.s().to_be_bytes::<32>());
    out[64] = 27 + u8::from(signature.v());
    out
}
