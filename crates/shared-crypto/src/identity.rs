//! Address derivation.
//!
//! An address is the network version byte (two hex digits) followed by the
//! first 20 bytes of SHA-256 over the raw public key, hex encoded. The result
//! is always 42 lowercase hex characters.

use crate::{hashing::sha256, signatures::Ed25519PublicKey, CryptoError};

const ADDRESS_BODY_LEN: usize = 20;

/// Derive the address for a hex public key under a network version.
pub fn address_from_public_key(
    public_key: &str,
    network_version: u8,
) -> Result<String, CryptoError> {
    let key = Ed25519PublicKey::from_hex(public_key)?;
    let digest = sha256(key.as_bytes());
    Ok(format!(
        "{:02x}{}",
        network_version,
        hex::encode(&digest[..ADDRESS_BODY_LEN])
    ))
}

/// Check that an address is well formed for the given network.
pub fn is_valid_address(address: &str, network_version: u8) -> bool {
    address.len() == 2 + ADDRESS_BODY_LEN * 2
        && address.starts_with(&format!("{:02x}", network_version))
        && hex::decode(address).is_ok()
}
