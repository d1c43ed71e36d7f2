use alloy_primitives::Address;
use k256::ecdsa::SigningKey;
use sha3::{Digest, Keccak256};

use crate::error::EthError;

/// Derives the Ethereum address of an uncompressed secp256k1 public key
/// (65 bytes, starting with 0x04).
///
/// The address is the last 20 bytes of the Keccak-256 hash of the 64-byte key
/// without its 0x04 prefix.
pub fn address_from_uncompressed(uncompressed_pubkey: &[u8; 65]) -> Result<Address, EthError> {
    if uncompressed_pubkey[0] != 0x04 {
        return Err(EthError::InvalidPublicKey(
            "uncompressed key must start with 0x04".into(),
        ));
    }

    let hash = Keccak256::digest(&uncompressed_pubkey[1..]);
    Ok(Address::from_slice(&hash[12..]))
}

/// Derives the Ethereum address controlled by a raw 32-byte private key.
pub fn address_from_private_key(private_key: &[u8; 32]) -> Result<Address, EthError> {
    let signing_key = SigningKey::from_bytes(private_key.into())
        .map_err(|e| EthError::InvalidPrivateKey(e.to_string()))?;

    let uncompressed: [u8; 65] = signing_key
        .verifying_key()
        .to_encoded_point(false)
        .as_bytes()
        .try_into()
        .map_err(|_| EthError::InvalidPublicKey("invalid uncompressed key length".into()))?;

    address_from_uncompressed(&uncompressed)
}

/// Renders an address with its EIP-55 mixed-case checksum.
pub fn to_checksum(address: &Address) -> String {
    address.to_checksum(None)
}

/// Parses a user-supplied address string.
///
/// The string must be `0x` followed by 40 hex characters. All-lowercase and
/// all-uppercase forms carry no checksum and are accepted as-is; mixed case
/// must match the EIP-55 checksum exactly.
pub fn parse_address(input: &str) -> Result<Address, EthError> {
    let hex_part = input
        .strip_prefix("0x")
        .or_else(|| input.strip_prefix("0X"))
        .ok_or_else(|| EthError::InvalidAddress("address must start with 0x".into()))?;

    if hex_part.len() != 40 {
        return Err(EthError::InvalidAddress(format!(
            "expected 40 hex characters, got {}",
            hex_part.len()
        )));
    }

    let bytes = hex::decode(hex_part)
        .map_err(|_| EthError::InvalidAddress("address contains non-hex characters".into()))?;
    let address = Address::from_slice(&bytes);

    let is_all_lower = hex_part.chars().all(|c| !c.is_ascii_uppercase());
    let is_all_upper = hex_part.chars().all(|c| !c.is_ascii_lowercase());
    if is_all_lower || is_all_upper {
        return Ok(address);
    }

    let checksummed = to_checksum(&address);
    if checksummed[2..] != *hex_part {
        return Err(EthError::InvalidAddress(format!(
            "checksum mismatch, expected {checksummed}"
        )));
    }

    Ok(address)
}
