//! Minimal ABI encoding and decoding for EVM function calls.
//!
//! This module provides just enough of the contract ABI to build calldata for
//! ERC-20 reads, the price oracle and the ENS universal resolver, and to
//! decode their return values, without pulling in a full ABI parser.

use alloy_primitives::{Address, B256, U256};
use sha3::{Digest, Keccak256};

use crate::error::EthError;

const WORD: usize = 32;

/// A single ABI-encoded parameter.
#[derive(Debug, Clone)]
pub enum AbiParam {
    /// A 20-byte address, left-padded to 32 bytes.
    Address(Address),
    /// A 256-bit unsigned integer.
    Uint256(U256),
    /// A boolean, encoded as 0 or 1 in a full word.
    Bool(bool),
    /// A `bytes32` value, encoded in place.
    FixedBytes(B256),
    /// Dynamic `bytes`: an offset in the head, length and padded data in the tail.
    Bytes(Vec<u8>),
}

impl AbiParam {
    fn is_dynamic(&self) -> bool {
        matches!(self, AbiParam::Bytes(_))
    }
}

/// Computes the 4-byte selector of a canonical function signature such as
/// `"transfer(address,uint256)"`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = Keccak256::digest(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Encodes a function call with the given 4-byte selector and ABI parameters.
///
/// The output is `selector || head || tail`, where static parameters are
/// encoded in place in the head and dynamic parameters are referenced by an
/// offset (relative to the start of the arguments) into the tail.
pub fn encode_function_call(selector: [u8; 4], params: &[AbiParam]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + params.len() * WORD);
    data.extend_from_slice(&selector);
    data.extend_from_slice(&encode_params(params));
    data
}

/// Encodes a parameter tuple without a selector.
pub fn encode_params(params: &[AbiParam]) -> Vec<u8> {
    let head_len = params.len() * WORD;
    let mut head = Vec::with_capacity(head_len);
    let mut tail = Vec::new();

    for param in params {
        if param.is_dynamic() {
            head.extend_from_slice(&uint_word(U256::from(head_len + tail.len())));
            if let AbiParam::Bytes(bytes) = param {
                tail.extend_from_slice(&uint_word(U256::from(bytes.len())));
                tail.extend_from_slice(bytes);
                let padding = (WORD - bytes.len() % WORD) % WORD;
                tail.extend(std::iter::repeat(0u8).take(padding));
            }
        } else {
            head.extend_from_slice(&encode_static(param));
        }
    }

    head.extend_from_slice(&tail);
    head
}

fn encode_static(param: &AbiParam) -> [u8; WORD] {
    match param {
        AbiParam::Address(addr) => {
            let mut word = [0u8; WORD];
            word[12..].copy_from_slice(addr.as_slice());
            word
        }
        AbiParam::Uint256(value) => uint_word(*value),
        AbiParam::Bool(flag) => uint_word(U256::from(*flag as u8)),
        AbiParam::FixedBytes(value) => value.0,
        AbiParam::Bytes(_) => [0u8; WORD],
    }
}

fn uint_word(value: U256) -> [u8; WORD] {
    value.to_be_bytes::<WORD>()
}

/// Returns the 32-byte word at `index` of the encoded return data.
pub fn decode_word(data: &[u8], index: usize) -> Result<[u8; WORD], EthError> {
    let (start, end) = index
        .checked_mul(WORD)
        .and_then(|start| Some((start, start.checked_add(WORD)?)))
        .ok_or_else(|| EthError::DecodingError(format!("word index {index} out of range")))?;
    if data.len() < end {
        return Err(EthError::DecodingError(format!(
            "expected at least {end} bytes, got {}",
            data.len()
        )));
    }

    let mut word = [0u8; WORD];
    word.copy_from_slice(&data[start..end]);
    Ok(word)
}

/// Decodes the uint256 at word `index`.
pub fn decode_uint256(data: &[u8], index: usize) -> Result<U256, EthError> {
    Ok(U256::from_be_bytes(decode_word(data, index)?))
}

/// Decodes the address at word `index`, rejecting dirty upper bytes.
pub fn decode_address(data: &[u8], index: usize) -> Result<Address, EthError> {
    let word = decode_word(data, index)?;
    if word[..12].iter().any(|&b| b != 0) {
        return Err(EthError::DecodingError(
            "address word has non-zero padding".into(),
        ));
    }
    Ok(Address::from_slice(&word[12..]))
}

/// Decodes the dynamic `bytes` value whose offset sits at head word `index`.
pub fn decode_bytes(data: &[u8], index: usize) -> Result<Vec<u8>, EthError> {
    let offset = word_to_usize(decode_uint256(data, index)?)?;
    if offset % WORD != 0 {
        return Err(EthError::DecodingError(format!(
            "misaligned dynamic offset {offset}"
        )));
    }

    let len = word_to_usize(decode_uint256(data, offset / WORD)?)?;
    let start = offset + WORD;
    let end = start
        .checked_add(len)
        .ok_or_else(|| EthError::DecodingError("dynamic length overflows".into()))?;
    if data.len() < end {
        return Err(EthError::DecodingError(format!(
            "dynamic value needs {end} bytes, got {}",
            data.len()
        )));
    }

    Ok(data[start..end].to_vec())
}

/// Decodes a single `string` return value.
///
/// Some early tokens return `bytes32` instead of `string` for `symbol()`; a
/// 32-byte response is therefore read as a NUL-padded fixed string.
pub fn decode_string(data: &[u8]) -> Result<String, EthError> {
    let bytes = if data.len() == WORD {
        data.iter().copied().take_while(|&b| b != 0).collect()
    } else {
        decode_bytes(data, 0)?
    };

    String::from_utf8(bytes)
        .map_err(|e| EthError::DecodingError(format!("invalid UTF-8 in string: {e}")))
}

fn word_to_usize(value: U256) -> Result<usize, EthError> {
    u64::try_from(value)
        .ok()
        .and_then(|v| usize::try_from(v).ok())
        .ok_or_else(|| EthError::DecodingError(format!("value {value} does not fit an offset")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_matches_known_values() {
        assert_eq!(selector("transfer(address,uint256)"), [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(selector("decimals()"), [0x31, 0x3c, 0xe5, 0x67]);
        assert_eq!(selector("symbol()"), [0x95, 0xd8, 0x9b, 0x41]);
    }

    #[test]
    fn encode_address_param() {
        let mut raw = [0u8; 20];
        raw[0] = 0xde;
        raw[19] = 0xad;

        let word = encode_static(&AbiParam::Address(Address::from(raw)));

        assert_eq!(&word[..12], &[0u8; 12]);
        assert_eq!(&word[12..], &raw);
    }

    #[test]
    fn encode_bool_param() {
        let word = encode_static(&AbiParam::Bool(true));
        assert_eq!(word[31], 1);
        assert_eq!(&word[..31], &[0u8; 31]);
    }

    #[test]
    fn encode_function_call_with_selector_only() {
        let sel = [0xa9, 0x05, 0x9c, 0xbb];
        let data = encode_function_call(sel, &[]);
        assert_eq!(data, sel.to_vec());
    }

    #[test]
    fn encode_static_params() {
        let sel = [0xa9, 0x05, 0x9c, 0xbb];
        let mut raw = [0u8; 20];
        raw[19] = 0x01;

        let params = [
            AbiParam::Address(Address::from(raw)),
            AbiParam::Uint256(U256::from(100u64)),
        ];
        let data = encode_function_call(sel, &params);

        assert_eq!(data.len(), 68);
        assert_eq!(&data[4..16], &[0u8; 12]);
        assert_eq!(data[35], 0x01);
        assert_eq!(data[67], 100);
    }

    #[test]
    fn encode_dynamic_bytes_uses_offsets() {
        // (bytes, bytes32) with a 3-byte dynamic value.
        let params = [
            AbiParam::Bytes(vec![0xaa, 0xbb, 0xcc]),
            AbiParam::FixedBytes(B256::repeat_byte(0x11)),
        ];
        let encoded = encode_params(&params);

        // head (2 words) + length word + one padded data word
        assert_eq!(encoded.len(), 4 * WORD);
        assert_eq!(decode_uint256(&encoded, 0).unwrap(), U256::from(64));
        assert_eq!(decode_word(&encoded, 1).unwrap(), [0x11; 32]);
        assert_eq!(decode_uint256(&encoded, 2).unwrap(), U256::from(3));
        assert_eq!(&encoded[96..99], &[0xaa, 0xbb, 0xcc]);
        assert_eq!(&encoded[99..128], &[0u8; 29]);
    }

    #[test]
    fn decode_bytes_reads_encoded_value() {
        let payload = vec![0x42; 40];
        let encoded = encode_params(&[AbiParam::Bytes(payload.clone())]);
        assert_eq!(decode_bytes(&encoded, 0).unwrap(), payload);
    }

    #[test]
    fn decode_bytes_rejects_truncated_data() {
        let mut encoded = encode_params(&[AbiParam::Bytes(vec![1; 40])]);
        encoded.truncate(80);
        assert!(decode_bytes(&encoded, 0).is_err());
    }

    #[test]
    fn decode_string_standard_encoding() {
        let encoded = encode_params(&[AbiParam::Bytes(b"USDC".to_vec())]);
        assert_eq!(decode_string(&encoded).unwrap(), "USDC");
    }

    #[test]
    fn decode_string_bytes32_fallback() {
        let mut word = [0u8; 32];
        word[..3].copy_from_slice(b"MKR");
        assert_eq!(decode_string(&word).unwrap(), "MKR");
    }

    #[test]
    fn decode_address_rejects_dirty_padding() {
        let mut word = [0u8; 32];
        word[0] = 1;
        assert!(decode_address(&word, 0).is_err());
    }

    #[test]
    fn decode_uint256_too_short() {
        assert!(decode_uint256(&[0u8; 16], 0).is_err());
    }

    #[test]
    fn decode_word_rejects_huge_index() {
        assert!(matches!(
            decode_word(&[0u8; 64], usize::MAX / WORD),
            Err(EthError::DecodingError(_))
        ));
    }

    #[test]
    fn decode_string_rejects_offset_near_usize_max() {
        let mut data = [0u8; 64];
        data[24..32].copy_from_slice(&0xffff_ffff_ffff_ffe0u64.to_be_bytes());
        assert!(matches!(
            decode_string(&data),
            Err(EthError::DecodingError(_))
        ));
    }
}
