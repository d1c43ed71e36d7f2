//! ENS naming: normalization, namehash, DNS wire encoding and the
//! ENSIP-11 multicoin record scheme.
//!
//! Lookups go through the universal resolver, which takes the DNS-encoded
//! name plus the calldata of the record read and forwards it to whichever
//! resolver the registry points at.

use alloy_primitives::{address, Address, B256, U256};
use sha3::{Digest, Keccak256};

use crate::abi::{self, encode_function_call, AbiParam};
use crate::error::EthError;

/// SLIP-44 coin type of ether; the default `addr(bytes32)` record.
pub const ETH_COIN_TYPE: u32 = 60;

/// ENS universal resolver on Ethereum mainnet.
pub const UNIVERSAL_RESOLVER: Address = address!("ce01f8eee7E479C928F8919abD53E553a36CeF67");

const MAX_LABEL_LEN: usize = 255;

/// Maps an EVM chain id to its ENSIP-11 coin type: `0x80000000 | chain_id`,
/// truncated to 32 bits.
pub fn evm_coin_type(chain_id: u64) -> u32 {
    0x8000_0000 | (chain_id as u32)
}

/// Coin type to query for an address usable on `chain_id`.
///
/// Ethereum mainnet keeps its native record (60); every other chain uses the
/// ENSIP-11 derived coin type.
pub fn coin_type_for_chain(chain_id: u64) -> u32 {
    if chain_id == 1 {
        ETH_COIN_TYPE
    } else {
        evm_coin_type(chain_id)
    }
}

/// Normalizes a dotted name for lookup.
///
/// This covers the practical subset of ENSIP-15: case folding, non-empty
/// labels, no whitespace, control, invisible or ASCII punctuation characters
/// other than `-` and a leading run of `_`, and no `--` label extension in
/// ASCII labels.
pub fn normalize(name: &str) -> Result<String, EthError> {
    if name.is_empty() {
        return Err(EthError::InvalidName("name is empty".into()));
    }

    let labels = name
        .split('.')
        .map(normalize_label)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(labels.join("."))
}

fn normalize_label(label: &str) -> Result<String, EthError> {
    if label.is_empty() {
        return Err(EthError::InvalidName("empty label".into()));
    }

    let folded: String = label.chars().flat_map(char::to_lowercase).collect();

    let underscores = folded.chars().take_while(|&c| c == '_').count();
    for (i, c) in folded.chars().enumerate() {
        let allowed = match c {
            'a'..='z' | '0'..='9' | '-' => true,
            '_' => i < underscores,
            c if c.is_ascii() => false,
            c if c.is_whitespace() || c.is_control() => false,
            '\u{200b}'..='\u{200f}' | '\u{2060}' | '\u{feff}' => false,
            '\u{3002}' | '\u{ff0e}' | '\u{ff61}' => false,
            _ => true,
        };
        if !allowed {
            return Err(EthError::InvalidName(format!(
                "disallowed character {c:?} in label {label:?}"
            )));
        }
    }

    if folded.is_ascii() && folded.len() >= 4 && &folded[2..4] == "--" {
        return Err(EthError::InvalidName(format!(
            "invalid label extension in {label:?}"
        )));
    }

    if folded.len() > MAX_LABEL_LEN {
        return Err(EthError::InvalidName(format!(
            "label longer than {MAX_LABEL_LEN} bytes"
        )));
    }

    Ok(folded)
}

/// Computes the EIP-137 namehash of an already normalized name.
pub fn namehash(name: &str) -> B256 {
    let mut node = [0u8; 32];
    if name.is_empty() {
        return B256::from(node);
    }

    for label in name.rsplit('.') {
        let label_hash = Keccak256::digest(label.as_bytes());
        let mut hasher = Keccak256::new();
        hasher.update(node);
        hasher.update(label_hash);
        node.copy_from_slice(&hasher.finalize());
    }

    B256::from(node)
}

/// Encodes a normalized name in DNS wire format: length-prefixed labels and
/// a terminating zero byte.
pub fn dns_encode(name: &str) -> Result<Vec<u8>, EthError> {
    let mut out = Vec::with_capacity(name.len() + 2);
    for label in name.split('.') {
        let len = u8::try_from(label.len())
            .map_err(|_| EthError::InvalidName(format!("label too long: {label:?}")))?;
        if len == 0 {
            return Err(EthError::InvalidName("empty label".into()));
        }
        out.push(len);
        out.extend_from_slice(label.as_bytes());
    }
    out.push(0);
    Ok(out)
}

/// Calldata of the record read for `coin_type` on the name's resolver.
fn record_calldata(node: B256, coin_type: u32) -> Vec<u8> {
    if coin_type == ETH_COIN_TYPE {
        encode_function_call(abi::selector("addr(bytes32)"), &[AbiParam::FixedBytes(node)])
    } else {
        encode_function_call(
            abi::selector("addr(bytes32,uint256)"),
            &[
                AbiParam::FixedBytes(node),
                AbiParam::Uint256(U256::from(coin_type)),
            ],
        )
    }
}

/// Encodes the universal resolver `resolve(bytes,bytes)` call looking up the
/// address record of `name` (normalized) for `coin_type`.
pub fn encode_resolve_call(name: &str, coin_type: u32) -> Result<Vec<u8>, EthError> {
    let dns_name = dns_encode(name)?;
    let record = record_calldata(namehash(name), coin_type);

    Ok(encode_function_call(
        abi::selector("resolve(bytes,bytes)"),
        &[AbiParam::Bytes(dns_name), AbiParam::Bytes(record)],
    ))
}

/// Decodes the `(bytes result, address resolver)` returned by the universal
/// resolver into the address record, if one is set.
///
/// A zero address or an empty multicoin record means "no record".
pub fn decode_resolve_result(data: &[u8], coin_type: u32) -> Result<Option<Address>, EthError> {
    let record = abi::decode_bytes(data, 0)?;

    let address = if coin_type == ETH_COIN_TYPE {
        abi::decode_address(&record, 0)?
    } else {
        let raw = abi::decode_bytes(&record, 0)?;
        match raw.len() {
            0 => return Ok(None),
            20 => Address::from_slice(&raw),
            n => {
                return Err(EthError::DecodingError(format!(
                    "expected a 20-byte EVM address record, got {n} bytes"
                )))
            }
        }
    };

    Ok((!address.is_zero()).then_some(address))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex32(s: &str) -> B256 {
        s.parse().unwrap()
    }

    #[test]
    fn coin_type_for_bsc() {
        assert_eq!(evm_coin_type(56), 2_147_483_704);
        assert_eq!(coin_type_for_chain(56), 2_147_483_704);
    }

    #[test]
    fn coin_type_for_mainnet_is_native() {
        assert_eq!(coin_type_for_chain(1), ETH_COIN_TYPE);
    }

    #[test]
    fn coin_type_truncates_to_32_bits() {
        assert_eq!(evm_coin_type((1u64 << 32) | 10), 0x8000_000a);
    }

    #[test]
    fn namehash_vectors() {
        assert_eq!(namehash(""), B256::ZERO);
        assert_eq!(
            namehash("eth"),
            hex32("0x93cdeb708b7545dc668eb9280176169d1c33cfd8ed6f04690a0bcc88a93fc4ae")
        );
        assert_eq!(
            namehash("foo.eth"),
            hex32("0xde9b09fd7c5f901e23a3f19fecc54828e9c848539801e86591bd9801b019f84f")
        );
    }

    #[test]
    fn normalize_folds_case() {
        assert_eq!(normalize("Vitalik.ETH").unwrap(), "vitalik.eth");
    }

    #[test]
    fn normalize_accepts_unicode_labels() {
        assert_eq!(normalize("🦊.eth").unwrap(), "🦊.eth");
        assert_eq!(normalize("ÖL.eth").unwrap(), "öl.eth");
    }

    #[test]
    fn normalize_rejects_bad_input() {
        assert!(normalize("").is_err());
        assert!(normalize("foo..eth").is_err());
        assert!(normalize(".eth").is_err());
        assert!(normalize("foo bar.eth").is_err());
        assert!(normalize("foo!.eth").is_err());
        assert!(normalize("a\u{200b}b.eth").is_err());
        assert!(normalize("ab--c.eth").is_err());
        assert!(normalize("a_b.eth").is_err());
    }

    #[test]
    fn normalize_allows_leading_underscores_and_hyphens() {
        assert_eq!(normalize("__a-b.eth").unwrap(), "__a-b.eth");
    }

    #[test]
    fn dns_encoding() {
        assert_eq!(
            dns_encode("foo.eth").unwrap(),
            vec![3, b'f', b'o', b'o', 3, b'e', b't', b'h', 0]
        );
    }

    #[test]
    fn record_selectors() {
        assert_eq!(abi::selector("addr(bytes32)"), [0x3b, 0x3b, 0x57, 0xde]);
        assert_eq!(abi::selector("addr(bytes32,uint256)"), [0xf1, 0xcb, 0x7e, 0x06]);
        assert_eq!(abi::selector("resolve(bytes,bytes)"), [0x90, 0x61, 0xb9, 0x23]);
    }

    #[test]
    fn resolve_call_embeds_record_calldata() {
        let data = encode_resolve_call("foo.eth", ETH_COIN_TYPE).unwrap();
        assert_eq!(&data[..4], &[0x90, 0x61, 0xb9, 0x23]);

        let args = &data[4..];
        assert_eq!(abi::decode_bytes(args, 0).unwrap(), dns_encode("foo.eth").unwrap());

        let record = abi::decode_bytes(args, 1).unwrap();
        assert_eq!(&record[..4], &[0x3b, 0x3b, 0x57, 0xde]);
        assert_eq!(&record[4..36], namehash("foo.eth").as_slice());
    }

    #[test]
    fn resolve_call_multicoin_carries_coin_type() {
        let data = encode_resolve_call("foo.eth", evm_coin_type(10)).unwrap();
        let record = abi::decode_bytes(&data[4..], 1).unwrap();
        assert_eq!(&record[..4], &[0xf1, 0xcb, 0x7e, 0x06]);
        assert_eq!(
            abi::decode_uint256(&record[4..], 1).unwrap(),
            U256::from(0x8000_000au32)
        );
    }

    fn universal_response(record: Vec<u8>) -> Vec<u8> {
        abi::encode_params(&[
            AbiParam::Bytes(record),
            AbiParam::Address(Address::repeat_byte(0x99)),
        ])
    }

    #[test]
    fn decode_native_record() {
        let target = Address::repeat_byte(0x42);
        let record = abi::encode_params(&[AbiParam::Address(target)]);
        let decoded = decode_resolve_result(&universal_response(record), ETH_COIN_TYPE).unwrap();
        assert_eq!(decoded, Some(target));
    }

    #[test]
    fn decode_unset_native_record() {
        let record = abi::encode_params(&[AbiParam::Address(Address::ZERO)]);
        let decoded = decode_resolve_result(&universal_response(record), ETH_COIN_TYPE).unwrap();
        assert_eq!(decoded, None);
    }

    #[test]
    fn decode_multicoin_record() {
        let target = Address::repeat_byte(0x24);
        let record = abi::encode_params(&[AbiParam::Bytes(target.to_vec())]);
        let coin = evm_coin_type(8453);
        assert_eq!(
            decode_resolve_result(&universal_response(record), coin).unwrap(),
            Some(target)
        );
    }

    #[test]
    fn decode_empty_multicoin_record() {
        let record = abi::encode_params(&[AbiParam::Bytes(Vec::new())]);
        let coin = evm_coin_type(8453);
        assert_eq!(decode_resolve_result(&universal_response(record), coin).unwrap(), None);
    }
}
