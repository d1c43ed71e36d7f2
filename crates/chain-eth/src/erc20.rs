//! ERC-20 metadata reads and the on-chain USD reference rate.

use alloy_primitives::{address, Address, U256};

use crate::abi::{self, encode_function_call, AbiParam};
use crate::error::EthError;

/// Function selector for `decimals()`: `0x313ce567`.
const DECIMALS_SELECTOR: [u8; 4] = [0x31, 0x3c, 0xe5, 0x67];

/// Function selector for `symbol()`: `0x95d89b41`.
const SYMBOL_SELECTOR: [u8; 4] = [0x95, 0xd8, 0x9b, 0x41];

/// Spot-price aggregator (1inch off-chain oracle) on Ethereum mainnet.
pub const PRICE_ORACLE: Address = address!("07D91f5fb9Bf7798734C3f606dB065549F6893bb");

/// USDC on Ethereum mainnet, the source side of the reference pair.
pub const USDC: Address = address!("A0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48");

/// WETH on Ethereum mainnet, the destination side of the reference pair.
pub const WETH: Address = address!("C02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2");

pub const USDC_DECIMALS: i32 = 6;
pub const WETH_DECIMALS: i32 = 18;

/// Encodes an ERC-20 `decimals()` call.
pub fn encode_decimals() -> Vec<u8> {
    encode_function_call(DECIMALS_SELECTOR, &[])
}

/// Encodes an ERC-20 `symbol()` call.
pub fn encode_symbol() -> Vec<u8> {
    encode_function_call(SYMBOL_SELECTOR, &[])
}

/// Decodes the `uint8` returned by `decimals()`.
pub fn decode_decimals(data: &[u8]) -> Result<u8, EthError> {
    let value = abi::decode_uint256(data, 0)?;
    u64::try_from(value)
        .ok()
        .and_then(|v| u8::try_from(v).ok())
        .ok_or_else(|| EthError::DecodingError(format!("decimals {value} exceeds uint8")))
}

/// Decodes the `string` (or legacy `bytes32`) returned by `symbol()`.
pub fn decode_symbol(data: &[u8]) -> Result<String, EthError> {
    abi::decode_string(data)
}

/// Encodes `getRate(address,address,bool)` on the price oracle for the
/// USDC → WETH pair, without wrapper resolution.
pub fn encode_usdc_weth_rate() -> Vec<u8> {
    encode_function_call(
        abi::selector("getRate(address,address,bool)"),
        &[
            AbiParam::Address(USDC),
            AbiParam::Address(WETH),
            AbiParam::Bool(false),
        ],
    )
}

/// Decodes the `uint256 weightedRate` returned by `getRate`.
pub fn decode_rate(data: &[u8]) -> Result<U256, EthError> {
    abi::decode_uint256(data, 0)
}

/// Converts the oracle's USDC → WETH rate into the USD price of one native
/// unit.
///
/// `price = 1 / (rate * 10^usdc / (10^18 * 10^weth))`. Returns `None` when
/// the oracle reports a zero rate.
pub fn native_usd_price(rate: U256) -> Option<f64> {
    let rate = u256_to_f64(rate);
    if rate <= 0.0 {
        return None;
    }

    let numerator = 10f64.powi(USDC_DECIMALS);
    let denominator = 10f64.powi(WETH_DECIMALS);
    let conversion_factor = numerator / (1e18 * denominator);
    let price = 1.0 / (rate * conversion_factor);

    price.is_finite().then_some(price)
}

/// Lossy conversion used only for display-grade price math.
pub fn u256_to_f64(value: U256) -> f64 {
    value
        .as_limbs()
        .iter()
        .rev()
        .fold(0.0, |acc, &limb| acc * 18_446_744_073_709_551_616.0 + limb as f64)
}
