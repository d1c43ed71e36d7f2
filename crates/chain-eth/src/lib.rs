//! Ethereum/EVM primitives for the multi-chain wallet.
//!
//! This crate provides:
//! - Address parsing, validation and EIP-55 checksums
//! - Minimal ABI encoding/decoding (static words plus dynamic `bytes`/`string`)
//! - ERC-20 and price-oracle call encoding
//! - ENS name normalization, namehash and ENSIP-11 coin types
//! - EIP-1559 transaction building and signing
//! - The built-in catalog of EVM chain definitions
//!
//! Nothing in here performs I/O.

pub mod abi;
pub mod address;
pub mod chains;
pub mod ens;
pub mod erc20;
pub mod error;
pub mod transaction;

pub use alloy_primitives::{Address, Bytes, B256, U256};
