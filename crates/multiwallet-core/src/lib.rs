//! Multi-chain EVM wallet core.
//!
//! Derives accounts from one seed phrase, keeps a user-curated registry of
//! chains and RPC endpoints, resolves ENS names across chains, prices swaps
//! through the 0x aggregator, and submits and confirms transactions.

pub mod accounts;
pub mod client;
pub mod config;
pub mod error;
pub mod hd_derivation;
pub mod mnemonic;
pub mod names;
pub mod quote;
pub mod registry;
pub mod rpc;
pub mod store;
pub mod submit;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod test_support;

pub use accounts::{derive_account, derive_accounts, AccountBook, AccountDeriver};
pub use client::{ClientResolver, ReadClient, WriteClient};
pub use config::WalletConfig;
pub use error::{RpcError, WalletError};
pub use mnemonic::SeedPhrase;
pub use names::NameResolver;
pub use quote::{Quote, QuoteEngine, QuoteRequest, QuoteWatcher};
pub use registry::ChainRegistry;
pub use store::{JsonFileStore, KeyValueStore, MemoryStore};
pub use submit::{SendForm, TransactionSubmitter};
pub use types::{ChainEntry, DerivedAccount, NamedAccount, SentTransaction, TxReceipt, TxRequest};
pub use wallet::Wallet;

pub use alloy_primitives::{Address, Bytes, B256, U256};
