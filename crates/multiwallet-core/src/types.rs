use std::fmt;

use alloy_primitives::{Address, Bytes, B256, U256};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// A raw secp256k1 private key, zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PrivateKey([u8; 32]);

impl PrivateKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// 0x-prefixed hex rendering, for explicit export by the user.
    pub fn to_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!("0x{}", hex::encode(self.0)))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateKey(<redacted>)")
    }
}

/// An account derived from the seed phrase. Never stored; recomputed on
/// demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedAccount {
    pub index: u32,
    pub address: Address,
    pub private_key: PrivateKey,
}

/// A derived account merged with its persisted display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedAccount {
    pub index: u32,
    pub address: Address,
    pub name: String,
}

/// One user-curated chain in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainEntry {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
}

impl ChainEntry {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            rpc_url: None,
        }
    }

    pub fn with_rpc_url(mut self, url: impl Into<String>) -> Self {
        self.rpc_url = Some(url.into());
        self
    }
}

/// The call a transaction makes: recipient, native value and calldata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxRequest {
    pub to: Address,
    pub value: U256,
    pub data: Bytes,
}

/// A broadcast transaction whose confirmation has not been observed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingTransaction {
    pub hash: B256,
    pub chain_id: u64,
}

/// The parts of a transaction receipt the wallet reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TxReceipt {
    pub transaction_hash: B256,
    pub block_number: u64,
    /// `false` when the transaction was mined but reverted.
    pub success: bool,
    pub gas_used: u64,
}

/// Outcome of a submit-and-confirm cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SentTransaction {
    pub hash: B256,
    pub chain_id: u64,
    pub receipt: TxReceipt,
    /// `{explorer}/tx/{hash}` when the chain has a block explorer.
    pub explorer_url: Option<String>,
}
