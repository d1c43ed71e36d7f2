use std::time::Duration;

use alloy_primitives::{Address, B256};
use chain_eth::error::EthError;
use thiserror::Error;

/// Failures of the JSON-RPC transport.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Execution reverted: {0}")]
    Reverted(String),

    #[error("Malformed RPC response: {0}")]
    InvalidResponse(String),
}

impl RpcError {
    /// Builds the error for a JSON-RPC `error` object, classifying reverts.
    pub fn from_error_object(code: i64, message: String) -> Self {
        // Geth and most providers report reverts as code 3 or with this prefix.
        if code == 3 || message.to_ascii_lowercase().contains("execution reverted") {
            RpcError::Reverted(message)
        } else {
            RpcError::Rpc { code, message }
        }
    }
}

#[derive(Debug, Error)]
pub enum WalletError {
    #[error("Invalid mnemonic: {0}")]
    InvalidMnemonic(String),

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Unsupported chain: {0}")]
    UnsupportedChain(u64),

    #[error("Account not found: {0}")]
    AccountNotFound(Address),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("No RPC URL configured for chain {0}")]
    NoRpcUrlConfigured(u64),

    #[error("Chain {0} is not in the registry")]
    ChainNotRegistered(u64),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Transaction failed during {stage}: {source}")]
    TransactionFailed {
        stage: &'static str,
        #[source]
        source: Box<WalletError>,
    },

    #[error("Transaction {hash} not confirmed after {waited:?}")]
    ConfirmationTimeout { hash: B256, waited: Duration },

    #[error("Quote request failed: {0}")]
    Quote(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl WalletError {
    /// Wraps an error raised while submitting or confirming a transaction.
    pub fn transaction(stage: &'static str, source: WalletError) -> Self {
        WalletError::TransactionFailed {
            stage,
            source: Box::new(source),
        }
    }
}

impl From<EthError> for WalletError {
    fn from(e: EthError) -> Self {
        match e {
            EthError::InvalidName(msg) => WalletError::InvalidName(msg),
            EthError::InvalidAddress(msg) => {
                WalletError::InvalidInput(format!("invalid address: {msg}"))
            }
            EthError::DecodingError(msg) => RpcError::InvalidResponse(msg).into(),
            EthError::InvalidPrivateKey(msg) | EthError::InvalidPublicKey(msg) => {
                WalletError::DerivationFailed(msg)
            }
            EthError::SigningError(msg) => WalletError::SigningFailed(msg),
        }
    }
}

impl From<bip39::Error> for WalletError {
    fn from(e: bip39::Error) -> Self {
        WalletError::InvalidMnemonic(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_unsupported_chain() {
        let err = WalletError::UnsupportedChain(999);
        assert_eq!(err.to_string(), "Unsupported chain: 999");
    }

    #[test]
    fn display_account_not_found_uses_checksum() {
        let addr: Address = "0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf".parse().unwrap();
        let err = WalletError::AccountNotFound(addr);
        assert_eq!(
            err.to_string(),
            "Account not found: 0x7E5F4552091A69125d5DfCb7b8C2659029395Bdf"
        );
    }

    #[test]
    fn transaction_failed_keeps_source() {
        let inner = WalletError::Rpc(RpcError::Rpc {
            code: -32000,
            message: "nonce too low".into(),
        });
        let err = WalletError::transaction("submission", inner);
        assert!(err.to_string().contains("submission"));
        assert!(err.to_string().contains("nonce too low"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn revert_classification() {
        assert!(matches!(
            RpcError::from_error_object(3, "execution reverted".into()),
            RpcError::Reverted(_)
        ));
        assert!(matches!(
            RpcError::from_error_object(-32000, "Execution reverted: no resolver".into()),
            RpcError::Reverted(_)
        ));
        assert!(matches!(
            RpcError::from_error_object(-32601, "method not found".into()),
            RpcError::Rpc { code: -32601, .. }
        ));
    }

    #[test]
    fn eth_errors_map_to_taxonomy() {
        let err: WalletError = EthError::InvalidName("bad".into()).into();
        assert!(matches!(err, WalletError::InvalidName(_)));

        let err: WalletError = EthError::InvalidAddress("short".into()).into();
        assert!(matches!(err, WalletError::InvalidInput(_)));

        let err: WalletError = EthError::DecodingError("short".into()).into();
        assert!(matches!(err, WalletError::Rpc(RpcError::InvalidResponse(_))));
    }
}
