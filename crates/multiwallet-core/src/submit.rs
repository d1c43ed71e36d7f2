//! Submit-and-confirm for raw sends and quoted swaps.

use alloy_primitives::utils::parse_ether;
use alloy_primitives::{Address, Bytes, U256};
use chain_eth::address as eth_address;
use tracing::{info, warn};

use crate::client::{ClientResolver, WriteClient};
use crate::error::WalletError;
use crate::names::NameResolver;
use crate::quote::Quote;
use crate::types::{SentTransaction, TxRequest};

/// The raw-send form as entered by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendForm {
    pub from: String,
    pub chain_id: String,
    /// An address or a name.
    pub to: String,
    /// Ether amount; blank means zero.
    pub value: String,
    /// 0x-prefixed calldata; blank means none.
    pub data: String,
}

/// A form that passed validation. The recipient may still be a name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSend {
    pub from: Address,
    pub chain_id: u64,
    pub to: String,
    pub value: U256,
    pub data: Bytes,
}

impl SendForm {
    pub fn validate(&self) -> Result<ValidatedSend, WalletError> {
        let from = eth_address::parse_address(self.from.trim())?;

        let chain_id = self.chain_id.trim().parse::<u64>().map_err(|_| {
            WalletError::InvalidInput(format!("chain id must be a number, got {:?}", self.chain_id))
        })?;

        let to = self.to.trim();
        if to.is_empty() {
            return Err(WalletError::InvalidInput("recipient is required".to_string()));
        }

        let value = match self.value.trim() {
            "" => U256::ZERO,
            v if v.starts_with('-') => {
                return Err(WalletError::InvalidInput(format!("invalid ether amount {v:?}")))
            }
            v => parse_ether(v)
                .map_err(|e| {
                    WalletError::InvalidInput(format!("invalid ether amount {v:?}: {e}"))
                })?,
        };

        Ok(ValidatedSend {
            from,
            chain_id,
            to: to.to_string(),
            value,
            data: parse_calldata(&self.data)?,
        })
    }
}

fn parse_calldata(input: &str) -> Result<Bytes, WalletError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Bytes::new());
    }
    let digits = input
        .strip_prefix("0x")
        .ok_or_else(|| WalletError::InvalidInput("data must start with 0x".to_string()))?;
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| WalletError::InvalidInput(format!("data is not valid hex: {e}")))
}

#[derive(Clone)]
pub struct TransactionSubmitter {
    clients: ClientResolver,
    names: NameResolver,
}

impl TransactionSubmitter {
    pub fn new(clients: ClientResolver, names: NameResolver) -> Self {
        Self { clients, names }
    }

    /// Sends `request` and waits for its receipt.
    ///
    /// Failures to submit or to observe the receipt are reported as
    /// `TransactionFailed`; nothing is retried. A configured confirmation
    /// timeout surfaces as `ConfirmationTimeout` so the caller keeps the hash.
    pub async fn send(
        &self,
        client: &WriteClient,
        request: &TxRequest,
    ) -> Result<SentTransaction, WalletError> {
        let pending = client
            .send_transaction(request)
            .await
            .map_err(|e| WalletError::transaction("submission", e))?;

        let receipt = match client.reader().wait_for_receipt(pending.hash).await {
            Ok(receipt) => receipt,
            Err(e @ WalletError::ConfirmationTimeout { .. }) => return Err(e),
            Err(e) => return Err(WalletError::transaction("confirmation", e)),
        };

        if receipt.success {
            info!(
                chain_id = pending.chain_id,
                hash = %pending.hash,
                block = receipt.block_number,
                "transaction confirmed"
            );
        } else {
            warn!(
                chain_id = pending.chain_id,
                hash = %pending.hash,
                block = receipt.block_number,
                "transaction reverted"
            );
        }

        Ok(SentTransaction {
            hash: pending.hash,
            chain_id: pending.chain_id,
            explorer_url: client.chain().tx_url(&format!("{:#x}", pending.hash)),
            receipt,
        })
    }

    /// Validates and sends the raw-send form.
    ///
    /// The chain must have a custom RPC URL in the registry. A name
    /// recipient is resolved for the target chain first.
    pub async fn send_raw(&self, form: &SendForm) -> Result<SentTransaction, WalletError> {
        let send = form.validate()?;

        if self.clients.registry().rpc_url(send.chain_id).await?.is_none() {
            return Err(WalletError::NoRpcUrlConfigured(send.chain_id));
        }
        let to = self.names.resolve_recipient(&send.to, send.chain_id).await?;
        let client = self.clients.resolve_write_client(send.chain_id, send.from).await?;

        self.send(
            &client,
            &TxRequest {
                to,
                value: send.value,
                data: send.data,
            },
        )
        .await
    }

    /// Executes a quote from `from`, using its `to`, `value` and `data`
    /// verbatim.
    pub async fn send_quote(
        &self,
        from: Address,
        quote: &Quote,
    ) -> Result<SentTransaction, WalletError> {
        let client = self
            .clients
            .resolve_write_client(quote.request.chain_id, from)
            .await?;
        self.send(&client, &quote.tx_request()?).await
    }
}
