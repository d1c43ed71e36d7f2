//! Read and write clients for one chain, and their resolution from a chain id.
//!
//! Resolution is stateless: a client is rebuilt for every operation from the
//! catalog (required metadata) and the registry (optional custom RPC URL).

use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{Address, B256, U256};
use chain_eth::chains::{self, EvmChain};
use chain_eth::transaction::{sign_transaction, EthTransaction};
use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::accounts::AccountDeriver;
use crate::config::DEFAULT_POLL_INTERVAL;
use crate::error::WalletError;
use crate::registry::ChainRegistry;
use crate::rpc::{self, Connector, RpcTransport};
use crate::types::{DerivedAccount, PendingTransaction, TxReceipt, TxRequest};

/// Priority fee used when the node has no `eth_maxPriorityFeePerGas`.
pub const FALLBACK_PRIORITY_FEE: u128 = 1_500_000_000;

/// EIP-1559 fee parameters in wei.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeeEstimate {
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

/// How long and how often to poll for a receipt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationPolicy {
    pub poll_interval: Duration,
    pub timeout: Option<Duration>,
}

impl Default for ConfirmationPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            timeout: None,
        }
    }
}

#[derive(Clone)]
pub struct ReadClient {
    chain: &'static EvmChain,
    transport: Arc<dyn RpcTransport>,
    confirmation: ConfirmationPolicy,
}

impl ReadClient {
    pub fn new(chain: &'static EvmChain, transport: Arc<dyn RpcTransport>) -> Self {
        Self {
            chain,
            transport,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn chain(&self) -> &'static EvmChain {
        self.chain
    }

    pub fn chain_id(&self) -> u64 {
        self.chain.chain_id
    }

    pub fn rpc_url(&self) -> &str {
        self.transport.url()
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, WalletError> {
        Ok(self.transport.request(method, params).await?)
    }

    /// Native balance of `address` in wei.
    pub async fn balance(&self, address: Address) -> Result<U256, WalletError> {
        let result = self
            .request("eth_getBalance", json!([rpc::address_hex(&address), "latest"]))
            .await?;
        Ok(rpc::parse_u256(&result, "eth_getBalance")?)
    }

    /// `eth_call` against the latest block; returns the raw return data.
    pub async fn call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>, WalletError> {
        let result = self
            .request(
                "eth_call",
                json!([{ "to": rpc::address_hex(&to), "data": rpc::data_hex(data) }, "latest"]),
            )
            .await?;
        Ok(rpc::parse_data(&result, "eth_call")?)
    }

    /// Next nonce for `address`, counting pending transactions.
    pub async fn nonce(&self, address: Address) -> Result<u64, WalletError> {
        let result = self
            .request(
                "eth_getTransactionCount",
                json!([rpc::address_hex(&address), "pending"]),
            )
            .await?;
        Ok(rpc::parse_u64(&result, "eth_getTransactionCount")?)
    }

    /// EIP-1559 fees: `max_fee = 2 * base_fee + priority_fee`.
    ///
    /// Chains without a base fee get the legacy gas price in both fields.
    pub async fn fees(&self) -> Result<FeeEstimate, WalletError> {
        let block = self
            .request("eth_getBlockByNumber", json!(["latest", false]))
            .await?;

        let Some(base_fee) = block.get("baseFeePerGas").filter(|v| !v.is_null()) else {
            let price = self.request("eth_gasPrice", json!([])).await?;
            let price = rpc::parse_u128(&price, "eth_gasPrice")?;
            return Ok(FeeEstimate {
                max_fee_per_gas: price,
                max_priority_fee_per_gas: price,
            });
        };
        let base_fee = rpc::parse_u128(base_fee, "baseFeePerGas")?;

        let priority = match self.request("eth_maxPriorityFeePerGas", json!([])).await {
            Ok(value) => rpc::parse_u128(&value, "eth_maxPriorityFeePerGas")?,
            Err(e) => {
                debug!(
                    chain_id = self.chain_id(),
                    error = %e,
                    "priority fee unavailable, using fallback"
                );
                FALLBACK_PRIORITY_FEE
            }
        };

        Ok(FeeEstimate {
            max_fee_per_gas: base_fee.saturating_mul(2).saturating_add(priority),
            max_priority_fee_per_gas: priority,
        })
    }

    /// Gas estimate for `request` sent from `from`, with a 20% buffer.
    pub async fn estimate_gas(
        &self,
        from: Address,
        request: &TxRequest,
    ) -> Result<u64, WalletError> {
        let result = self
            .request(
                "eth_estimateGas",
                json!([{
                    "from": rpc::address_hex(&from),
                    "to": rpc::address_hex(&request.to),
                    "value": rpc::quantity(request.value),
                    "data": rpc::data_hex(&request.data),
                }]),
            )
            .await?;
        let estimate = rpc::parse_u64(&result, "eth_estimateGas")?;
        Ok(estimate.saturating_add(estimate / 5))
    }

    /// Broadcasts a signed transaction and returns its hash.
    pub async fn send_raw_transaction(&self, raw_tx: &[u8]) -> Result<B256, WalletError> {
        let result = self
            .request("eth_sendRawTransaction", json!([rpc::data_hex(raw_tx)]))
            .await?;
        Ok(rpc::parse_b256(&result, "eth_sendRawTransaction")?)
    }

    /// The receipt of `hash`, or `None` while it is still pending.
    pub async fn receipt(&self, hash: B256) -> Result<Option<TxReceipt>, WalletError> {
        let result = self
            .request("eth_getTransactionReceipt", json!([format!("{hash:#x}")]))
            .await?;
        Ok(parse_receipt(&result)?)
    }

    /// Polls until `hash` has a receipt.
    ///
    /// Without a configured timeout this waits as long as the node keeps
    /// answering. Transport errors end the wait.
    pub async fn wait_for_receipt(&self, hash: B256) -> Result<TxReceipt, WalletError> {
        let started = Instant::now();
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                return Ok(receipt);
            }
            let waited = started.elapsed();
            if let Some(limit) = self.confirmation.timeout {
                if waited >= limit {
                    return Err(WalletError::ConfirmationTimeout { hash, waited });
                }
            }
            debug!(%hash, ?waited, "receipt pending");
            tokio::time::sleep(self.confirmation.poll_interval).await;
        }
    }
}

fn parse_receipt(value: &Value) -> Result<Option<TxReceipt>, crate::error::RpcError> {
    if value.is_null() {
        return Ok(None);
    }
    let block_number = match value.get("blockNumber") {
        None | Some(Value::Null) => return Ok(None),
        Some(block) => rpc::parse_u64(block, "blockNumber")?,
    };
    let field = |name: &str| value.get(name).unwrap_or(&Value::Null);

    Ok(Some(TxReceipt {
        transaction_hash: rpc::parse_b256(field("transactionHash"), "transactionHash")?,
        block_number,
        // Pre-Byzantium receipts carry no status; treat them as success.
        success: match value.get("status") {
            None | Some(Value::Null) => true,
            Some(status) => rpc::parse_u64(status, "status")? == 1,
        },
        gas_used: rpc::parse_u64(field("gasUsed"), "gasUsed")?,
    }))
}

/// A read client bound to a derived account that can sign.
#[derive(Clone)]
pub struct WriteClient {
    reader: ReadClient,
    account: DerivedAccount,
}

impl WriteClient {
    pub fn new(reader: ReadClient, account: DerivedAccount) -> Self {
        Self { reader, account }
    }

    pub fn reader(&self) -> &ReadClient {
        &self.reader
    }

    pub fn address(&self) -> Address {
        self.account.address
    }

    pub fn chain(&self) -> &'static EvmChain {
        self.reader.chain()
    }

    /// Builds, signs and broadcasts an EIP-1559 transaction.
    pub async fn send_transaction(
        &self,
        request: &TxRequest,
    ) -> Result<PendingTransaction, WalletError> {
        let from = self.account.address;
        let (nonce, fees, gas_limit) = tokio::try_join!(
            self.reader.nonce(from),
            self.reader.fees(),
            self.reader.estimate_gas(from, request),
        )?;

        let tx = EthTransaction {
            chain_id: self.reader.chain_id(),
            nonce,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
            max_fee_per_gas: fees.max_fee_per_gas,
            gas_limit,
            to: request.to,
            value: request.value,
            data: request.data.clone(),
        };
        let signed = sign_transaction(&tx, self.account.private_key.as_bytes())?;

        let hash = self.reader.send_raw_transaction(&signed.raw_tx).await?;
        if hash != signed.tx_hash {
            warn!(
                node = %hash,
                local = %signed.tx_hash,
                "node reported a different transaction hash"
            );
        }
        info!(chain_id = tx.chain_id, %hash, nonce, "transaction submitted");

        Ok(PendingTransaction {
            hash,
            chain_id: tx.chain_id,
        })
    }
}

/// Builds clients from the catalog, the registry and the derived accounts.
#[derive(Clone)]
pub struct ClientResolver {
    registry: ChainRegistry,
    deriver: AccountDeriver,
    connector: Arc<dyn Connector>,
    confirmation: ConfirmationPolicy,
}

impl ClientResolver {
    pub fn new(
        registry: ChainRegistry,
        deriver: AccountDeriver,
        connector: Arc<dyn Connector>,
    ) -> Self {
        Self {
            registry,
            deriver,
            connector,
            confirmation: ConfirmationPolicy::default(),
        }
    }

    pub fn with_confirmation(mut self, confirmation: ConfirmationPolicy) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn registry(&self) -> &ChainRegistry {
        &self.registry
    }

    pub fn deriver(&self) -> &AccountDeriver {
        &self.deriver
    }

    /// A read client for `chain_id`.
    ///
    /// The chain must be in the catalog (first match wins for duplicate
    /// ids). The registry's custom RPC URL is used when present; a failed
    /// registry read falls back to the catalog default.
    pub async fn resolve_read_client(&self, chain_id: u64) -> Result<ReadClient, WalletError> {
        let chain = chains::get_chain(chain_id).ok_or(WalletError::UnsupportedChain(chain_id))?;
        let custom = match self.registry.rpc_url(chain_id).await {
            Ok(url) => url,
            Err(e) => {
                warn!(chain_id, error = %e, "registry lookup failed, using default RPC");
                None
            }
        };
        self.client_at(chain, custom.as_deref())
    }

    /// A signing client for `account` on `chain_id`. Fails with
    /// `AccountNotFound` when `account` is not one of the derived accounts.
    pub async fn resolve_write_client(
        &self,
        chain_id: u64,
        account: Address,
    ) -> Result<WriteClient, WalletError> {
        let reader = self.resolve_read_client(chain_id).await?;
        let account = self.deriver.find_by_address(account)?;
        Ok(WriteClient::new(reader, account))
    }

    /// A read client for a catalog chain at an explicit URL, or the
    /// catalog default when `rpc_url` is `None`.
    pub fn client_at(
        &self,
        chain: &'static EvmChain,
        rpc_url: Option<&str>,
    ) -> Result<ReadClient, WalletError> {
        let url = rpc_url.unwrap_or(chain.rpc_url);
        debug!(chain_id = chain.chain_id, url, "resolved RPC endpoint");
        let transport = self.connector.connect(url)?;
        Ok(ReadClient::new(chain, transport).with_confirmation(self.confirmation))
    }
}
