//! Swap quotes from the 0x aggregator, priced in USD through an on-chain
//! oracle.
//!
//! A quote always sells the chain's native asset. The quoted transaction
//! (`to`, `value`, `data`) is executable as is by the submitter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::utils::{format_units, parse_ether};
use alloy_primitives::{address, Address, Bytes, U256};
use async_trait::async_trait;
use chain_eth::{address as eth_address, erc20};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::client::ClientResolver;
use crate::error::WalletError;
use crate::names::NAMING_CHAIN_ID;
use crate::types::TxRequest;

/// Sentinel the aggregator uses for the native asset.
pub const NATIVE_TOKEN: Address = address!("EeeeeEeeeEeEeeEeEeEeeEEEeeeeEeeeeeeeEEeE");

/// Receiver of the affiliate fee.
pub const FEE_RECIPIENT: Address = address!("00000b0A7308257BFD464868f14D34C5108fd898");

/// Affiliate fee taken from the bought token, as a fraction.
pub const BUY_TOKEN_PERCENTAGE_FEE: &str = "0.03";

pub const API_KEY_HEADER: &str = "0x-api-key";

/// How often a watched quote is re-fetched.
pub const QUOTE_REFRESH_INTERVAL: Duration = Duration::from_secs(10);

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

/// Chains the aggregator serves, with its network name for each.
pub const SUPPORTED_NETWORKS: [(u64, &str); 5] = [
    (1, "ethereum"),
    (8453, "base"),
    (42161, "arbitrum"),
    (10, "optimism"),
    (130, "unichain"),
];

pub fn network_name(chain_id: u64) -> Option<&'static str> {
    SUPPORTED_NETWORKS
        .iter()
        .find(|(id, _)| *id == chain_id)
        .map(|(_, name)| *name)
}

pub fn quote_url(network: &str) -> String {
    format!("https://{network}.api.0x.org/swap/v1/quote")
}

/// What to quote: sell `sell_amount` wei of the native asset for `buy_token`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QuoteRequest {
    pub buy_token: Address,
    pub sell_amount: U256,
    pub chain_id: u64,
}

impl QuoteRequest {
    /// Validates user input: a token address and a positive ether amount.
    pub fn parse(buy_token: &str, eth_amount: &str, chain_id: u64) -> Result<Self, WalletError> {
        let buy_token = eth_address::parse_address(buy_token.trim())?;
        let eth_amount = eth_amount.trim();
        if eth_amount.is_empty() || eth_amount.starts_with('-') {
            return Err(WalletError::InvalidInput(format!(
                "invalid ether amount {eth_amount:?}"
            )));
        }
        let sell_amount = parse_ether(eth_amount).map_err(|e| {
            WalletError::InvalidInput(format!("invalid ether amount {eth_amount:?}: {e}"))
        })?;
        if sell_amount.is_zero() {
            return Err(WalletError::InvalidInput(
                "ether amount must be greater than zero".to_string(),
            ));
        }
        Ok(Self {
            buy_token,
            sell_amount,
            chain_id,
        })
    }
}

/// Query parameters of one aggregator request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteQuery {
    pub buy_token: Address,
    pub sell_token: Address,
    pub sell_amount: U256,
    pub fee_recipient: Address,
    pub buy_token_percentage_fee: &'static str,
}

impl QuoteQuery {
    pub fn for_request(request: &QuoteRequest) -> Self {
        Self {
            buy_token: request.buy_token,
            sell_token: NATIVE_TOKEN,
            sell_amount: request.sell_amount,
            fee_recipient: FEE_RECIPIENT,
            buy_token_percentage_fee: BUY_TOKEN_PERCENTAGE_FEE,
        }
    }

    pub fn pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("buyToken", self.buy_token.to_checksum(None)),
            ("sellToken", self.sell_token.to_checksum(None)),
            ("sellAmount", self.sell_amount.to_string()),
            ("feeRecipient", self.fee_recipient.to_checksum(None)),
            ("buyTokenPercentageFee", self.buy_token_percentage_fee.to_string()),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiquiditySource {
    pub name: String,
    pub proportion: String,
}

/// The aggregator's quote. Amounts are decimal strings in base units, as on
/// the wire; fields not modelled here are kept in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatorQuote {
    #[serde(default)]
    pub chain_id: Option<u64>,
    pub price: String,
    #[serde(default)]
    pub gross_price: Option<String>,
    #[serde(default)]
    pub estimated_price_impact: Option<String>,
    pub to: Address,
    #[serde(default)]
    pub data: Bytes,
    pub value: String,
    #[serde(default)]
    pub gas: Option<String>,
    #[serde(default)]
    pub estimated_gas: Option<String>,
    #[serde(default)]
    pub gas_price: Option<String>,
    pub buy_token_address: Address,
    pub sell_token_address: Address,
    pub buy_amount: String,
    #[serde(default)]
    pub gross_buy_amount: Option<String>,
    pub sell_amount: String,
    #[serde(default)]
    pub allowance_target: Option<Address>,
    #[serde(default)]
    pub sources: Vec<LiquiditySource>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl AggregatorQuote {
    pub fn value_wei(&self) -> Result<U256, WalletError> {
        decimal_u256(&self.value, "value")
    }

    pub fn buy_amount(&self) -> Result<U256, WalletError> {
        decimal_u256(&self.buy_amount, "buyAmount")
    }

    /// Gross buy amount when reported, the net one otherwise.
    pub fn gross_buy_amount(&self) -> Result<U256, WalletError> {
        match &self.gross_buy_amount {
            Some(gross) => decimal_u256(gross, "grossBuyAmount"),
            None => self.buy_amount(),
        }
    }

    /// Sources that fill part of the order.
    pub fn active_sources(&self) -> impl Iterator<Item = &LiquiditySource> {
        self.sources
            .iter()
            .filter(|s| s.proportion.parse::<f64>().map(|p| p > 0.0).unwrap_or(false))
    }
}

fn decimal_u256(raw: &str, what: &str) -> Result<U256, WalletError> {
    U256::from_str_radix(raw.trim(), 10)
        .map_err(|e| WalletError::Quote(format!("malformed {what} {raw:?}: {e}")))
}

/// A priced quote: the aggregator response plus token metadata and USD
/// figures.
#[derive(Debug, Clone, PartialEq)]
pub struct Quote {
    pub request: QuoteRequest,
    pub aggregator: AggregatorQuote,
    pub decimals: u8,
    pub symbol: String,
    /// Gross buy amount in whole tokens.
    pub expected_output: String,
    /// USD price of one native unit; `None` when the oracle has no rate.
    pub native_usd_price: Option<f64>,
    /// USD value of the native amount sold; `None` when no price is known.
    pub usd_cost: Option<f64>,
}

impl Quote {
    /// The transaction that executes this quote, taken verbatim.
    pub fn tx_request(&self) -> Result<TxRequest, WalletError> {
        Ok(TxRequest {
            to: self.aggregator.to,
            value: self.aggregator.value_wei()?,
            data: self.aggregator.data.clone(),
        })
    }
}

/// Formats `amount` base units with `decimals`, dropping trailing zeros.
pub fn format_token_amount(amount: U256, decimals: u8) -> Result<String, WalletError> {
    let formatted = format_units(amount, decimals)
        .map_err(|e| WalletError::Quote(format!("cannot format amount: {e}")))?;
    if !formatted.contains('.') {
        return Ok(formatted);
    }
    Ok(formatted
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string())
}

/// USD value of `sell_amount` wei at `native_usd_price`.
pub fn usd_cost(sell_amount: U256, native_usd_price: Option<f64>) -> Option<f64> {
    let price = native_usd_price?;
    let eth = erc20::u256_to_f64(sell_amount) / 1e18;
    let cost = eth * price;
    cost.is_finite().then_some(cost)
}

/// Fetches raw quotes from the aggregator.
#[async_trait]
pub trait QuoteSource: Send + Sync {
    async fn fetch_quote(
        &self,
        network: &str,
        query: &QuoteQuery,
    ) -> Result<AggregatorQuote, WalletError>;
}

pub struct HttpQuoteSource {
    client: reqwest::Client,
    api_key: Option<SecretString>,
}

impl HttpQuoteSource {
    pub fn new(client: reqwest::Client, api_key: Option<SecretString>) -> Self {
        Self { client, api_key }
    }
}

#[async_trait]
impl QuoteSource for HttpQuoteSource {
    async fn fetch_quote(
        &self,
        network: &str,
        query: &QuoteQuery,
    ) -> Result<AggregatorQuote, WalletError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| WalletError::Quote("no 0x API key configured".to_string()))?;

        let url = url::Url::parse_with_params(&quote_url(network), query.pairs())
            .map_err(|e| WalletError::Quote(format!("invalid quote URL: {e}")))?;
        debug!(
            network,
            buy_token = %query.buy_token,
            sell_amount = %query.sell_amount,
            "requesting quote"
        );

        let response = self
            .client
            .get(url)
            .header(API_KEY_HEADER, api_key.expose_secret())
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(|e| WalletError::Quote(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(WalletError::Quote(format!("aggregator returned {status}: {body}")));
        }
        response
            .json::<AggregatorQuote>()
            .await
            .map_err(|e| WalletError::Quote(format!("malformed quote: {e}")))
    }
}

#[derive(Clone)]
pub struct QuoteEngine {
    clients: ClientResolver,
    source: Arc<dyn QuoteSource>,
}

impl QuoteEngine {
    pub fn new(clients: ClientResolver, source: Arc<dyn QuoteSource>) -> Self {
        Self { clients, source }
    }

    /// Fetches and prices a quote.
    ///
    /// The aggregator request, the token `decimals`/`symbol` reads and the
    /// oracle read run concurrently. The oracle always runs on mainnet; if it
    /// fails the USD figures are `None` and the quote is still returned.
    pub async fn get_quote(&self, request: &QuoteRequest) -> Result<Quote, WalletError> {
        let network = network_name(request.chain_id)
            .ok_or(WalletError::UnsupportedChain(request.chain_id))?;
        let token_client = self.clients.resolve_read_client(request.chain_id).await?;
        let oracle_client = self.clients.resolve_read_client(NAMING_CHAIN_ID).await?;
        let query = QuoteQuery::for_request(request);

        let (aggregator, decimals, symbol, native_usd_price) = tokio::try_join!(
            self.source.fetch_quote(network, &query),
            async {
                let data = token_client.call(request.buy_token, &erc20::encode_decimals()).await?;
                Ok::<_, WalletError>(erc20::decode_decimals(&data)?)
            },
            async {
                let data = token_client.call(request.buy_token, &erc20::encode_symbol()).await?;
                Ok::<_, WalletError>(erc20::decode_symbol(&data)?)
            },
            async {
                let price = match oracle_client
                    .call(erc20::PRICE_ORACLE, &erc20::encode_usdc_weth_rate())
                    .await
                {
                    Ok(data) => match erc20::decode_rate(&data) {
                        Ok(rate) => erc20::native_usd_price(rate),
                        Err(e) => {
                            warn!(error = %e, "malformed price oracle response, USD cost omitted");
                            None
                        }
                    },
                    Err(e) => {
                        warn!(error = %e, "price oracle unavailable, USD cost omitted");
                        None
                    }
                };
                Ok::<_, WalletError>(price)
            },
        )?;

        let expected_output = format_token_amount(aggregator.gross_buy_amount()?, decimals)?;
        let usd_cost = usd_cost(request.sell_amount, native_usd_price);
        debug!(
            chain_id = request.chain_id,
            %symbol,
            %expected_output,
            sources = aggregator.active_sources().count(),
            "quote priced"
        );

        Ok(Quote {
            request: request.clone(),
            aggregator,
            decimals,
            symbol,
            expected_output,
            native_usd_price,
            usd_cost,
        })
    }
}

// ---------------------------------------------------------------------------
// Polling
// ---------------------------------------------------------------------------

/// One poll result, tagged with the inputs it was fetched for.
#[derive(Debug, Clone)]
pub struct QuoteUpdate {
    pub request: QuoteRequest,
    pub result: Result<Arc<Quote>, Arc<WalletError>>,
}

/// Keeps one quote fresh by re-fetching it on a fixed interval.
///
/// Changing the inputs aborts the previous poll; a result of a superseded
/// poll is never published. Dropping the watcher stops polling.
pub struct QuoteWatcher {
    engine: QuoteEngine,
    interval: Duration,
    sender: Arc<watch::Sender<Option<QuoteUpdate>>>,
    generation: Arc<AtomicU64>,
    current: Option<(QuoteRequest, JoinHandle<()>)>,
}

impl QuoteWatcher {
    pub fn new(engine: QuoteEngine) -> Self {
        Self::with_interval(engine, QUOTE_REFRESH_INTERVAL)
    }

    pub fn with_interval(engine: QuoteEngine, interval: Duration) -> Self {
        let (sender, _) = watch::channel(None);
        Self {
            engine,
            interval,
            sender: Arc::new(sender),
            generation: Arc::new(AtomicU64::new(0)),
            current: None,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<QuoteUpdate>> {
        self.sender.subscribe()
    }

    pub fn latest(&self) -> Option<QuoteUpdate> {
        self.sender.borrow().clone()
    }

    pub fn request(&self) -> Option<&QuoteRequest> {
        self.current.as_ref().map(|(request, _)| request)
    }

    /// Starts polling `request`, replacing any previous inputs. Re-watching
    /// the current inputs keeps the running poll.
    pub fn watch(&mut self, request: QuoteRequest) {
        if self.request() == Some(&request) {
            return;
        }
        if self.current.is_some() {
            self.stop();
        }

        let generation = self.generation.clone();
        let mine = generation.load(Ordering::SeqCst);
        let sender = self.sender.clone();
        let engine = self.engine.clone();
        let interval = self.interval;
        let polled = request.clone();

        let handle = tokio::spawn(async move {
            loop {
                let result = engine
                    .get_quote(&polled)
                    .await
                    .map(Arc::new)
                    .map_err(Arc::new);
                let update = QuoteUpdate {
                    request: polled.clone(),
                    result,
                };
                let published = sender.send_if_modified(|slot| {
                    if generation.load(Ordering::SeqCst) != mine {
                        return false;
                    }
                    *slot = Some(update);
                    true
                });
                if !published {
                    return;
                }
                tokio::time::sleep(interval).await;
            }
        });
        self.current = Some((request, handle));
    }

    /// Stops polling and clears the published quote.
    pub fn stop(&mut self) {
        let generation = &self.generation;
        self.sender.send_modify(|slot| {
            generation.fetch_add(1, Ordering::SeqCst);
            *slot = None;
        });
        if let Some((_, handle)) = self.current.take() {
            handle.abort();
        }
    }
}

impl Drop for QuoteWatcher {
    fn drop(&mut self) {
        if let Some((_, handle)) = self.current.take() {
            handle.abort();
        }
    }
}
