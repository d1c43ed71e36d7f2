use std::sync::Arc;

use alloy_primitives::{Address, U256};
use secrecy::{ExposeSecret, SecretString};

use crate::accounts::{AccountBook, AccountDeriver};
use crate::client::{ClientResolver, ConfirmationPolicy};
use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::names::NameResolver;
use crate::quote::{HttpQuoteSource, QuoteEngine, QuoteSource, QuoteWatcher};
use crate::registry::ChainRegistry;
use crate::rpc::{Connector, HttpConnector};
use crate::store::{JsonFileStore, KeyValueStore};
use crate::submit::TransactionSubmitter;

/// All wallet components wired to one store, one connector and one quote
/// source.
#[derive(Clone)]
pub struct Wallet {
    accounts: AccountBook,
    clients: ClientResolver,
    names: NameResolver,
    quotes: QuoteEngine,
    submitter: TransactionSubmitter,
}

impl Wallet {
    pub fn new(
        config: &WalletConfig,
        store: Arc<dyn KeyValueStore>,
        connector: Arc<dyn Connector>,
        quote_source: Arc<dyn QuoteSource>,
    ) -> Result<Self, WalletError> {
        let deriver = AccountDeriver::from_config(config)?;
        let registry = ChainRegistry::new(store.clone());
        let clients = ClientResolver::new(registry, deriver.clone(), connector).with_confirmation(
            ConfirmationPolicy {
                poll_interval: config.poll_interval,
                timeout: config.confirmation_timeout,
            },
        );
        let names = NameResolver::new(clients.clone());

        Ok(Self {
            accounts: AccountBook::new(deriver, store),
            quotes: QuoteEngine::new(clients.clone(), quote_source),
            submitter: TransactionSubmitter::new(clients.clone(), names.clone()),
            names,
            clients,
        })
    }

    /// Production wiring: the JSON file store at `config.store_path` and
    /// HTTP for both JSON-RPC and the aggregator.
    pub fn from_config(config: &WalletConfig) -> Result<Self, WalletError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("multiwallet/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| WalletError::Config(format!("failed to build HTTP client: {e}")))?;

        let api_key = config
            .zerox_api_key
            .as_ref()
            .map(|key| SecretString::from(key.expose_secret().to_string()));

        Self::new(
            config,
            Arc::new(JsonFileStore::new(config.store_path.clone())),
            Arc::new(HttpConnector::new(http.clone())),
            Arc::new(HttpQuoteSource::new(http, api_key)),
        )
    }

    pub fn accounts(&self) -> &AccountBook {
        &self.accounts
    }

    pub fn deriver(&self) -> &AccountDeriver {
        self.clients.deriver()
    }

    pub fn registry(&self) -> &ChainRegistry {
        self.clients.registry()
    }

    pub fn clients(&self) -> &ClientResolver {
        &self.clients
    }

    pub fn names(&self) -> &NameResolver {
        &self.names
    }

    pub fn quotes(&self) -> &QuoteEngine {
        &self.quotes
    }

    pub fn submitter(&self) -> &TransactionSubmitter {
        &self.submitter
    }

    /// A watcher polling quotes on the default interval.
    pub fn quote_watcher(&self) -> QuoteWatcher {
        QuoteWatcher::new(self.quotes.clone())
    }

    /// Native balance of `address` on `chain_id`, in wei.
    pub async fn balance(&self, chain_id: u64, address: Address) -> Result<U256, WalletError> {
        self.clients
            .resolve_read_client(chain_id)
            .await?
            .balance(address)
            .await
    }
}
