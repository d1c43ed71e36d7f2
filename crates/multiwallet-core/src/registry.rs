//! User-curated chain registry, persisted as one JSON array under `chains`.
//!
//! Every mutation is a whole-set read-modify-write: read the full set, drop
//! any entry with the same id, insert the new entry, write the full set back.
//! Concurrent writers are not serialized; the last write wins.

use std::sync::Arc;

use chain_eth::chains::{self, EvmChain};
use serde::Serialize;
use tracing::{debug, info};
use url::Url;

use crate::error::WalletError;
use crate::store::{KeyValueStore, CHAINS_KEY};
use crate::types::ChainEntry;

/// A catalog chain annotated with its registry state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CatalogListing {
    pub chain_id: u64,
    pub name: &'static str,
    pub is_testnet: bool,
    pub registered: bool,
    pub rpc_url: Option<String>,
}

#[derive(Clone)]
pub struct ChainRegistry {
    store: Arc<dyn KeyValueStore>,
}

impl ChainRegistry {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Registered chains, priority chains first, then catalog order. Ids
    /// unknown to the catalog sort last in insertion order.
    pub async fn list(&self) -> Result<Vec<ChainEntry>, WalletError> {
        let mut entries = self.load().await?;
        entries.sort_by_key(|entry| chains::listing_rank(entry.id));
        Ok(entries)
    }

    pub async fn get(&self, id: u64) -> Result<Option<ChainEntry>, WalletError> {
        Ok(self.load().await?.into_iter().find(|entry| entry.id == id))
    }

    /// Adds `entry`, replacing any registered entry with the same id.
    ///
    /// The id is not checked against the catalog; resolving a client for an
    /// unknown id fails later with `UnsupportedChain`.
    pub async fn add(&self, entry: ChainEntry) -> Result<(), WalletError> {
        let entry = ChainEntry {
            name: entry.name.trim().to_string(),
            rpc_url: normalize_rpc_url(entry.rpc_url.as_deref())?,
            ..entry
        };
        if entry.name.is_empty() {
            return Err(WalletError::InvalidInput("chain name is required".to_string()));
        }

        let id = entry.id;
        self.replace(entry).await?;
        info!(chain_id = id, "chain added");
        Ok(())
    }

    pub async fn remove(&self, id: u64) -> Result<(), WalletError> {
        let mut entries = self.load().await?;
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        if entries.len() == before {
            debug!(chain_id = id, "remove: chain not registered");
            return Ok(());
        }
        self.save(&entries).await?;
        info!(chain_id = id, "chain removed");
        Ok(())
    }

    /// Sets or clears (`None` or empty) the custom RPC URL of a registered
    /// chain. Other fields are left unchanged.
    pub async fn set_rpc_url(&self, id: u64, url: Option<&str>) -> Result<(), WalletError> {
        let rpc_url = normalize_rpc_url(url)?;
        let existing = self
            .get(id)
            .await?
            .ok_or(WalletError::ChainNotRegistered(id))?;

        let cleared = rpc_url.is_none();
        self.replace(ChainEntry { rpc_url, ..existing }).await?;
        if cleared {
            info!(chain_id = id, "custom RPC URL cleared");
        } else {
            info!(chain_id = id, "custom RPC URL set");
        }
        Ok(())
    }

    /// The custom RPC URL registered for `id`, if any.
    pub async fn rpc_url(&self, id: u64) -> Result<Option<String>, WalletError> {
        Ok(self.get(id).await?.and_then(|entry| entry.rpc_url))
    }

    /// Every catalog chain in listing order, flagged with registry state.
    pub async fn catalog_listing(&self) -> Result<Vec<CatalogListing>, WalletError> {
        let entries = self.load().await?;
        Ok(chains::prioritized()
            .into_iter()
            .map(|chain: &EvmChain| {
                let entry = entries.iter().find(|entry| entry.id == chain.chain_id);
                CatalogListing {
                    chain_id: chain.chain_id,
                    name: chain.name,
                    is_testnet: chain.is_testnet,
                    registered: entry.is_some(),
                    rpc_url: entry.and_then(|entry| entry.rpc_url.clone()),
                }
            })
            .collect())
    }

    async fn replace(&self, entry: ChainEntry) -> Result<(), WalletError> {
        let mut entries = self.load().await?;
        entries.retain(|existing| existing.id != entry.id);
        entries.push(entry);
        self.save(&entries).await
    }

    async fn load(&self) -> Result<Vec<ChainEntry>, WalletError> {
        match self.store.get(CHAINS_KEY).await? {
            Some(json) if !json.trim().is_empty() => serde_json::from_str(&json)
                .map_err(|e| WalletError::Storage(format!("corrupt chain registry: {e}"))),
            _ => Ok(Vec::new()),
        }
    }

    async fn save(&self, entries: &[ChainEntry]) -> Result<(), WalletError> {
        let json = serde_json::to_string(entries)
            .map_err(|e| WalletError::Storage(e.to_string()))?;
        self.store.set(CHAINS_KEY, &json).await
    }
}

/// Trims and validates a user-supplied RPC URL; blank means "none".
pub fn normalize_rpc_url(url: Option<&str>) -> Result<Option<String>, WalletError> {
    let Some(url) = url.map(str::trim).filter(|url| !url.is_empty()) else {
        return Ok(None);
    };
    let parsed = Url::parse(url)
        .map_err(|e| WalletError::InvalidInput(format!("invalid RPC URL {url:?}: {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") || parsed.host_str().is_none() {
        return Err(WalletError::InvalidInput(format!(
            "RPC URL must be http(s) with a host: {url:?}"
        )));
    }
    Ok(Some(url.to_string()))
}
