use std::fmt;
use std::sync::Arc;

use alloy_primitives::Address;
use tracing::info;
use zeroize::Zeroizing;

use crate::config::WalletConfig;
use crate::error::WalletError;
use crate::hd_derivation::derive_secp256k1_key;
use crate::mnemonic::SeedPhrase;
use crate::store::{account_name_key, KeyValueStore};
use crate::types::{DerivedAccount, NamedAccount, PrivateKey};

/// Derive the account at `index` from a seed phrase.
pub fn derive_account(seed_phrase: &SeedPhrase, index: u32) -> Result<DerivedAccount, WalletError> {
    let seed = seed_phrase.to_seed()?;
    derive_from_seed(seed.as_slice(), index)
}

/// Derive accounts `0..count` in index order.
pub fn derive_accounts(
    seed_phrase: &SeedPhrase,
    count: u32,
) -> Result<Vec<DerivedAccount>, WalletError> {
    let seed = seed_phrase.to_seed()?;
    (0..count)
        .map(|index| derive_from_seed(seed.as_slice(), index))
        .collect()
}

fn derive_from_seed(seed: &[u8], index: u32) -> Result<DerivedAccount, WalletError> {
    let key = derive_secp256k1_key(seed, index)?;
    Ok(DerivedAccount {
        index,
        address: key.address,
        private_key: PrivateKey::new(key.private_key),
    })
}

/// Derives the configured set of accounts.
///
/// Holds the BIP-39 seed (not the phrase) so repeated derivations skip the
/// PBKDF2 stretch. Cloning shares the seed.
#[derive(Clone)]
pub struct AccountDeriver {
    seed: Arc<Zeroizing<[u8; 64]>>,
    count: u32,
}

impl AccountDeriver {
    pub fn new(seed_phrase: &SeedPhrase, count: u32) -> Result<Self, WalletError> {
        Ok(Self {
            seed: Arc::new(seed_phrase.to_seed()?),
            count,
        })
    }

    pub fn from_config(config: &WalletConfig) -> Result<Self, WalletError> {
        Self::new(&config.seed_phrase, config.account_count)
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn derive_account(&self, index: u32) -> Result<DerivedAccount, WalletError> {
        derive_from_seed(self.seed.as_slice(), index)
    }

    pub fn derive_accounts(&self) -> Result<Vec<DerivedAccount>, WalletError> {
        (0..self.count).map(|index| self.derive_account(index)).collect()
    }

    /// Finds the derived account for `address`.
    ///
    /// There is no inverse derivation, so this walks indices `0..count` and
    /// fails with `AccountNotFound` past the last one.
    pub fn find_by_address(&self, address: Address) -> Result<DerivedAccount, WalletError> {
        for index in 0..self.count {
            let account = self.derive_account(index)?;
            if account.address == address {
                return Ok(account);
            }
        }
        Err(WalletError::AccountNotFound(address))
    }
}

impl fmt::Debug for AccountDeriver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountDeriver")
            .field("count", &self.count)
            .finish_non_exhaustive()
    }
}

/// Display names of derived accounts, persisted under `account:{address}`.
#[derive(Clone)]
pub struct AccountBook {
    deriver: AccountDeriver,
    store: Arc<dyn KeyValueStore>,
}

impl AccountBook {
    pub fn new(deriver: AccountDeriver, store: Arc<dyn KeyValueStore>) -> Self {
        Self { deriver, store }
    }

    /// Every derived account with its display name, in index order.
    pub async fn list_named_accounts(&self) -> Result<Vec<NamedAccount>, WalletError> {
        let mut named = Vec::with_capacity(self.deriver.count() as usize);
        for account in self.deriver.derive_accounts()? {
            let name = self.stored_name(account.address).await?;
            named.push(NamedAccount {
                index: account.index,
                address: account.address,
                name: name.unwrap_or_else(|| default_account_name(account.index)),
            });
        }
        Ok(named)
    }

    /// Sets the display name of a derived account. An empty name clears it.
    pub async fn rename_account(&self, address: Address, name: &str) -> Result<(), WalletError> {
        let account = self.deriver.find_by_address(address)?;
        let key = account_name_key(&account.address.to_checksum(None));
        let name = name.trim();

        if name.is_empty() {
            self.store.remove(&key).await?;
            info!(address = %account.address, "account name cleared");
        } else {
            self.store.set(&key, name).await?;
            info!(address = %account.address, name, "account renamed");
        }
        Ok(())
    }

    async fn stored_name(&self, address: Address) -> Result<Option<String>, WalletError> {
        let key = account_name_key(&address.to_checksum(None));
        Ok(self
            .store
            .get(&key)
            .await?
            .filter(|name| !name.trim().is_empty()))
    }
}

pub fn default_account_name(index: u32) -> String {
    format!("Account {}", u64::from(index) + 1)
}
