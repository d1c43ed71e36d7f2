//! Immutable wallet configuration, loaded once at startup.
//!
//! Sources, later ones winning: built-in defaults, an optional TOML file, then
//! `MULTIWALLET_*` environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::info;
use zeroize::Zeroizing;

use crate::error::WalletError;
use crate::mnemonic::SeedPhrase;

pub const ENV_MNEMONIC: &str = "MULTIWALLET_MNEMONIC";
pub const ENV_ACCOUNTS: &str = "MULTIWALLET_ACCOUNTS";
pub const ENV_ZEROX_API_KEY: &str = "MULTIWALLET_ZEROX_API_KEY";
pub const ENV_STORE: &str = "MULTIWALLET_STORE";

pub const DEFAULT_ACCOUNT_COUNT: u32 = 3;
pub const DEFAULT_STORE_PATH: &str = "multiwallet.json";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// On-disk shape of the configuration file. Every field is optional.
///
/// Not `Debug`: holds the plaintext seed phrase and API key.
#[derive(Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    mnemonic: Option<String>,
    accounts: Option<u32>,
    zerox_api_key: Option<String>,
    store_path: Option<PathBuf>,
    poll_interval_secs: Option<u64>,
    confirmation_timeout_secs: Option<u64>,
}

#[derive(Debug)]
pub struct WalletConfig {
    pub seed_phrase: SeedPhrase,
    /// Number of accounts derived from the seed phrase (indices 0..count).
    pub account_count: u32,
    /// Credential for the swap aggregator. Quotes fail without it.
    pub zerox_api_key: Option<SecretString>,
    pub store_path: PathBuf,
    /// Delay between receipt polls while waiting for confirmation.
    pub poll_interval: Duration,
    /// Upper bound on a confirmation wait. `None` waits until the network
    /// answers.
    pub confirmation_timeout: Option<Duration>,
}

impl WalletConfig {
    /// A configuration with defaults for everything but the seed phrase.
    pub fn new(seed_phrase: SeedPhrase) -> Self {
        Self {
            seed_phrase,
            account_count: DEFAULT_ACCOUNT_COUNT,
            zerox_api_key: None,
            store_path: PathBuf::from(DEFAULT_STORE_PATH),
            poll_interval: DEFAULT_POLL_INTERVAL,
            confirmation_timeout: None,
        }
    }

    /// Loads from `path` (if given) and the process environment.
    pub fn load(path: Option<&Path>) -> Result<Self, WalletError> {
        Self::load_with(path, |key| std::env::var(key).ok())
    }

    /// Loads from `path` (if given) and an arbitrary variable lookup.
    pub fn load_with<F>(path: Option<&Path>, env: F) -> Result<Self, WalletError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => {
                let contents = std::fs::read_to_string(path)
                    .map(Zeroizing::new)
                    .map_err(|e| {
                        WalletError::Config(format!("failed to read {}: {e}", path.display()))
                    })?;
                let file: ConfigFile = toml::from_str(&contents).map_err(|e| {
                    WalletError::Config(format!("failed to parse {}: {e}", path.display()))
                })?;
                info!("Loaded config from {}", path.display());
                file
            }
            None => ConfigFile::default(),
        };

        let file_mnemonic = file.mnemonic.map(Zeroizing::new);
        let mnemonic = env(ENV_MNEMONIC)
            .map(Zeroizing::new)
            .or(file_mnemonic)
            .ok_or_else(|| {
                WalletError::Config(format!(
                    "no seed phrase configured \
                     (set {ENV_MNEMONIC} or `mnemonic` in the config file)"
                ))
            })?;
        let seed_phrase = SeedPhrase::new(&mnemonic)?;

        let account_count = match env(ENV_ACCOUNTS) {
            Some(raw) => raw.trim().parse::<u32>().map_err(|_| {
                WalletError::Config(format!(
                    "{ENV_ACCOUNTS} must be a positive integer, got {raw:?}"
                ))
            })?,
            None => file.accounts.unwrap_or(DEFAULT_ACCOUNT_COUNT),
        };
        if account_count == 0 {
            return Err(WalletError::Config(
                "account count must be at least 1".to_string(),
            ));
        }

        let file_api_key = file.zerox_api_key.map(SecretString::from);
        let zerox_api_key = env(ENV_ZEROX_API_KEY)
            .map(SecretString::from)
            .or(file_api_key)
            .filter(|key| !key.expose_secret().trim().is_empty());

        let store_path = env(ENV_STORE)
            .map(PathBuf::from)
            .or(file.store_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STORE_PATH));

        let poll_interval = match file.poll_interval_secs {
            Some(0) => {
                return Err(WalletError::Config(
                    "poll_interval_secs must be at least 1".to_string(),
                ))
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_POLL_INTERVAL,
        };

        Ok(Self {
            seed_phrase,
            account_count,
            zerox_api_key,
            store_path,
            poll_interval,
            confirmation_timeout: file.confirmation_timeout_secs.map(Duration::from_secs),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::test_support::TEST_MNEMONIC;


    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_from_env_only() {
        let config =
            WalletConfig::load_with(None, env_of(&[(ENV_MNEMONIC, TEST_MNEMONIC)])).unwrap();
        assert_eq!(config.account_count, 3);
        assert_eq!(config.store_path, PathBuf::from("multiwallet.json"));
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert!(config.confirmation_timeout.is_none());
        assert!(config.zerox_api_key.is_none());
    }

    #[test]
    fn missing_mnemonic_is_a_config_error() {
        let err = WalletConfig::load_with(None, env_of(&[])).unwrap_err();
        assert!(matches!(err, WalletError::Config(_)));
    }

    #[test]
    fn invalid_mnemonic_is_rejected() {
        let err =
            WalletConfig::load_with(None, env_of(&[(ENV_MNEMONIC, "not a phrase")])).unwrap_err();
        assert!(matches!(err, WalletError::InvalidMnemonic(_)));
    }

    #[test]
    fn zero_accounts_is_rejected() {
        let env = env_of(&[(ENV_MNEMONIC, TEST_MNEMONIC), (ENV_ACCOUNTS, "0")]);
        assert!(matches!(
            WalletConfig::load_with(None, env),
            Err(WalletError::Config(_))
        ));
    }

    #[test]
    fn file_values_are_overridden_by_env() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.toml");
        std::fs::write(
            &path,
            format!(
                "mnemonic = \"{TEST_MNEMONIC}\"\naccounts = 5\nzerox_api_key = \"file-key\"\n\
                 store_path = \"/tmp/file-store.json\"\nconfirmation_timeout_secs = 120\n"
            ),
        )
        .unwrap();

        let config = WalletConfig::load_with(
            Some(&path),
            env_of(&[(ENV_ACCOUNTS, "2"), (ENV_ZEROX_API_KEY, "env-key")]),
        )
        .unwrap();

        assert_eq!(config.account_count, 2);
        assert_eq!(
            config.zerox_api_key.as_ref().map(|k| k.expose_secret().to_string()),
            Some("env-key".to_string())
        );
        assert_eq!(config.store_path, PathBuf::from("/tmp/file-store.json"));
        assert_eq!(config.confirmation_timeout, Some(Duration::from_secs(120)));
    }

    #[test]
    fn unknown_file_keys_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.toml");
        std::fs::write(&path, "acounts = 4\n").unwrap();

        let err = WalletConfig::load_with(Some(&path), env_of(&[(ENV_MNEMONIC, TEST_MNEMONIC)]))
            .unwrap_err();
        assert!(matches!(err, WalletError::Config(_)));
    }

    #[test]
    fn env_seed_phrase_wins_and_stays_redacted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wallet.toml");
        std::fs::write(
            &path,
            format!("mnemonic = \"{TEST_MNEMONIC}\"\nzerox_api_key = \"file-key\"\n"),
        )
        .unwrap();
        let env_phrase =
            "legal winner thank year wave sausage worth useful legal winner thank yellow";

        let config =
            WalletConfig::load_with(Some(&path), env_of(&[(ENV_MNEMONIC, env_phrase)])).unwrap();

        let from_env = SeedPhrase::new(env_phrase).unwrap().to_seed().unwrap();
        assert_eq!(config.seed_phrase.to_seed().unwrap().as_slice(), from_env.as_slice());
        let debug = format!("{config:?}");
        assert!(!debug.contains("legal"));
        assert!(!debug.contains("abandon"));
        assert!(!debug.contains("file-key"));
    }
}
