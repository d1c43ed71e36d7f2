use std::fmt;

use bip39::{Language, Mnemonic};
use secrecy::{ExposeSecret, SecretString};
use zeroize::Zeroizing;

use crate::error::WalletError;

/// Collapse runs of whitespace so pasted phrases parse.
fn normalize_phrase(phrase: &str) -> String {
    phrase.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The wallet's BIP-39 seed phrase.
///
/// Held as a secret for the whole process lifetime and zeroized on drop. It is
/// never persisted and never printed: `Debug` is redacted.
pub struct SeedPhrase {
    phrase: SecretString,
}

impl SeedPhrase {
    pub fn new(phrase: &str) -> Result<Self, WalletError> {
        let normalized = Zeroizing::new(normalize_phrase(phrase));
        Mnemonic::parse_in_normalized(Language::English, &normalized)?;
        Ok(Self {
            phrase: SecretString::from(normalized.to_string()),
        })
    }

    /// Derive the 64-byte BIP-39 seed (empty passphrase).
    pub fn to_seed(&self) -> Result<Zeroizing<[u8; 64]>, WalletError> {
        let mnemonic =
            Mnemonic::parse_in_normalized(Language::English, self.phrase.expose_secret())?;
        Ok(Zeroizing::new(mnemonic.to_seed("")))
    }

    pub fn word_count(&self) -> usize {
        self.phrase.expose_secret().split(' ').count()
    }
}

impl fmt::Debug for SeedPhrase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SeedPhrase")
            .field("words", &self.word_count())
            .finish_non_exhaustive()
    }
}
