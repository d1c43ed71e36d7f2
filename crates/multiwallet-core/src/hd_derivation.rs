use alloy_primitives::Address;
use bip32::{DerivationPath, XPrv};
use zeroize::Zeroize;

use crate::error::WalletError;

/// BIP-44 derivation path for the EVM account at `index`:
/// m/44'/60'/index'/0/0
///
/// The index sits on the hardened account level; change and address index
/// stay at zero. Every EVM chain shares the same key, the chain id only
/// matters at transaction level.
pub fn derivation_path(index: u32) -> String {
    format!("m/44'/60'/{index}'/0/0")
}

/// Derive the secp256k1 key and address of account `index` from a BIP-39 seed
pub fn derive_secp256k1_key(seed: &[u8], index: u32) -> Result<DerivedKey, WalletError> {
    let path_str = derivation_path(index);

    let path: DerivationPath = path_str
        .parse()
        .map_err(|e: bip32::Error| WalletError::DerivationFailed(e.to_string()))?;

    let xprv = XPrv::derive_from_path(seed, &path)
        .map_err(|e| WalletError::DerivationFailed(e.to_string()))?;

    let mut private_key: [u8; 32] = xprv.to_bytes().into();
    let address = match chain_eth::address::address_from_private_key(&private_key) {
        Ok(address) => address,
        Err(e) => {
            private_key.zeroize();
            return Err(e.into());
        }
    };

    Ok(DerivedKey {
        private_key,
        address,
        derivation_path: path_str,
    })
}

/// Derived secp256k1 key for one account index
pub struct DerivedKey {
    pub private_key: [u8; 32],
    pub address: Address,
    pub derivation_path: String,
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.private_key.zeroize();
    }
}
