//! Cross-chain name resolution.
//!
//! Every lookup runs on the naming chain (Ethereum mainnet) whatever the
//! target chain is; the target chain only selects which address record is
//! read (ENSIP-11 coin type).

use alloy_primitives::Address;
use chain_eth::{address as eth_address, chains, ens};
use tracing::{debug, warn};

use crate::client::{ClientResolver, ReadClient};
use crate::error::{RpcError, WalletError};

/// Chain id of the naming chain.
pub const NAMING_CHAIN_ID: u64 = 1;

/// Registry id under which users store a custom RPC URL for name lookups.
pub const NAMING_REGISTRY_ID: u64 = ens::ETH_COIN_TYPE as u64;

#[derive(Clone)]
pub struct NameResolver {
    clients: ClientResolver,
}

impl NameResolver {
    pub fn new(clients: ClientResolver) -> Self {
        Self { clients }
    }

    /// The address record of `name` for `target_chain_id`.
    ///
    /// Returns `None` for an empty name, a name without a resolver, or an
    /// unset record. Fails with `InvalidName` when normalization rejects the
    /// name.
    pub async fn resolve(
        &self,
        name: &str,
        target_chain_id: u64,
    ) -> Result<Option<Address>, WalletError> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(None);
        }
        let normalized = ens::normalize(name)?;
        let coin_type = ens::coin_type_for_chain(target_chain_id);
        let calldata = ens::encode_resolve_call(&normalized, coin_type)?;

        let client = self.naming_client().await?;
        let data = match client.call(ens::UNIVERSAL_RESOLVER, &calldata).await {
            Ok(data) => data,
            Err(WalletError::Rpc(RpcError::Reverted(reason))) => {
                debug!(name = %normalized, coin_type, %reason, "resolver reverted, no record");
                return Ok(None);
            }
            Err(e) => return Err(e),
        };
        if data.is_empty() {
            return Ok(None);
        }

        let address = ens::decode_resolve_result(&data, coin_type)?;
        debug!(name = %normalized, coin_type, found = address.is_some(), "name resolved");
        Ok(address)
    }

    /// Parses a "to" field: an address is used as is, anything else is
    /// resolved as a name on `chain_id`.
    pub async fn resolve_recipient(
        &self,
        input: &str,
        chain_id: u64,
    ) -> Result<Address, WalletError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(WalletError::InvalidInput("recipient is required".to_string()));
        }
        if input.starts_with("0x") || input.starts_with("0X") {
            return Ok(eth_address::parse_address(input)?);
        }
        self.resolve(input, chain_id).await?.ok_or_else(|| {
            WalletError::InvalidInput(format!("{input} has no address for chain {chain_id}"))
        })
    }

    /// A client for the naming chain, honoring the registry override at the
    /// reserved id, then the mainnet entry, then the catalog default.
    async fn naming_client(&self) -> Result<ReadClient, WalletError> {
        let chain = chains::get_chain(NAMING_CHAIN_ID)
            .ok_or(WalletError::UnsupportedChain(NAMING_CHAIN_ID))?;
        let registry = self.clients.registry();

        let mut custom = None;
        for id in [NAMING_REGISTRY_ID, NAMING_CHAIN_ID] {
            match registry.rpc_url(id).await {
                Ok(Some(url)) => {
                    custom = Some(url);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(
                        registry_id = id,
                        error = %e,
                        "registry lookup failed, using default RPC"
                    );
                    break;
                }
            }
        }
        self.clients.client_at(chain, custom.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use alloy_primitives::address;
    use chain_eth::abi::{encode_params, AbiParam};
    use serde_json::{json, Value};

    use super::*;
    use crate::accounts::AccountDeriver;
    use crate::mnemonic::SeedPhrase;
    use crate::registry::ChainRegistry;
    use crate::rpc;
    use crate::store::MemoryStore;
    use crate::test_support::{method_not_found, MockConnector, MockTransport, TEST_MNEMONIC};
    use crate::types::ChainEntry;

    const VITALIK: Address = address!("d8dA6BF26964aF9D7eEd9e03E53415D37aA96045");
    const BASE_ADDR: Address = address!("1111111111111111111111111111111111111111");

    fn names(transport: Arc<MockTransport>) -> (NameResolver, Arc<MockConnector>) {
        let connector = MockConnector::new(transport);
        let deriver = AccountDeriver::new(&SeedPhrase::new(TEST_MNEMONIC).unwrap(), 1).unwrap();
        let registry = ChainRegistry::new(Arc::new(MemoryStore::new()));
        let clients = ClientResolver::new(registry, deriver, connector.clone());
        (NameResolver::new(clients), connector)
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    /// A universal resolver answering vitalik.eth on mainnet and base only.
    fn resolver_node(method: &str, params: &Value) -> Result<Value, RpcError> {
        if method != "eth_call" {
            return Err(method_not_found(method));
        }
        let data = rpc::parse_data(&params[0]["data"], "data").unwrap();
        if !contains(&data, b"vitalik") {
            return Err(RpcError::Reverted("execution reverted".into()));
        }

        let multicoin = [0xf1, 0xcb, 0x7e, 0x06];
        let record = if !contains(&data, &multicoin) {
            encode_params(&[AbiParam::Address(VITALIK)])
        } else if contains(&data, &ens::evm_coin_type(8453).to_be_bytes()) {
            encode_params(&[AbiParam::Bytes(BASE_ADDR.to_vec())])
        } else {
            encode_params(&[AbiParam::Bytes(Vec::new())])
        };
        let response = encode_params(&[
            AbiParam::Bytes(record),
            AbiParam::Address(Address::repeat_byte(0x99)),
        ]);
        Ok(json!(rpc::data_hex(&response)))
    }

    #[tokio::test]
    async fn resolves_native_record_on_mainnet() {
        let (names, _) = names(MockTransport::new(resolver_node));
        assert_eq!(names.resolve("Vitalik.eth", 1).await.unwrap(), Some(VITALIK));
    }

    #[tokio::test]
    async fn resolves_multicoin_record_for_other_chains() {
        let (names, _) = names(MockTransport::new(resolver_node));
        assert_eq!(names.resolve("vitalik.eth", 8453).await.unwrap(), Some(BASE_ADDR));
        assert_eq!(names.resolve("vitalik.eth", 10).await.unwrap(), None);
    }

    #[tokio::test]
    async fn missing_resolver_is_none() {
        let (names, _) = names(MockTransport::new(resolver_node));
        assert_eq!(names.resolve("nobody.eth", 1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn empty_name_is_none_without_rpc() {
        let transport = MockTransport::new(resolver_node);
        let (names, _) = names(transport.clone());
        assert_eq!(names.resolve("  ", 1).await.unwrap(), None);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn invalid_name_is_rejected() {
        let (names, _) = names(MockTransport::new(resolver_node));
        assert!(matches!(
            names.resolve("foo..eth", 1).await,
            Err(WalletError::InvalidName(_))
        ));
    }

    #[tokio::test]
    async fn transport_errors_propagate() {
        let (names, _) = names(MockTransport::new(|m, _| Err(method_not_found(m))));
        assert!(matches!(
            names.resolve("vitalik.eth", 1).await,
            Err(WalletError::Rpc(RpcError::Rpc { .. }))
        ));
    }

    #[tokio::test]
    async fn naming_rpc_prefers_reserved_registry_id() {
        let (names, connector) = names(MockTransport::new(resolver_node));
        let registry = names.clients.registry().clone();

        names.resolve("vitalik.eth", 1).await.unwrap();
        registry
            .add(ChainEntry::new(1, "Ethereum").with_rpc_url("https://mainnet.example"))
            .await
            .unwrap();
        names.resolve("vitalik.eth", 1).await.unwrap();
        registry
            .add(ChainEntry::new(60, "ENS").with_rpc_url("https://ens.example"))
            .await
            .unwrap();
        names.resolve("vitalik.eth", 8453).await.unwrap();

        assert_eq!(
            connector.urls(),
            [
                chains::ETHEREUM.rpc_url.to_string(),
                "https://mainnet.example".to_string(),
                "https://ens.example".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn recipient_accepts_address_or_name() {
        let (names, _) = names(MockTransport::new(resolver_node));
        let checksummed = VITALIK.to_checksum(None);
        assert_eq!(names.resolve_recipient(&checksummed, 10).await.unwrap(), VITALIK);
        assert_eq!(names.resolve_recipient("vitalik.eth", 8453).await.unwrap(), BASE_ADDR);
        assert!(matches!(
            names.resolve_recipient("vitalik.eth", 10).await,
            Err(WalletError::InvalidInput(_))
        ));
        assert!(matches!(
            names.resolve_recipient("0x1234", 1).await,
            Err(WalletError::InvalidInput(_))
        ));
    }
}
