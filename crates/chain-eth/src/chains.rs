use serde::Serialize;

/// Definition of an EVM-compatible blockchain network.
#[derive(Debug, Clone, Serialize)]
pub struct EvmChain {
    pub chain_id: u64,
    pub name: &'static str,
    pub symbol: &'static str,
    pub decimals: u8,
    /// Public default endpoint, used when no custom RPC URL is configured.
    pub rpc_url: &'static str,
    pub explorer_url: Option<&'static str>,
    pub is_testnet: bool,
}

impl EvmChain {
    /// Block-explorer link for a transaction hash, when the chain has an
    /// explorer.
    pub fn tx_url(&self, tx_hash: &str) -> Option<String> {
        self.explorer_url.map(|base| format!("{base}/tx/{tx_hash}"))
    }
}

/// Ethereum Mainnet (chain ID 1). Hosts the naming system and the price
/// oracle.
pub const ETHEREUM: EvmChain = EvmChain {
    chain_id: 1,
    name: "Ethereum",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://eth.merkle.io",
    explorer_url: Some("https://etherscan.io"),
    is_testnet: false,
};

/// Base (chain ID 8453).
pub const BASE: EvmChain = EvmChain {
    chain_id: 8453,
    name: "Base",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://mainnet.base.org",
    explorer_url: Some("https://basescan.org"),
    is_testnet: false,
};

/// Arbitrum One (chain ID 42161).
pub const ARBITRUM: EvmChain = EvmChain {
    chain_id: 42161,
    name: "Arbitrum One",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://arb1.arbitrum.io/rpc",
    explorer_url: Some("https://arbiscan.io"),
    is_testnet: false,
};

/// OP Mainnet (chain ID 10).
pub const OPTIMISM: EvmChain = EvmChain {
    chain_id: 10,
    name: "OP Mainnet",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://mainnet.optimism.io",
    explorer_url: Some("https://optimistic.etherscan.io"),
    is_testnet: false,
};

/// Linea Mainnet (chain ID 59144).
pub const LINEA: EvmChain = EvmChain {
    chain_id: 59144,
    name: "Linea Mainnet",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://rpc.linea.build",
    explorer_url: Some("https://lineascan.build"),
    is_testnet: false,
};

/// Unichain (chain ID 130).
pub const UNICHAIN: EvmChain = EvmChain {
    chain_id: 130,
    name: "Unichain",
    symbol: "ETH",
    decimals: 18,
    rpc_url: "https://mainnet.unichain.org",
    explorer_url: Some("https://uniscan.xyz"),
    is_testnet: false,
};

/// Chains pinned to the top of listings, in this order.
pub const TOP_CHAIN_IDS: [u64; 5] = [1, 8453, 42161, 10, 59144];

const fn chain(
    chain_id: u64,
    name: &'static str,
    symbol: &'static str,
    rpc_url: &'static str,
    explorer_url: Option<&'static str>,
    is_testnet: bool,
) -> EvmChain {
    EvmChain {
        chain_id,
        name,
        symbol,
        decimals: 18,
        rpc_url,
        explorer_url,
        is_testnet,
    }
}

/// The built-in catalog, in catalog order.
///
/// Chain ids are not unique: local development chains share 31337. Lookups
/// take the first entry with a matching id.
const CATALOG: &[EvmChain] = &[
    ETHEREUM,
    chain(
        56,
        "BNB Smart Chain",
        "BNB",
        "https://bsc-dataseed.binance.org",
        Some("https://bscscan.com"),
        false,
    ),
    chain(
        100,
        "Gnosis",
        "XDAI",
        "https://rpc.gnosischain.com",
        Some("https://gnosisscan.io"),
        false,
    ),
    UNICHAIN,
    chain(137, "Polygon", "POL", "https://polygon-rpc.com", Some("https://polygonscan.com"), false),
    chain(250, "Fantom", "FTM", "https://rpc.ankr.com/fantom", Some("https://ftmscan.com"), false),
    chain(
        324,
        "ZKsync Era",
        "ETH",
        "https://mainnet.era.zksync.io",
        Some("https://era.zksync.network"),
        false,
    ),
    chain(5000, "Mantle", "MNT", "https://rpc.mantle.xyz", Some("https://mantlescan.xyz"), false),
    BASE,
    OPTIMISM,
    ARBITRUM,
    chain(42220, "Celo", "CELO", "https://forno.celo.org", Some("https://celoscan.io"), false),
    chain(
        43114,
        "Avalanche",
        "AVAX",
        "https://api.avax.network/ext/bc/C/rpc",
        Some("https://snowtrace.io"),
        false,
    ),
    LINEA,
    chain(81457, "Blast", "ETH", "https://rpc.blast.io", Some("https://blastscan.io"), false),
    chain(534352, "Scroll", "ETH", "https://rpc.scroll.io", Some("https://scrollscan.com"), false),
    chain(
        7777777,
        "Zora",
        "ETH",
        "https://rpc.zora.energy",
        Some("https://explorer.zora.energy"),
        false,
    ),
    chain(
        11155111,
        "Sepolia",
        "ETH",
        "https://rpc.sepolia.org",
        Some("https://sepolia.etherscan.io"),
        true,
    ),
    chain(
        17000,
        "Holesky",
        "ETH",
        "https://ethereum-holesky-rpc.publicnode.com",
        Some("https://holesky.etherscan.io"),
        true,
    ),
    chain(
        84532,
        "Base Sepolia",
        "ETH",
        "https://sepolia.base.org",
        Some("https://sepolia.basescan.org"),
        true,
    ),
    chain(
        421614,
        "Arbitrum Sepolia",
        "ETH",
        "https://sepolia-rollup.arbitrum.io/rpc",
        Some("https://sepolia.arbiscan.io"),
        true,
    ),
    chain(
        11155420,
        "OP Sepolia",
        "ETH",
        "https://sepolia.optimism.io",
        Some("https://sepolia-optimism.etherscan.io"),
        true,
    ),
    chain(
        80002,
        "Polygon Amoy",
        "POL",
        "https://rpc-amoy.polygon.technology",
        Some("https://amoy.polygonscan.com"),
        true,
    ),
    chain(31337, "Hardhat", "ETH", "http://127.0.0.1:8545", None, true),
    chain(31337, "Anvil", "ETH", "http://127.0.0.1:8545", None, true),
    chain(1337, "Localhost", "ETH", "http://127.0.0.1:8545", None, true),
];

/// Returns the first catalog definition for a chain id, or `None` if the
/// catalog has no such chain.
pub fn get_chain(chain_id: u64) -> Option<&'static EvmChain> {
    CATALOG.iter().find(|c| c.chain_id == chain_id)
}

/// All catalog entries in catalog order, duplicates included.
pub fn catalog() -> &'static [EvmChain] {
    CATALOG
}

/// Sort key placing [`TOP_CHAIN_IDS`] first (in their listed order), then
/// the rest of the catalog in catalog order, then ids the catalog does not
/// know.
pub fn listing_rank(chain_id: u64) -> usize {
    if let Some(pos) = TOP_CHAIN_IDS.iter().position(|&id| id == chain_id) {
        return pos;
    }
    match CATALOG.iter().position(|c| c.chain_id == chain_id) {
        Some(pos) => TOP_CHAIN_IDS.len() + pos,
        None => usize::MAX,
    }
}

/// The catalog ordered for display: pinned chains first, the remainder in
/// catalog order.
pub fn prioritized() -> Vec<&'static EvmChain> {
    let pinned = TOP_CHAIN_IDS.iter().filter_map(|&id| get_chain(id));
    let rest = CATALOG
        .iter()
        .filter(|c| !TOP_CHAIN_IDS.contains(&c.chain_id));
    pinned.chain(rest).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_ethereum() {
        let chain = get_chain(1).expect("Ethereum should be in the catalog");
        assert_eq!(chain.name, "Ethereum");
        assert_eq!(chain.symbol, "ETH");
        assert_eq!(chain.decimals, 18);
        assert!(!chain.is_testnet);
    }

    #[test]
    fn get_optimism() {
        let chain = get_chain(10).expect("OP Mainnet should be in the catalog");
        assert_eq!(chain.name, "OP Mainnet");
    }

    #[test]
    fn get_bsc() {
        let chain = get_chain(56).expect("BSC should be in the catalog");
        assert_eq!(chain.symbol, "BNB");
    }

    #[test]
    fn unknown_chain_returns_none() {
        assert!(get_chain(999_999).is_none());
    }

    #[test]
    fn duplicate_ids_resolve_to_first_entry() {
        let duplicates = catalog().iter().filter(|c| c.chain_id == 31337).count();
        assert_eq!(duplicates, 2);
        assert_eq!(get_chain(31337).unwrap().name, "Hardhat");
    }

    #[test]
    fn prioritized_starts_with_top_chains() {
        let ids: Vec<u64> = prioritized().iter().take(5).map(|c| c.chain_id).collect();
        assert_eq!(ids, TOP_CHAIN_IDS.to_vec());
    }

    #[test]
    fn prioritized_keeps_every_entry_once() {
        assert_eq!(prioritized().len(), catalog().len());
    }

    #[test]
    fn prioritized_remainder_in_catalog_order() {
        let rest: Vec<u64> = prioritized().iter().skip(5).take(3).map(|c| c.chain_id).collect();
        assert_eq!(rest, vec![56, 100, 130]);
    }

    #[test]
    fn listing_rank_orders_pinned_then_catalog_then_unknown() {
        assert_eq!(listing_rank(1), 0);
        assert_eq!(listing_rank(59144), 4);
        assert!(listing_rank(56) > listing_rank(59144));
        assert!(listing_rank(137) > listing_rank(56));
        assert_eq!(listing_rank(424242), usize::MAX);
    }

    #[test]
    fn tx_url_uses_explorer() {
        assert_eq!(
            BASE.tx_url("0xabc").as_deref(),
            Some("https://basescan.org/tx/0xabc")
        );
        assert!(get_chain(31337).unwrap().tx_url("0xabc").is_none());
    }

    #[test]
    fn all_chains_have_rpc_url() {
        for chain in catalog() {
            assert!(
                chain.rpc_url.starts_with("https://")
                    || chain.rpc_url.starts_with("http://127.0.0.1"),
                "{} rpc_url should be https or local",
                chain.name
            );
        }
    }

    #[test]
    fn explorers_use_https() {
        for chain in catalog() {
            if let Some(url) = chain.explorer_url {
                assert!(url.starts_with("https://"), "{} explorer should be https", chain.name);
            }
        }
    }
}
