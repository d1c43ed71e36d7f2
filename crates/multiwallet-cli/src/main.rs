//! multiwallet - a multi-chain EVM wallet on the command line.
//!
//! Accounts come from the configured seed phrase; chains, RPC URLs and
//! account names live in the JSON store.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use multiwallet_core::quote::format_token_amount;
use multiwallet_core::{
    Address, ChainEntry, Quote, QuoteRequest, SendForm, SentTransaction, Wallet, WalletConfig,
};
use tracing::debug;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// multiwallet: multi-chain EVM wallet
#[derive(Parser)]
#[command(name = "multiwallet", version)]
#[command(
    about = "Accounts, chains, names, swaps and transfers across EVM chains",
    long_about = None
)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long, env = "MULTIWALLET_CONFIG", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Derived accounts
    #[command(subcommand)]
    Accounts(AccountsCommand),

    /// Chain registry
    #[command(subcommand)]
    Chains(ChainsCommand),

    /// Native balance of one account, or of every account
    Balance {
        #[arg(long, default_value_t = 1)]
        chain: u64,

        address: Option<Address>,
    },

    /// Resolve a name to an address on a chain
    Resolve {
        name: String,

        #[arg(long, default_value_t = 1)]
        chain: u64,
    },

    /// Quote a swap of the native asset for a token
    Quote {
        #[arg(long)]
        token: String,

        /// Amount of the native asset to sell, in ether
        #[arg(long)]
        amount: String,

        #[arg(long, default_value_t = 1)]
        chain: u64,

        /// Keep refreshing the quote until interrupted
        #[arg(long)]
        watch: bool,
    },

    /// Execute a swap quote
    Swap {
        #[arg(long)]
        from: Address,

        #[arg(long)]
        token: String,

        #[arg(long)]
        amount: String,

        #[arg(long, default_value_t = 1)]
        chain: u64,
    },

    /// Send a transaction; the chain needs a custom RPC URL
    Send {
        #[arg(long)]
        from: String,

        #[arg(long)]
        chain: String,

        /// Recipient address or name
        #[arg(long)]
        to: String,

        /// Amount in ether
        #[arg(long, default_value = "")]
        value: String,

        /// 0x-prefixed calldata
        #[arg(long, default_value = "")]
        data: String,
    },
}

#[derive(Subcommand)]
enum AccountsCommand {
    /// List derived accounts with their names
    List,

    /// Name an account; an empty name restores the default
    Rename { address: Address, name: String },

    /// Print the private key of an account
    ExportKey { address: Address },
}

#[derive(Subcommand)]
enum ChainsCommand {
    /// List registered chains, or the whole catalog with --all
    List {
        #[arg(long)]
        all: bool,
    },

    /// Register a chain, replacing any entry with the same id
    Add {
        id: u64,
        name: String,

        #[arg(long)]
        rpc_url: Option<String>,
    },

    /// Unregister a chain
    Remove { id: u64 },

    /// Set the custom RPC URL of a chain; omit the URL to clear it
    SetRpc { id: u64, url: Option<String> },
}

fn init_logging() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,multiwallet_core=info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    let config =
        WalletConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    debug!(
        accounts = config.account_count,
        store = %config.store_path.display(),
        "configuration loaded"
    );
    let wallet = Wallet::from_config(&config)?;

    match cli.command {
        Commands::Accounts(command) => accounts(&wallet, command).await,
        Commands::Chains(command) => chains(&wallet, command).await,
        Commands::Balance { chain, address } => balance(&wallet, chain, address).await,
        Commands::Resolve { name, chain } => {
            match wallet.names().resolve(&name, chain).await? {
                Some(address) => println!("{}", address.to_checksum(None)),
                None => println!("{name} has no address on chain {chain}"),
            }
            Ok(())
        }
        Commands::Quote {
            token,
            amount,
            chain,
            watch,
        } => {
            let request = QuoteRequest::parse(&token, &amount, chain)?;
            if watch {
                watch_quote(&wallet, request).await
            } else {
                print_quote(&wallet.quotes().get_quote(&request).await?);
                Ok(())
            }
        }
        Commands::Swap {
            from,
            token,
            amount,
            chain,
        } => {
            let request = QuoteRequest::parse(&token, &amount, chain)?;
            let quote = wallet.quotes().get_quote(&request).await?;
            print_quote(&quote);
            let sent = wallet.submitter().send_quote(from, &quote).await?;
            print_sent(&sent);
            Ok(())
        }
        Commands::Send {
            from,
            chain,
            to,
            value,
            data,
        } => {
            let sent = wallet
                .submitter()
                .send_raw(&SendForm {
                    from,
                    chain_id: chain,
                    to,
                    value,
                    data,
                })
                .await?;
            print_sent(&sent);
            Ok(())
        }
    }
}

async fn accounts(wallet: &Wallet, command: AccountsCommand) -> Result<()> {
    match command {
        AccountsCommand::List => {
            for account in wallet.accounts().list_named_accounts().await? {
                println!(
                    "{:>3}  {}  {}",
                    account.index,
                    account.address.to_checksum(None),
                    account.name
                );
            }
        }
        AccountsCommand::Rename { address, name } => {
            wallet.accounts().rename_account(address, &name).await?;
        }
        AccountsCommand::ExportKey { address } => {
            let account = wallet.deriver().find_by_address(address)?;
            println!("{}", account.private_key.to_hex().as_str());
        }
    }
    Ok(())
}

async fn chains(wallet: &Wallet, command: ChainsCommand) -> Result<()> {
    let registry = wallet.registry();
    match command {
        ChainsCommand::List { all: false } => {
            for entry in registry.list().await? {
                println!(
                    "{:>10}  {}  {}",
                    entry.id,
                    entry.name,
                    entry.rpc_url.as_deref().unwrap_or("-")
                );
            }
        }
        ChainsCommand::List { all: true } => {
            for chain in registry.catalog_listing().await? {
                println!(
                    "{:>10}  {} {}{}  {}",
                    chain.chain_id,
                    if chain.registered { "*" } else { " " },
                    chain.name,
                    if chain.is_testnet { " (testnet)" } else { "" },
                    chain.rpc_url.as_deref().unwrap_or("")
                );
            }
        }
        ChainsCommand::Add { id, name, rpc_url } => {
            let mut entry = ChainEntry::new(id, name);
            entry.rpc_url = rpc_url;
            registry.add(entry).await?;
        }
        ChainsCommand::Remove { id } => registry.remove(id).await?,
        ChainsCommand::SetRpc { id, url } => registry.set_rpc_url(id, url.as_deref()).await?,
    }
    Ok(())
}

async fn balance(wallet: &Wallet, chain: u64, address: Option<Address>) -> Result<()> {
    let addresses = match address {
        Some(address) => vec![address],
        None => wallet
            .deriver()
            .derive_accounts()?
            .into_iter()
            .map(|account| account.address)
            .collect(),
    };
    let client = wallet.clients().resolve_read_client(chain).await?;
    let symbol = client.chain().symbol;

    for address in addresses {
        let wei = client.balance(address).await?;
        println!(
            "{}  {} {symbol}",
            address.to_checksum(None),
            format_token_amount(wei, 18)?
        );
    }
    Ok(())
}

async fn watch_quote(wallet: &Wallet, request: QuoteRequest) -> Result<()> {
    let mut watcher = wallet.quote_watcher();
    let mut updates = watcher.subscribe();
    watcher.watch(request);

    loop {
        tokio::select! {
            changed = updates.changed() => {
                if changed.is_err() {
                    bail!("quote watcher stopped");
                }
                let update = updates.borrow_and_update().clone();
                match update.map(|u| u.result) {
                    Some(Ok(quote)) => print_quote(&quote),
                    Some(Err(e)) => eprintln!("quote failed: {e}"),
                    None => {}
                }
            }
            _ = tokio::signal::ctrl_c() => return Ok(()),
        }
    }
}

fn print_quote(quote: &Quote) {
    let q = &quote.aggregator;
    println!("buy      {} {}", quote.expected_output, quote.symbol);
    println!("price    {}", q.price);
    match quote.usd_cost {
        Some(cost) => println!("cost     ${cost:.2}"),
        None => println!("cost     unavailable"),
    }
    if let Some(gas) = q.estimated_gas.as_deref().or(q.gas.as_deref()) {
        println!("gas      {gas}");
    }
    let sources: Vec<_> = q.active_sources().map(|s| s.name.as_str()).collect();
    if !sources.is_empty() {
        println!("sources  {}", sources.join(", "));
    }
}

fn print_sent(sent: &SentTransaction) {
    println!("hash     {:#x}", sent.hash);
    println!(
        "status   {} in block {}",
        if sent.receipt.success { "success" } else { "reverted" },
        sent.receipt.block_number
    );
    if let Some(url) = &sent.explorer_url {
        println!("explorer {url}");
    }
}
