//! welldone - WELLDONE wallet adapter for NEAR
//!
//! Inspect, encode and send selector transactions from the command line.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use welldone_near_wallet::near::{JsonRpcProvider, NetworkProvider};
use welldone_near_wallet::provider::bridge::{BridgeConfig, BridgeProvider};
use welldone_near_wallet::selector::{TransactionBatch, TransactionParams};
use welldone_near_wallet::wallet::access_key::validate_access_key;
use welldone_near_wallet::wallet::convert::build_transaction;
use welldone_near_wallet::{
    setup_welldone_wallet, Emitter, InjectedProvider, NetworkConfig, ProviderError,
    WalletBehaviour, WalletContext, WalletError, WalletOptions, WelldoneWallet,
    WelldoneWalletParams,
};

/// welldone: WELLDONE injected wallet for NEAR
#[derive(Parser)]
#[command(name = "welldone")]
#[command(about = "WELLDONE wallet adapter for NEAR wallet selectors", long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show wallet module metadata and network endpoints
    Info {
        /// Network id (mainnet or testnet)
        #[arg(short, long, default_value = "mainnet")]
        network: String,
    },

    /// Encode a selector transaction into the envelope the extension signs
    Encode {
        /// Path to a JSON transaction ({signerId, receiverId, actions})
        #[arg(value_name = "TX")]
        tx: PathBuf,

        /// Signer public key (ed25519:... or secp256k1:...)
        #[arg(short, long)]
        public_key: String,

        /// Transaction nonce
        #[arg(long)]
        nonce: u64,

        /// Recent block hash (base58)
        #[arg(short, long)]
        block_hash: String,
    },

    /// Check that a key is a registered full-access key of an account
    AccessKey {
        /// Account id
        #[arg(value_name = "ACCOUNT")]
        account: String,

        /// Public key
        #[arg(value_name = "PUBLIC_KEY")]
        public_key: String,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Sign in through the extension bridge
    SignIn {
        #[command(flatten)]
        bridge: BridgeArgs,

        #[command(flatten)]
        network: NetworkArgs,
    },

    /// Sign in and send transactions through the extension bridge
    Send {
        /// Path to a JSON transaction, or an array of transactions
        #[arg(value_name = "TX")]
        tx: PathBuf,

        #[command(flatten)]
        bridge: BridgeArgs,

        #[command(flatten)]
        network: NetworkArgs,
    },
}

#[derive(clap::Args)]
struct NetworkArgs {
    /// Network id (mainnet or testnet)
    #[arg(short, long, default_value = "mainnet")]
    network: String,

    /// Override the network's RPC node URL
    #[arg(long)]
    node_url: Option<String>,
}

impl NetworkArgs {
    fn config(&self) -> Result<NetworkConfig, String> {
        let config = NetworkConfig::from_network_id(&self.network)
            .ok_or_else(|| format!("Unknown network: {}", self.network))?;

        Ok(match &self.node_url {
            Some(url) => config.with_node_url(url),
            None => config,
        })
    }
}

#[derive(clap::Args)]
struct BridgeArgs {
    /// WebSocket URL of the extension bridge
    #[arg(short, long, default_value = "ws://127.0.0.1:9229")]
    bridge: String,
}

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("{0}")]
    Usage(String),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid transaction file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Wallet(#[from] WalletError),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");

    let result = match cli.command {
        Commands::Info { network } => show_info(&network),
        Commands::Encode {
            tx,
            public_key,
            nonce,
            block_hash,
        } => encode(&tx, &public_key, nonce, &block_hash),
        Commands::AccessKey {
            account,
            public_key,
            network,
        } => check_access_key(&account, &public_key, &network).await,
        Commands::SignIn { bridge, network } => sign_in(&bridge, &network).await.map(|_| ()),
        Commands::Send {
            tx,
            bridge,
            network,
        } => send(&tx, &bridge, &network).await,
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn show_info(network: &str) -> Result<(), CliError> {
    let config = NetworkConfig::from_network_id(network)
        .ok_or_else(|| CliError::Usage(format!("Unknown network: {}", network)))?;
    let module = setup_welldone_wallet(WelldoneWalletParams::default(), None);

    println!("┌─────────────────────────────────────────────────────────────┐");
    println!("│  WALLET MODULE                                              │");
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│  Id:          {}", module.id);
    println!("│  Name:        {}", module.metadata.name);
    println!("│  Type:        {:?}", module.kind);
    println!("│  Description: {}", module.metadata.description);
    println!("│  Icon:        {}", module.metadata.icon_url);
    println!("│  Download:    {}", module.metadata.download_url);
    println!("├─────────────────────────────────────────────────────────────┤");
    println!("│  Network:     {}", config.network_id);
    println!("│  Node:        {}", config.node_url);
    println!("│  Explorer:    {}", config.explorer_url);
    println!("└─────────────────────────────────────────────────────────────┘");
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let text = std::fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&text)?)
}

/// A transaction file holds one transaction or an array of them
fn read_transactions(path: &Path) -> Result<Vec<TransactionParams>, CliError> {
    let value: serde_json::Value = read_json(path)?;
    if value.is_array() {
        Ok(serde_json::from_value(value)?)
    } else {
        Ok(vec![serde_json::from_value(value)?])
    }
}

fn encode(path: &Path, public_key: &str, nonce: u64, block_hash: &str) -> Result<(), CliError> {
    let params: TransactionParams = read_json(path)?;
    let transaction = build_transaction(public_key, nonce, block_hash, &params)?;
    let envelope = transaction.encode_base64().map_err(WalletError::from)?;
    let hash = transaction.hash().map_err(WalletError::from)?;

    info!("Encoded {} actions for {}", transaction.actions.len(), transaction.receiver_id);
    println!("envelope: {}", envelope);
    println!("hash:     {}", hash);
    Ok(())
}

async fn check_access_key(
    account: &str,
    public_key: &str,
    network: &NetworkArgs,
) -> Result<(), CliError> {
    let config = network.config().map_err(CliError::Usage)?;
    let rpc = JsonRpcProvider::from_config(&config);
    info!("Querying {} on {}", account, rpc.node_url());

    match validate_access_key(&rpc, account, public_key).await? {
        Some(key) => {
            println!("┌─────────────────────────────────────────────────────────────┐");
            println!("│  FULL ACCESS KEY                                            │");
            println!("├─────────────────────────────────────────────────────────────┤");
            println!("│  Account:     {}", account);
            println!("│  Public key:  {}", public_key);
            println!("│  Nonce:       {}", key.nonce);
            println!("│  Block hash:  {}", key.block_hash);
            println!("└─────────────────────────────────────────────────────────────┘");
            Ok(())
        }
        None => Err(WalletError::UnregisteredKey {
            account_id: account.to_string(),
            public_key: public_key.to_string(),
        }
        .into()),
    }
}

async fn connect_wallet(
    bridge: &BridgeArgs,
    network: &NetworkArgs,
) -> Result<WelldoneWallet, CliError> {
    let config = network.config().map_err(CliError::Usage)?;
    info!("Connecting to extension bridge at {}", bridge.bridge);

    let provider: Arc<dyn InjectedProvider> =
        Arc::new(BridgeProvider::connect(BridgeConfig::new(&bridge.bridge)).await?);
    let rpc: Arc<dyn NetworkProvider> = Arc::new(JsonRpcProvider::from_config(&config));

    let module = setup_welldone_wallet(WelldoneWalletParams::default(), Some(provider));
    Ok(module.init(WalletContext {
        options: WalletOptions::new(config),
        network: rpc,
        emitter: Emitter::default(),
    }))
}

async fn sign_in(bridge: &BridgeArgs, network: &NetworkArgs) -> Result<WelldoneWallet, CliError> {
    let wallet = connect_wallet(bridge, network).await?;
    let accounts = wallet.sign_in().await?;

    if accounts.is_empty() {
        return Err(CliError::Usage(
            "No NEAR account is selected in the extension".to_string(),
        ));
    }

    for account in &accounts {
        println!("signed in: {}", account.account_id);
    }
    Ok(wallet)
}

async fn send(path: &Path, bridge: &BridgeArgs, network: &NetworkArgs) -> Result<(), CliError> {
    let transactions = read_transactions(path)?;
    let wallet = sign_in(bridge, network).await?;

    let outcomes = if transactions.len() == 1 {
        let params = transactions.into_iter().next().unwrap_or_default();
        vec![wallet.sign_and_send_transaction(params).await?]
    } else {
        wallet
            .sign_and_send_transactions(TransactionBatch { transactions })
            .await?
    };

    for outcome in outcomes {
        let status = if outcome.is_success() { "success" } else { "failure" };
        println!("{} {}", outcome.transaction["hash"], status);
    }

    wallet.sign_out().await?;
    Ok(())
}
