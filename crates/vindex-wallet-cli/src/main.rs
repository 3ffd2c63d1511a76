//! VindexChain command-line wallet.
//!
//! Operates directly on a local vault file.
//!
//! Environment:
//!
//!   VINDEX_WALLET_PASSWORD   Wallet password (avoids interactive prompt)
//!   VINDEX_ADDRESS_PREFIX    Bech32 address prefix override
//!   VINDEX_DERIVATION_PATH   Derivation path override
//!   RUST_LOG                 Log level filter (default: info)

mod commands;
mod config;
mod output;
mod prompt;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// VindexChain wallet: create, restore and sign with a local encrypted vault.
#[derive(Parser)]
#[command(name = "vindex-wallet", version, about)]
struct Cli {
    /// Output in JSON format (no colors, machine-readable).
    #[arg(long, global = true)]
    json: bool,

    /// Path to the vault file.
    #[arg(long, global = true)]
    wallet: Option<PathBuf>,

    /// Load settings from a JSON config file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bech32 address prefix.
    #[arg(long, global = true)]
    address_prefix: Option<String>,

    /// BIP32 derivation path for new wallets.
    #[arg(long, global = true)]
    derivation_path: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new wallet (shows the recovery phrase and quizzes you on it).
    Create {
        /// Replace an existing wallet.
        #[arg(long)]
        force: bool,
    },
    /// Restore a wallet from a recovery phrase.
    Import {
        /// Replace an existing wallet.
        #[arg(long)]
        force: bool,
    },
    /// Show the wallet address.
    Address,
    /// Show wallet status and vault parameters.
    Status,
    /// Sign a payload with the wallet key.
    Sign {
        #[command(flatten)]
        payload: commands::sign::PayloadArgs,
    },
    /// Change the wallet password.
    ChangePassword,
    /// Verify a signature against an address.
    Verify {
        /// Signer address.
        #[arg(long)]
        address: String,
        /// Signer public key (hex, compressed).
        #[arg(long)]
        public_key: String,
        /// Signature (hex, 64 bytes).
        #[arg(long)]
        signature: String,
        #[command(flatten)]
        payload: commands::sign::PayloadArgs,
    },
}

// ---------------------------------------------------------------------------
// Global options passed to every command handler
// ---------------------------------------------------------------------------

/// Shared options threaded into command handlers.
pub struct GlobalOpts {
    pub json: bool,
    pub wallet_path: PathBuf,
    pub wallet_config: vindex_types::config::WalletConfig,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let json = cli.json;

    let overrides = config::CliOverrides {
        wallet_path: cli.wallet,
        config_path: cli.config,
        address_prefix: cli.address_prefix,
        derivation_path: cli.derivation_path,
    };

    let result = match config::resolve(overrides) {
        Ok(resolved) => {
            let opts = GlobalOpts {
                json,
                wallet_path: resolved.wallet_path,
                wallet_config: resolved.wallet,
            };
            dispatch(opts, cli.command).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        output::print_error(&e, json);
        std::process::exit(1);
    }
}

async fn dispatch(opts: GlobalOpts, cmd: Commands) -> std::result::Result<(), String> {
    match cmd {
        Commands::Create { force } => commands::wallet::create(&opts, force).await,
        Commands::Import { force } => commands::wallet::import(&opts, force).await,
        Commands::Address => commands::wallet::address(&opts).await,
        Commands::Status => commands::wallet::status(&opts),
        Commands::ChangePassword => commands::wallet::change_password(&opts).await,
        Commands::Sign { payload } => commands::sign::sign(&opts, &payload).await,
        Commands::Verify {
            address,
            public_key,
            signature,
            payload,
        } => commands::sign::verify(&opts, &address, &public_key, &signature, &payload),
    }
}
