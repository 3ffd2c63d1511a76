//! Settings resolution.
//!
//! Precedence, lowest to highest: built-in defaults, JSON config file,
//! environment variables, command-line flags.

use std::path::{Path, PathBuf};

use vindex_types::config::WalletConfig;

const WALLET_FILE: &str = "wallet.json";

pub const ENV_ADDRESS_PREFIX: &str = "VINDEX_ADDRESS_PREFIX";
pub const ENV_DERIVATION_PATH: &str = "VINDEX_DERIVATION_PATH";

/// Values given on the command line.
#[derive(Default)]
pub struct CliOverrides {
    pub wallet_path: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
    pub address_prefix: Option<String>,
    pub derivation_path: Option<String>,
}

/// Fully resolved settings.
pub struct ResolvedConfig {
    pub wallet_path: PathBuf,
    pub wallet: WalletConfig,
}

/// JSON config file format.
///
/// Every field is optional:
/// ```json
/// {
///   "wallet_path": "/home/me/.vindex/wallet.json",
///   "wallet": {
///     "address_prefix": "vindex",
///     "kdf": { "m_cost": 65536, "t_cost": 3, "p_cost": 1 }
///   }
/// }
/// ```
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    wallet_path: Option<PathBuf>,
    wallet: WalletConfig,
}

/// Resolves settings from all sources and validates the result.
pub fn resolve(cli: CliOverrides) -> Result<ResolvedConfig, String> {
    resolve_with_env(cli, |key| std::env::var(key).ok())
}

fn resolve_with_env(
    cli: CliOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ResolvedConfig, String> {
    let file = match &cli.config_path {
        Some(path) => {
            let file = load_file(path)?;
            tracing::debug!(path = %path.display(), "config file loaded");
            file
        }
        None => ConfigFile::default(),
    };

    let mut wallet = file.wallet;
    if let Some(prefix) = env(ENV_ADDRESS_PREFIX) {
        tracing::debug!(prefix = %prefix, "address prefix from environment");
        wallet.address_prefix = prefix;
    }
    if let Some(path) = env(ENV_DERIVATION_PATH) {
        tracing::debug!(path = %path, "derivation path from environment");
        wallet.derivation_path = path;
    }
    if let Some(prefix) = cli.address_prefix {
        wallet.address_prefix = prefix;
    }
    if let Some(path) = cli.derivation_path {
        wallet.derivation_path = path;
    }
    wallet.validate().map_err(|e| e.to_string())?;

    let wallet_path = cli
        .wallet_path
        .or(file.wallet_path)
        .unwrap_or_else(default_wallet_path);

    Ok(ResolvedConfig {
        wallet_path,
        wallet,
    })
}

fn load_file(path: &Path) -> Result<ConfigFile, String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read config file: {e}"))?;
    serde_json::from_str(&text).map_err(|e| format!("invalid config JSON: {e}"))
}

/// Platform-specific default vault location.
fn default_wallet_path() -> PathBuf {
    if cfg!(target_os = "linux") {
        if let Some(home) = dirs::home_dir() {
            return home.join(".vindex").join(WALLET_FILE);
        }
    }
    if let Some(data) = dirs::data_dir() {
        return data.join("Vindex").join(WALLET_FILE);
    }
    PathBuf::from(WALLET_FILE)
}
