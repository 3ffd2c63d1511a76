//! Subcommand handlers.

pub mod sign;
pub mod wallet;

use vindex_wallet::{FileVaultStore, WalletHandle, WalletSession};

use crate::GlobalOpts;

/// Opens the vault file named by the resolved settings.
pub(crate) fn open_handle(opts: &GlobalOpts) -> Result<WalletHandle<FileVaultStore>, String> {
    let store = FileVaultStore::new(&opts.wallet_path);
    let session =
        WalletSession::open(store, opts.wallet_config.clone()).map_err(|e| e.to_string())?;
    Ok(WalletHandle::new(session))
}
