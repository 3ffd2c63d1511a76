//! Wallet lifecycle commands.

use vindex_crypto::mnemonic::{generate_mnemonic, Mnemonic};
use vindex_types::{VindexError, WalletStatus};
use vindex_wallet::backup::BackupFlow;
use vindex_wallet::{FileVaultStore, VaultStore};

use super::open_handle;
use crate::output;
use crate::prompt;
use crate::GlobalOpts;

/// Quiz attempts before `create` gives up.
const MAX_QUIZ_ATTEMPTS: usize = 3;

pub async fn create(opts: &GlobalOpts, force: bool) -> Result<(), String> {
    let handle = open_handle(opts)?;
    ensure_replaceable(handle.status().await.map_err(|e| e.to_string())?, opts, force)?;

    let mnemonic = generate_mnemonic().map_err(|e| e.to_string())?;
    let mut flow = BackupFlow::new(mnemonic);
    run_quiz(&mut flow)?;
    let mnemonic = flow.into_mnemonic().map_err(|e| e.to_string())?;

    let password = prompt::read_new_password(&opts.wallet_config.password_policy, true)?;
    let created = handle
        .create(Some(mnemonic), password.as_str())
        .await
        .map_err(|e| e.to_string())?;
    handle.lock().await.map_err(|e| e.to_string())?;

    print_wallet_saved("wallet created", &created.address, opts);
    Ok(())
}

pub async fn import(opts: &GlobalOpts, force: bool) -> Result<(), String> {
    let handle = open_handle(opts)?;
    ensure_replaceable(handle.status().await.map_err(|e| e.to_string())?, opts, force)?;

    // Validate before asking for a password.
    let phrase = prompt::read_line("Recovery phrase: ")?;
    let mnemonic = Mnemonic::parse(&phrase).map_err(|e| e.to_string())?;
    let password = prompt::read_new_password(&opts.wallet_config.password_policy, true)?;

    let address = handle
        .import(mnemonic.as_str(), password.as_str())
        .await
        .map_err(|e| e.to_string())?;
    handle.lock().await.map_err(|e| e.to_string())?;

    print_wallet_saved("wallet imported", &address, opts);
    Ok(())
}

pub async fn address(opts: &GlobalOpts) -> Result<(), String> {
    let handle = open_handle(opts)?;
    let address = handle
        .current_address()
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| no_wallet(opts))?;

    if opts.json {
        output::print_fields(&[("address", address)], true);
    } else {
        output::print_kv("Address", &address);
    }
    Ok(())
}

pub fn status(opts: &GlobalOpts) -> Result<(), String> {
    let store = FileVaultStore::new(&opts.wallet_path);
    let path = opts.wallet_path.display().to_string();

    let vault = match store.load().map_err(|e| e.to_string())? {
        Some(vault) => vault,
        None => {
            output::print_fields(
                &[
                    ("status", WalletStatus::NoWallet.to_string()),
                    ("wallet", path),
                ],
                opts.json,
            );
            return Ok(());
        }
    };

    let kdf = vault.kdf_params();
    let mut fields = vec![
        ("status", WalletStatus::Locked.to_string()),
        ("wallet", path),
        ("address", vault.address().to_string()),
        ("derivation_path", vault.derivation_path().to_string()),
        (
            "kdf",
            format!("argon2id m={}KiB t={} p={}", kdf.m_cost, kdf.t_cost, kdf.p_cost),
        ),
    ];
    if kdf.is_weaker_than(&opts.wallet_config.kdf) {
        fields.push(("kdf_upgrade", "pending (applied on next unlock)".to_string()));
    }
    output::print_fields(&fields, opts.json);
    Ok(())
}

pub async fn change_password(opts: &GlobalOpts) -> Result<(), String> {
    let handle = open_handle(opts)?;
    if handle.status().await.map_err(|e| e.to_string())? == WalletStatus::NoWallet {
        return Err(no_wallet(opts));
    }

    let old = prompt::read_password("Current password: ")?;
    let new = prompt::read_new_password(&opts.wallet_config.password_policy, false)?;
    handle
        .change_password(old.as_str(), new.as_str())
        .await
        .map_err(|e| e.to_string())?;

    output::print_success("password changed", opts.json);
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn run_quiz(flow: &mut BackupFlow) -> Result<(), String> {
    for attempt in 1..=MAX_QUIZ_ATTEMPTS {
        {
            let words = flow.words_to_show().map_err(|e| e.to_string())?;
            output::print_phrase(&words);
        }
        prompt::read_line("Press Enter once the words are written down...")?;

        let positions = flow.begin_verification().map_err(|e| e.to_string())?;
        let mut answers = Vec::with_capacity(positions.len());
        for position in positions {
            answers.push(prompt::read_line(&format!("Word #{}: ", position + 1))?);
        }
        let answers: Vec<&str> = answers.iter().map(|a| a.as_str()).collect();

        match flow.verify(&answers) {
            Ok(()) => return Ok(()),
            Err(VindexError::VerificationFailed) if attempt < MAX_QUIZ_ATTEMPTS => {
                output::print_warning("those words do not match, check your copy and try again");
            }
            Err(e) => return Err(e.to_string()),
        }
    }
    Err(VindexError::VerificationFailed.to_string())
}

fn ensure_replaceable(status: WalletStatus, opts: &GlobalOpts, force: bool) -> Result<(), String> {
    if status != WalletStatus::NoWallet && !force {
        return Err(format!(
            "a wallet already exists at {}; pass --force to replace it",
            opts.wallet_path.display()
        ));
    }
    Ok(())
}

fn print_wallet_saved(msg: &str, address: &str, opts: &GlobalOpts) {
    if opts.json {
        output::print_fields(
            &[
                ("address", address.to_string()),
                ("wallet", opts.wallet_path.display().to_string()),
            ],
            true,
        );
    } else {
        output::print_success(msg, false);
        output::print_kv("Address", address);
        output::print_kv("Vault", &opts.wallet_path.display().to_string());
    }
}

fn no_wallet(opts: &GlobalOpts) -> String {
    format!("{} ({})", VindexError::NoWallet, opts.wallet_path.display())
}
