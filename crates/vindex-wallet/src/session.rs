//! Wallet session state machine.
//!
//! ```text
//!             create / import
//! NoWallet ──────────────────────┐
//!                                v
//!           Locked ──unlock──> Unlocked
//!             ^  <────lock────    |
//!             └── create/import ──┘ (from Locked only)
//! ```
//!
//! The keypair exists only in the `Unlocked` state. Every other state holds
//! nothing but the sealed vault. Failed operations leave the state as it
//! was, except `unlock`: an authentication failure always ends `Locked`.

use std::mem;

use vindex_crypto::hd_derive::{derive_account, DerivationPath};
use vindex_crypto::mnemonic::{generate_mnemonic, mnemonic_to_seed, Mnemonic, Seed};
use vindex_crypto::signing::KeyPair;
use vindex_types::config::WalletConfig;
use vindex_types::{Result, VindexError, WalletStatus};
use zeroize::Zeroize;

use crate::password::check_password;
use crate::signer::{sign_payload, SignedPayload};
use crate::store::VaultStore;
use crate::vault::{EncryptedVault, VaultCipher};

// ---------------------------------------------------------------------------
// CreatedWallet
// ---------------------------------------------------------------------------

/// Result of [`WalletSession::create`].
pub struct CreatedWallet {
    /// Address of the new wallet.
    pub address: String,
    /// The generated recovery phrase, present only when the session
    /// generated it. Hand it to a [`crate::backup::BackupFlow`].
    pub mnemonic: Option<Mnemonic>,
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

enum SessionState {
    NoWallet,
    Locked {
        vault: EncryptedVault,
    },
    Unlocked {
        vault: EncryptedVault,
        keypair: KeyPair,
        address: String,
    },
}

impl SessionState {
    fn vault(&self) -> Option<&EncryptedVault> {
        match self {
            SessionState::NoWallet => None,
            SessionState::Locked { vault } | SessionState::Unlocked { vault, .. } => Some(vault),
        }
    }
}

// ---------------------------------------------------------------------------
// WalletSession
// ---------------------------------------------------------------------------

/// The single owner of a wallet's key material.
pub struct WalletSession<S: VaultStore> {
    store: S,
    config: WalletConfig,
    path: DerivationPath,
    state: SessionState,
}

impl<S: VaultStore> WalletSession<S> {
    /// Opens a session over `store`.
    ///
    /// Starts `Locked` if the store holds a vault, `NoWallet` otherwise.
    ///
    /// # Errors
    ///
    /// - [`VindexError::ConfigError`] if `config` is invalid.
    /// - [`VindexError::VaultCorrupt`] / [`VindexError::StorageFailure`]
    ///   from loading the vault.
    pub fn open(store: S, config: WalletConfig) -> Result<Self> {
        config.validate()?;
        if config.allow_weak_kdf && config.kdf.check_seal_floor().is_err() {
            tracing::warn!(
                m_cost = config.kdf.m_cost,
                t_cost = config.kdf.t_cost,
                "sealing with kdf parameters below the floor"
            );
        }
        let path = DerivationPath::parse(&config.derivation_path)?;

        let state = match store.load()? {
            Some(vault) => {
                tracing::info!(address = %vault.address(), "wallet loaded");
                SessionState::Locked { vault }
            }
            None => SessionState::NoWallet,
        };

        Ok(Self {
            store,
            config,
            path,
            state,
        })
    }

    /// Creates a wallet, generating a mnemonic when none is given.
    ///
    /// Replaces any existing locked wallet. On success the session is
    /// `Unlocked`.
    ///
    /// # Errors
    ///
    /// - [`VindexError::InvalidState`] if a wallet is currently unlocked.
    /// - [`VindexError::WeakPassword`] if `password` fails the policy.
    /// - [`VindexError::StorageFailure`] if the vault cannot be saved.
    pub fn create(&mut self, mnemonic: Option<Mnemonic>, password: &str) -> Result<CreatedWallet> {
        self.ensure_not_unlocked()?;
        check_password(&self.config.password_policy, password)?;

        let (mnemonic, generated) = match mnemonic {
            Some(m) => (m, false),
            None => (generate_mnemonic()?, true),
        };

        let address = self.install(&mnemonic, password)?;
        tracing::info!(address = %address, generated, "wallet created");

        Ok(CreatedWallet {
            address,
            mnemonic: generated.then_some(mnemonic),
        })
    }

    /// Restores a wallet from recovery phrase text.
    ///
    /// The phrase is validated before anything else happens.
    ///
    /// # Errors
    ///
    /// - [`VindexError::InvalidState`] if a wallet is currently unlocked.
    /// - [`VindexError::InvalidMnemonic`] if the phrase is invalid.
    /// - [`VindexError::WeakPassword`] if `password` fails the policy.
    /// - [`VindexError::StorageFailure`] if the vault cannot be saved.
    pub fn import(&mut self, mnemonic_text: &str, password: &str) -> Result<String> {
        self.ensure_not_unlocked()?;
        let mnemonic = Mnemonic::parse(mnemonic_text)?;
        check_password(&self.config.password_policy, password)?;

        let address = self.install(&mnemonic, password)?;
        tracing::info!(address = %address, "wallet imported");
        Ok(address)
    }

    /// Unlocks the wallet and returns its address.
    ///
    /// The keypair is re-derived from the decrypted seed and its address
    /// must equal the one recorded in the vault. When the vault's KDF
    /// parameters are weaker than the configured ones it is re-sealed with
    /// the configured parameters; a failed upgrade is logged only.
    ///
    /// The password is checked against the vault in every state. Calling
    /// `unlock` on an unlocked session with the right password returns the
    /// address; with a wrong one the session is locked.
    ///
    /// # Errors
    ///
    /// - [`VindexError::NoWallet`] if there is no wallet.
    /// - [`VindexError::AuthenticationFailure`] if the password is wrong,
    ///   the vault was tampered with, or the address does not match. The
    ///   session ends up `Locked`.
    pub fn unlock(&mut self, password: &str) -> Result<String> {
        if let SessionState::Unlocked { vault, address, .. } = &self.state {
            let address = address.clone();
            return match VaultCipher::decrypt(vault, password) {
                Ok(_) => Ok(address),
                Err(e) => {
                    tracing::warn!(address = %address, "unlock failed: authentication failure, locking");
                    self.lock();
                    Err(e)
                }
            };
        }

        let vault = match &self.state {
            SessionState::Locked { vault } => vault.clone(),
            _ => return Err(VindexError::NoWallet),
        };

        let seed = VaultCipher::decrypt(&vault, password).map_err(|e| {
            if matches!(e, VindexError::AuthenticationFailure) {
                tracing::warn!(address = %vault.address(), "unlock failed: authentication failure");
            }
            e
        })?;

        let path = DerivationPath::parse(vault.derivation_path())
            .map_err(|_| VindexError::AuthenticationFailure)?;
        let (keypair, address) = derive_account(&seed, &path, &self.config.address_prefix)?;

        if address != vault.address() {
            tracing::warn!(
                stored = %vault.address(),
                derived = %address,
                "unlock failed: address mismatch"
            );
            return Err(VindexError::AuthenticationFailure);
        }

        let vault = self.maybe_upgrade_kdf(vault, &seed, password);

        tracing::info!(address = %address, "wallet unlocked");
        self.state = SessionState::Unlocked {
            vault,
            keypair,
            address: address.clone(),
        };
        Ok(address)
    }

    /// Locks the wallet, wiping the keypair. No-op unless unlocked.
    pub fn lock(&mut self) {
        match mem::replace(&mut self.state, SessionState::NoWallet) {
            SessionState::Unlocked {
                vault,
                mut keypair,
                address,
            } => {
                keypair.zeroize();
                drop(keypair);
                tracing::info!(address = %address, "wallet locked");
                self.state = SessionState::Locked { vault };
            }
            other => self.state = other,
        }
    }

    /// Re-seals the vault under a new password.
    ///
    /// The old password is always checked against the vault, even when the
    /// session is unlocked. The session stays in its current state.
    ///
    /// # Errors
    ///
    /// - [`VindexError::NoWallet`] if there is no wallet.
    /// - [`VindexError::AuthenticationFailure`] if `old` is wrong.
    /// - [`VindexError::WeakPassword`] if `new` fails the policy.
    /// - [`VindexError::StorageFailure`] if the vault cannot be saved; the
    ///   old vault remains valid.
    pub fn change_password(&mut self, old: &str, new: &str) -> Result<()> {
        let vault = self.state.vault().ok_or(VindexError::NoWallet)?;

        let seed = VaultCipher::decrypt(vault, old).map_err(|e| {
            if matches!(e, VindexError::AuthenticationFailure) {
                tracing::warn!(address = %vault.address(), "password change failed: authentication failure");
            }
            e
        })?;
        check_password(&self.config.password_policy, new)?;

        let resealed = VaultCipher::new(self.config.kdf).encrypt(
            &seed,
            new,
            vault.derivation_path(),
            vault.address(),
        )?;
        self.store.save(&resealed)?;

        tracing::info!(address = %resealed.address(), "wallet password changed");
        match &mut self.state {
            SessionState::Locked { vault } | SessionState::Unlocked { vault, .. } => {
                *vault = resealed;
            }
            SessionState::NoWallet => {}
        }
        Ok(())
    }

    /// Signs `payload` with the unlocked keypair.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::NotUnlocked`] unless the session is unlocked.
    pub fn sign(&self, payload: &[u8]) -> Result<SignedPayload> {
        match &self.state {
            SessionState::Unlocked {
                keypair, address, ..
            } => sign_payload(keypair, address, payload),
            _ => Err(VindexError::NotUnlocked),
        }
    }

    /// Address of the wallet, if one exists. Available while locked.
    pub fn current_address(&self) -> Option<String> {
        match &self.state {
            SessionState::NoWallet => None,
            SessionState::Locked { vault } => Some(vault.address().to_string()),
            SessionState::Unlocked { address, .. } => Some(address.clone()),
        }
    }

    /// Returns `true` while the keypair is in memory.
    pub fn is_unlocked(&self) -> bool {
        matches!(self.state, SessionState::Unlocked { .. })
    }

    /// Current lifecycle state.
    pub fn status(&self) -> WalletStatus {
        match self.state {
            SessionState::NoWallet => WalletStatus::NoWallet,
            SessionState::Locked { .. } => WalletStatus::Locked,
            SessionState::Unlocked { .. } => WalletStatus::Unlocked,
        }
    }

    /// The persisted vault, if any.
    pub fn vault(&self) -> Option<&EncryptedVault> {
        self.state.vault()
    }

    /// Session configuration.
    pub fn config(&self) -> &WalletConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Internal
    // -----------------------------------------------------------------------

    fn ensure_not_unlocked(&self) -> Result<()> {
        if self.is_unlocked() {
            return Err(VindexError::InvalidState {
                reason: "lock the current wallet first".into(),
            });
        }
        Ok(())
    }

    /// Derive, seal, persist, then switch to `Unlocked`.
    fn install(&mut self, mnemonic: &Mnemonic, password: &str) -> Result<String> {
        let seed = mnemonic_to_seed(mnemonic, "")?;
        let (keypair, address) = derive_account(&seed, &self.path, &self.config.address_prefix)?;

        let vault = VaultCipher::new(self.config.kdf).encrypt(
            &seed,
            password,
            &self.path.to_string(),
            &address,
        )?;
        self.store.save(&vault)?;

        self.state = SessionState::Unlocked {
            vault,
            keypair,
            address: address.clone(),
        };
        Ok(address)
    }

    fn maybe_upgrade_kdf(&self, vault: EncryptedVault, seed: &Seed, password: &str) -> EncryptedVault {
        if !self.config.upgrade_kdf_on_unlock || !vault.kdf_params().is_weaker_than(&self.config.kdf) {
            return vault;
        }

        let upgraded = VaultCipher::new(self.config.kdf)
            .encrypt(seed, password, vault.derivation_path(), vault.address())
            .and_then(|v| self.store.save(&v).map(|()| v));

        match upgraded {
            Ok(v) => {
                tracing::info!(
                    address = %v.address(),
                    m_cost = self.config.kdf.m_cost,
                    t_cost = self.config.kdf.t_cost,
                    p_cost = self.config.kdf.p_cost,
                    "vault kdf parameters upgraded"
                );
                v
            }
            Err(e) => {
                tracing::warn!(error = %e, "vault kdf upgrade failed");
                vault
            }
        }
    }
}

impl<S: VaultStore> Drop for WalletSession<S> {
    fn drop(&mut self) {
        self.lock();
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryVaultStore;
    use std::sync::Arc;
    use vindex_crypto::kdf::Argon2Params;

    const PHRASE: &str =
        "legal winner thank year wave sausage worth useful legal winner thank yellow";

    fn light_config() -> WalletConfig {
        WalletConfig {
            kdf: Argon2Params {
                m_cost: 64,
                t_cost: 1,
                p_cost: 1,
            },
            allow_weak_kdf: true,
            ..WalletConfig::default()
        }
    }

    fn session() -> std::result::Result<WalletSession<Arc<MemoryVaultStore>>, VindexError> {
        WalletSession::open(Arc::new(MemoryVaultStore::new()), light_config())
    }

    #[test]
    fn empty_store_opens_as_no_wallet() -> std::result::Result<(), VindexError> {
        let s = session()?;
        assert_eq!(s.status(), WalletStatus::NoWallet);
        assert_eq!(s.current_address(), None);
        assert!(!s.is_unlocked());
        Ok(())
    }

    #[test]
    fn create_generates_mnemonic_and_unlocks() -> std::result::Result<(), VindexError> {
        let mut s = session()?;
        let created = s.create(None, "Passw0rd!")?;
        assert!(created.mnemonic.is_some());
        assert!(created.address.starts_with("vindex1"));
        assert_eq!(s.status(), WalletStatus::Unlocked);
        Ok(())
    }

    #[test]
    fn create_with_supplied_mnemonic_returns_none() -> std::result::Result<(), VindexError> {
        let mut s = session()?;
        let created = s.create(Some(Mnemonic::parse(PHRASE)?), "Passw0rd!")?;
        assert!(created.mnemonic.is_none());
        Ok(())
    }

    #[test]
    fn create_while_unlocked_is_invalid_state() -> std::result::Result<(), VindexError> {
        let mut s = session()?;
        s.create(None, "Passw0rd!")?;
        assert!(matches!(
            s.create(None, "Passw0rd!"),
            Err(VindexError::InvalidState { .. })
        ));
        Ok(())
    }

    #[test]
    fn weak_password_leaves_no_wallet() -> std::result::Result<(), VindexError> {
        let store = Arc::new(MemoryVaultStore::new());
        let mut s = WalletSession::open(store.clone(), light_config())?;
        assert!(matches!(
            s.create(None, "short"),
            Err(VindexError::WeakPassword { .. })
        ));
        assert_eq!(s.status(), WalletStatus::NoWallet);
        assert!(!store.exists());
        Ok(())
    }

    #[test]
    fn sign_requires_unlock() -> std::result::Result<(), VindexError> {
        let mut s = session()?;
        assert!(matches!(s.sign(b"x"), Err(VindexError::NotUnlocked)));
        s.import(PHRASE, "Passw0rd!")?;
        s.lock();
        assert!(matches!(s.sign(b"x"), Err(VindexError::NotUnlocked)));
        s.unlock("Passw0rd!")?;
        let signed = s.sign(b"x")?;
        assert_eq!(Some(signed.address), s.current_address());
        Ok(())
    }

    #[test]
    fn unlock_without_wallet_is_no_wallet() -> std::result::Result<(), VindexError> {
        let mut s = session()?;
        assert!(matches!(s.unlock("Passw0rd!"), Err(VindexError::NoWallet)));
        Ok(())
    }

    #[test]
    fn unlock_when_unlocked_rechecks_password() -> std::result::Result<(), VindexError> {
        let mut s = session()?;
        let address = s.import(PHRASE, "Passw0rd!")?;
        assert_eq!(s.unlock("Passw0rd!")?, address);
        assert!(s.is_unlocked());

        assert!(matches!(
            s.unlock("anything"),
            Err(VindexError::AuthenticationFailure)
        ));
        assert_eq!(s.status(), WalletStatus::Locked);
        assert!(matches!(s.sign(b"x"), Err(VindexError::NotUnlocked)));

        assert_eq!(s.unlock("Passw0rd!")?, address);
        Ok(())
    }

    #[test]
    fn lock_is_idempotent() -> std::result::Result<(), VindexError> {
        let mut s = session()?;
        s.lock();
        assert_eq!(s.status(), WalletStatus::NoWallet);
        s.import(PHRASE, "Passw0rd!")?;
        s.lock();
        s.lock();
        assert_eq!(s.status(), WalletStatus::Locked);
        Ok(())
    }

    #[test]
    fn weaker_vault_is_upgraded_on_unlock() -> std::result::Result<(), VindexError> {
        let store = Arc::new(MemoryVaultStore::new());
        {
            let mut s = WalletSession::open(store.clone(), light_config())?;
            s.import(PHRASE, "Passw0rd!")?;
        }

        let stronger = WalletConfig {
            kdf: Argon2Params {
                m_cost: 128,
                t_cost: 2,
                p_cost: 1,
            },
            ..light_config()
        };
        let mut s = WalletSession::open(store.clone(), stronger)?;
        s.unlock("Passw0rd!")?;

        let persisted = store.load()?.ok_or(VindexError::NoWallet)?;
        assert_eq!(persisted.kdf_params().m_cost, 128);
        assert_eq!(persisted.kdf_params().t_cost, 2);

        s.lock();
        s.unlock("Passw0rd!")?;
        Ok(())
    }

    #[test]
    fn upgrade_disabled_keeps_params() -> std::result::Result<(), VindexError> {
        let store = Arc::new(MemoryVaultStore::new());
        {
            let mut s = WalletSession::open(store.clone(), light_config())?;
            s.import(PHRASE, "Passw0rd!")?;
        }

        let config = WalletConfig {
            kdf: Argon2Params {
                m_cost: 128,
                t_cost: 2,
                p_cost: 1,
            },
            upgrade_kdf_on_unlock: false,
            ..light_config()
        };
        let mut s = WalletSession::open(store.clone(), config)?;
        s.unlock("Passw0rd!")?;

        let persisted = store.load()?.ok_or(VindexError::NoWallet)?;
        assert_eq!(persisted.kdf_params().m_cost, 64);
        Ok(())
    }

    #[test]
    fn weak_kdf_rejected_on_open_without_opt_in() {
        let config = WalletConfig {
            allow_weak_kdf: false,
            ..light_config()
        };
        assert!(matches!(
            WalletSession::open(MemoryVaultStore::new(), config),
            Err(VindexError::ConfigError { .. })
        ));
    }

    #[test]
    fn default_kdf_seals_at_or_above_floor() -> std::result::Result<(), VindexError> {
        let store = Arc::new(MemoryVaultStore::new());
        let mut s = WalletSession::open(store.clone(), WalletConfig::default())?;
        s.import(PHRASE, "Passw0rd!")?;
        let persisted = store.load()?.ok_or(VindexError::NoWallet)?;
        persisted.kdf_params().check_seal_floor()?;
        assert_eq!(*persisted.kdf_params(), Argon2Params::default());
        Ok(())
    }

    #[test]
    fn invalid_config_rejected_on_open() {
        let config = WalletConfig {
            address_prefix: "Not Valid".into(),
            ..light_config()
        };
        assert!(matches!(
            WalletSession::open(MemoryVaultStore::new(), config),
            Err(VindexError::ConfigError { .. })
        ));
    }
}
