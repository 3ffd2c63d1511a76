//! Shareable async front-end for a [`WalletSession`].
//!
//! Every operation takes the session mutex on the blocking pool, so
//! Argon2id work never stalls the async runtime and concurrent callers are
//! serialized. A caller that hits its timeout gets [`VindexError::Timeout`]
//! while the operation itself runs to completion in the background.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use vindex_crypto::mnemonic::Mnemonic;
use vindex_types::{Result, VindexError, WalletStatus};
use zeroize::Zeroizing;

use crate::session::{CreatedWallet, WalletSession};
use crate::signer::SignedPayload;
use crate::store::VaultStore;

/// Cloneable handle to a shared [`WalletSession`].
pub struct WalletHandle<S: VaultStore + 'static> {
    session: Arc<Mutex<WalletSession<S>>>,
    timeout: Duration,
}

impl<S: VaultStore + 'static> Clone for WalletHandle<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            timeout: self.timeout,
        }
    }
}

impl<S: VaultStore + 'static> WalletHandle<S> {
    /// Wraps `session`, taking the timeout from its configuration.
    pub fn new(session: WalletSession<S>) -> Self {
        let timeout = Duration::from_secs(session.config().operation_timeout_secs);
        Self {
            session: Arc::new(Mutex::new(session)),
            timeout,
        }
    }

    /// Overrides the per-operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Per-operation timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// See [`WalletSession::create`].
    pub async fn create(
        &self,
        mnemonic: Option<Mnemonic>,
        password: impl Into<String>,
    ) -> Result<CreatedWallet> {
        let password = Zeroizing::new(password.into());
        self.run("create", move |s| s.create(mnemonic, &password)).await
    }

    /// See [`WalletSession::import`].
    pub async fn import(
        &self,
        mnemonic_text: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<String> {
        let text = Zeroizing::new(mnemonic_text.into());
        let password = Zeroizing::new(password.into());
        self.run("import", move |s| s.import(&text, &password)).await
    }

    /// See [`WalletSession::unlock`].
    pub async fn unlock(&self, password: impl Into<String>) -> Result<String> {
        let password = Zeroizing::new(password.into());
        self.run("unlock", move |s| s.unlock(&password)).await
    }

    /// See [`WalletSession::lock`].
    pub async fn lock(&self) -> Result<()> {
        self.run("lock", |s| {
            s.lock();
            Ok(())
        })
        .await
    }

    /// See [`WalletSession::change_password`].
    pub async fn change_password(
        &self,
        old: impl Into<String>,
        new: impl Into<String>,
    ) -> Result<()> {
        let old = Zeroizing::new(old.into());
        let new = Zeroizing::new(new.into());
        self.run("change_password", move |s| s.change_password(&old, &new))
            .await
    }

    /// See [`WalletSession::sign`].
    pub async fn sign(&self, payload: impl Into<Vec<u8>>) -> Result<SignedPayload> {
        let payload = payload.into();
        self.run("sign", move |s| s.sign(&payload)).await
    }

    /// See [`WalletSession::current_address`].
    pub async fn current_address(&self) -> Result<Option<String>> {
        self.run("current_address", |s| Ok(s.current_address())).await
    }

    /// See [`WalletSession::is_unlocked`].
    pub async fn is_unlocked(&self) -> Result<bool> {
        self.run("is_unlocked", |s| Ok(s.is_unlocked())).await
    }

    /// See [`WalletSession::status`].
    pub async fn status(&self) -> Result<WalletStatus> {
        self.run("status", |s| Ok(s.status())).await
    }

    async fn run<T, F>(&self, op_name: &'static str, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut WalletSession<S>) -> Result<T> + Send + 'static,
    {
        let session = Arc::clone(&self.session);
        let task = tokio::task::spawn_blocking(move || {
            let mut guard = session.lock().unwrap_or_else(|e| e.into_inner());
            op(&mut guard)
        });

        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(VindexError::InvalidState {
                reason: format!("wallet {op_name} task failed: {e}"),
            }),
            Err(_) => {
                tracing::warn!(
                    operation = op_name,
                    timeout_ms = self.timeout.as_millis() as u64,
                    "wallet operation timed out"
                );
                Err(VindexError::Timeout)
            }
        }
    }
}
