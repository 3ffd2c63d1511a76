//! Vault persistence.
//!
//! A [`VaultStore`] loads and saves exactly one [`EncryptedVault`]. Stores
//! never decrypt; they only move the sealed form. Saves are atomic: the
//! previously persisted vault survives any failure during a save.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use vindex_types::{Result, VindexError};

use crate::vault::EncryptedVault;

// ---------------------------------------------------------------------------
// VaultStore
// ---------------------------------------------------------------------------

/// Persistence backend for the wallet vault.
pub trait VaultStore: Send + Sync {
    /// Loads the persisted vault, or `None` when none exists yet.
    ///
    /// # Errors
    ///
    /// - [`VindexError::VaultCorrupt`] if the persisted form is malformed.
    /// - [`VindexError::StorageFailure`] if the backend cannot be read.
    fn load(&self) -> Result<Option<EncryptedVault>>;

    /// Atomically replaces the persisted vault.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::StorageFailure`] if the write fails; the
    /// previous vault is left intact.
    fn save(&self, vault: &EncryptedVault) -> Result<()>;

    /// Returns `true` if a vault has been persisted.
    fn exists(&self) -> bool;
}

// ---------------------------------------------------------------------------
// FileVaultStore
// ---------------------------------------------------------------------------

/// Stores the vault as a JSON file.
///
/// Writes go to a sibling `<name>.tmp` file which is flushed to disk and
/// then renamed over the target.
#[derive(Clone, Debug)]
pub struct FileVaultStore {
    path: PathBuf,
}

impl FileVaultStore {
    /// Creates a store backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "vault".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_tmp(tmp_path: &Path, contents: &[u8]) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(tmp_path)?;
        file.write_all(contents)?;
        file.sync_all()
    }
}

impl VaultStore for FileVaultStore {
    fn load(&self) -> Result<Option<EncryptedVault>> {
        let json = match fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(VindexError::StorageFailure {
                    reason: format!("failed to read vault file: {e}"),
                })
            }
        };

        EncryptedVault::from_json(&json).map(Some)
    }

    fn save(&self, vault: &EncryptedVault) -> Result<()> {
        let json = vault.to_json()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VindexError::StorageFailure {
                reason: format!("failed to create vault directory: {e}"),
            })?;
        }

        let tmp_path = self.tmp_path();
        if let Err(e) = Self::write_tmp(&tmp_path, json.as_bytes()) {
            let _ = fs::remove_file(&tmp_path);
            return Err(VindexError::StorageFailure {
                reason: format!("failed to write vault file: {e}"),
            });
        }

        fs::rename(&tmp_path, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp_path);
            VindexError::StorageFailure {
                reason: format!("failed to rename vault file: {e}"),
            }
        })?;

        // Persist the rename itself. Directories cannot be opened this way
        // on every platform, so failure here is ignored.
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            if let Ok(dir) = File::open(parent) {
                let _ = dir.sync_all();
            }
        }

        tracing::info!(path = %self.path.display(), "vault saved");
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }
}

// ---------------------------------------------------------------------------
// MemoryVaultStore
// ---------------------------------------------------------------------------

/// Keeps the vault's JSON form in memory.
///
/// Uses the same encoding as [`FileVaultStore`], so loads go through the
/// same validation. Intended for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryVaultStore {
    json: Mutex<Option<String>>,
}

impl MemoryVaultStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-loaded with raw JSON (which may be invalid).
    pub fn from_json(json: impl Into<String>) -> Self {
        Self {
            json: Mutex::new(Some(json.into())),
        }
    }

    /// Returns a copy of the stored JSON.
    pub fn raw_json(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock still guards a complete string.
        self.json.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl VaultStore for MemoryVaultStore {
    fn load(&self) -> Result<Option<EncryptedVault>> {
        match self.lock().as_deref() {
            Some(json) => EncryptedVault::from_json(json).map(Some),
            None => Ok(None),
        }
    }

    fn save(&self, vault: &EncryptedVault) -> Result<()> {
        let json = vault.to_json()?;
        *self.lock() = Some(json);
        Ok(())
    }

    fn exists(&self) -> bool {
        self.lock().is_some()
    }
}

impl<S: VaultStore + ?Sized> VaultStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<EncryptedVault>> {
        (**self).load()
    }

    fn save(&self, vault: &EncryptedVault) -> Result<()> {
        (**self).save(vault)
    }

    fn exists(&self) -> bool {
        (**self).exists()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vault::VaultCipher;
    use vindex_crypto::kdf::Argon2Params;
    use vindex_crypto::mnemonic::Seed;

    fn sample_vault(address: &str) -> std::result::Result<EncryptedVault, VindexError> {
        VaultCipher::new(Argon2Params {
            m_cost: 64,
            t_cost: 1,
            p_cost: 1,
        })
        .encrypt(&Seed::from_bytes([1u8; 64]), "Passw0rd!", "m/44'/118'/0'/0/0", address)
    }

    #[test]
    fn missing_file_loads_as_none() -> std::result::Result<(), VindexError> {
        let dir = tempfile::tempdir().map_err(|e| VindexError::StorageFailure {
            reason: e.to_string(),
        })?;
        let store = FileVaultStore::new(dir.path().join("vault.json"));
        assert!(!store.exists());
        assert!(store.load()?.is_none());
        Ok(())
    }

    #[test]
    fn file_save_then_load() -> std::result::Result<(), VindexError> {
        let dir = tempfile::tempdir().map_err(|e| VindexError::StorageFailure {
            reason: e.to_string(),
        })?;
        let store = FileVaultStore::new(dir.path().join("nested").join("vault.json"));
        let vault = sample_vault("vindex1a")?;

        store.save(&vault)?;
        assert!(store.exists());
        assert_eq!(store.load()?, Some(vault));
        assert!(!store.tmp_path().exists());
        Ok(())
    }

    #[test]
    fn file_save_replaces_previous() -> std::result::Result<(), VindexError> {
        let dir = tempfile::tempdir().map_err(|e| VindexError::StorageFailure {
            reason: e.to_string(),
        })?;
        let store = FileVaultStore::new(dir.path().join("vault.json"));

        store.save(&sample_vault("vindex1a")?)?;
        let second = sample_vault("vindex1b")?;
        store.save(&second)?;
        assert_eq!(store.load()?.map(|v| v.address().to_string()), Some("vindex1b".into()));
        Ok(())
    }

    #[test]
    fn failed_save_keeps_previous_vault() -> std::result::Result<(), VindexError> {
        let dir = tempfile::tempdir().map_err(|e| VindexError::StorageFailure {
            reason: e.to_string(),
        })?;
        let store = FileVaultStore::new(dir.path().join("vault.json"));
        let first = sample_vault("vindex1a")?;
        store.save(&first)?;

        // A directory squatting on the temp path makes the write fail.
        fs::create_dir(store.tmp_path()).map_err(|e| VindexError::StorageFailure {
            reason: e.to_string(),
        })?;
        let result = store.save(&sample_vault("vindex1b")?);
        assert!(matches!(result, Err(VindexError::StorageFailure { .. })));
        assert_eq!(store.load()?, Some(first));
        Ok(())
    }

    #[test]
    fn garbage_file_is_corrupt() -> std::result::Result<(), VindexError> {
        let dir = tempfile::tempdir().map_err(|e| VindexError::StorageFailure {
            reason: e.to_string(),
        })?;
        let path = dir.path().join("vault.json");
        fs::write(&path, b"{\"version\":").map_err(|e| VindexError::StorageFailure {
            reason: e.to_string(),
        })?;
        let store = FileVaultStore::new(path);
        assert!(matches!(store.load(), Err(VindexError::VaultCorrupt { .. })));
        Ok(())
    }

    #[test]
    fn memory_store_roundtrip() -> std::result::Result<(), VindexError> {
        let store = MemoryVaultStore::new();
        assert!(!store.exists());
        assert!(store.load()?.is_none());

        let vault = sample_vault("vindex1m")?;
        store.save(&vault)?;
        assert!(store.exists());
        assert_eq!(store.load()?, Some(vault));
        Ok(())
    }

    #[test]
    fn memory_store_validates_on_load() {
        let store = MemoryVaultStore::from_json("[]");
        assert!(matches!(store.load(), Err(VindexError::VaultCorrupt { .. })));
    }
}
