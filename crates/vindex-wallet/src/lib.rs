//! Wallet lifecycle for VindexChain.
//!
//! - **Create** a wallet from a new or supplied BIP39 mnemonic
//! - **Seal** the seed in a vault (Argon2id + XChaCha20-Poly1305)
//! - **Lock / Unlock** with a password, re-checking the address each time
//! - **Backup** verification before a new mnemonic is released
//! - **Import** from an existing mnemonic
//! - **Sign** payloads while unlocked
//!
//! [`session::WalletSession`] owns all key material. [`handle::WalletHandle`]
//! shares it across async tasks.

pub mod backup;
pub mod handle;
pub mod password;
pub mod session;
pub mod signer;
pub mod store;
pub mod vault;

pub use backup::{BackupFlow, BackupState};
pub use handle::WalletHandle;
pub use session::{CreatedWallet, WalletSession};
pub use signer::SignedPayload;
pub use store::{FileVaultStore, MemoryVaultStore, VaultStore};
pub use vault::{EncryptedVault, VaultCipher};
