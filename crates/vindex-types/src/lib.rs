//! Core shared types for the VindexChain wallet core.
//!
//! This crate defines the error taxonomy, the wallet status reported to
//! collaborators, and the configuration shared by every other crate in
//! the workspace. It deliberately carries no cryptographic dependencies.

pub mod config;

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// WalletStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of the wallet session as seen by collaborators.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum WalletStatus {
    /// No vault has been created or imported yet.
    NoWallet,
    /// A vault exists but no key material is held in memory.
    Locked,
    /// The vault is decrypted and the keypair is available for signing.
    Unlocked,
}

impl fmt::Display for WalletStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoWallet => write!(f, "no-wallet"),
            Self::Locked => write!(f, "locked"),
            Self::Unlocked => write!(f, "unlocked"),
        }
    }
}

// ---------------------------------------------------------------------------
// VindexError
// ---------------------------------------------------------------------------

/// Central error type for the wallet core.
///
/// All crates in the workspace convert their internal errors into variants
/// of this enum. The first eight variants form the taxonomy surfaced to
/// collaborators; the remainder describe failures of supporting layers.
///
/// [`VindexError::AuthenticationFailure`] intentionally carries no detail:
/// a wrong password and a corrupted ciphertext must be indistinguishable.
#[derive(Debug, Error)]
pub enum VindexError {
    /// The recovery phrase is malformed or fails its checksum.
    #[error("invalid mnemonic: {reason}")]
    InvalidMnemonic {
        /// Which check rejected the phrase.
        reason: String,
    },

    /// The new password does not satisfy the password policy.
    #[error("weak password: {reason}")]
    WeakPassword {
        /// Which policy rule was violated.
        reason: String,
    },

    /// The password and its confirmation differ.
    #[error("password confirmation does not match")]
    PasswordMismatch,

    /// Wrong password or corrupted vault.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// The backup-phrase quiz was answered incorrectly.
    #[error("recovery phrase verification failed")]
    VerificationFailed,

    /// A privileged operation was attempted while the session is not unlocked.
    #[error("wallet is not unlocked")]
    NotUnlocked,

    /// The persisted vault is structurally invalid.
    #[error("vault corrupt: {reason}")]
    VaultCorrupt {
        /// Description of the structural problem.
        reason: String,
    },

    /// The underlying persistence layer failed.
    #[error("storage failure: {reason}")]
    StorageFailure {
        /// Description of the I/O failure.
        reason: String,
    },

    /// No vault exists yet; create or import one first.
    #[error("no wallet has been created or imported")]
    NoWallet,

    /// The operation is not valid in the current session state.
    #[error("invalid session state: {reason}")]
    InvalidState {
        /// Description of the state conflict.
        reason: String,
    },

    /// The caller stopped waiting for the result.
    #[error("operation timed out")]
    Timeout,

    /// A cryptographic primitive failed (derivation, signing, encoding).
    #[error("crypto error: {reason}")]
    CryptoError {
        /// Human-readable description of the cryptographic failure.
        reason: String,
    },

    /// A configuration value is invalid or missing.
    #[error("config error: {reason}")]
    ConfigError {
        /// Human-readable description of the configuration problem.
        reason: String,
    },

    /// An address string is malformed or fails checksum validation.
    #[error("invalid address: {reason}")]
    InvalidAddress {
        /// Human-readable description of why the address is invalid.
        reason: String,
    },
}

// ---------------------------------------------------------------------------
// Result alias
// ---------------------------------------------------------------------------

/// Convenience result type using [`VindexError`].
pub type Result<T> = std::result::Result<T, VindexError>;

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wallet_status_display() {
        assert_eq!(WalletStatus::NoWallet.to_string(), "no-wallet");
        assert_eq!(WalletStatus::Locked.to_string(), "locked");
        assert_eq!(WalletStatus::Unlocked.to_string(), "unlocked");
    }

    #[test]
    fn wallet_status_serde_json_roundtrip() -> std::result::Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string(&WalletStatus::Locked)?;
        let parsed: WalletStatus = serde_json::from_str(&json)?;
        assert_eq!(parsed, WalletStatus::Locked);
        Ok(())
    }

    #[test]
    fn error_display_includes_reason() {
        let err = VindexError::InvalidMnemonic {
            reason: "word 'foo' not in wordlist".into(),
        };
        assert!(err.to_string().contains("foo"));
    }

    #[test]
    fn authentication_failure_carries_no_detail() {
        assert_eq!(
            VindexError::AuthenticationFailure.to_string(),
            "authentication failed"
        );
    }
}
