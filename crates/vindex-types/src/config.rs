//! Wallet configuration with sensible defaults.
//!
//! All operational parameters of the wallet core are centralized here.
//! Every value has a documented default; [`WalletConfig::validate`] is
//! called once when a session is opened.

use serde::{Deserialize, Serialize};

use crate::{Result, VindexError};

/// Default bech32 human-readable prefix for addresses.
pub const DEFAULT_ADDRESS_PREFIX: &str = "vindex";

/// Default BIP32 derivation path (coin type 118, first account, first key).
pub const DEFAULT_DERIVATION_PATH: &str = "m/44'/118'/0'/0/0";

// ---------------------------------------------------------------------------
// Argon2Params
// ---------------------------------------------------------------------------

/// Argon2id cost parameters.
///
/// Stored inside every vault so that a vault can always be decrypted with
/// the parameters it was sealed with, independent of the current config.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Argon2Params {
    /// Memory cost in KiB.
    pub m_cost: u32,
    /// Number of iterations.
    pub t_cost: u32,
    /// Degree of parallelism.
    pub p_cost: u32,
}

impl Argon2Params {
    /// Smallest memory cost accepted by Argon2 for `p_cost = 1`.
    pub const MIN_M_COST: u32 = 8;
    /// Largest memory cost accepted from a persisted vault (1 GiB).
    pub const MAX_M_COST: u32 = 1024 * 1024;
    /// Largest iteration count accepted from a persisted vault.
    pub const MAX_T_COST: u32 = 32;
    /// Largest parallelism accepted from a persisted vault.
    pub const MAX_P_COST: u32 = 16;
    /// Smallest memory cost used to seal a new vault (19 MiB).
    pub const MIN_SEAL_M_COST: u32 = 19 * 1024;
    /// Smallest iteration count used to seal a new vault.
    pub const MIN_SEAL_T_COST: u32 = 2;

    /// Returns `true` if no cost of `self` exceeds the corresponding cost
    /// of `other` and at least one is lower.
    pub fn is_weaker_than(&self, other: &Argon2Params) -> bool {
        self.m_cost <= other.m_cost
            && self.t_cost <= other.t_cost
            && self.p_cost <= other.p_cost
            && self != other
    }

    /// Checks the parameters against the accepted bounds.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::ConfigError`] naming the offending field.
    pub fn check_bounds(&self) -> Result<()> {
        if self.p_cost == 0 || self.p_cost > Self::MAX_P_COST {
            return Err(VindexError::ConfigError {
                reason: format!("p_cost must be 1..={}", Self::MAX_P_COST),
            });
        }
        if self.t_cost == 0 || self.t_cost > Self::MAX_T_COST {
            return Err(VindexError::ConfigError {
                reason: format!("t_cost must be 1..={}", Self::MAX_T_COST),
            });
        }
        let min_m = Self::MIN_M_COST.saturating_mul(self.p_cost);
        if self.m_cost < min_m || self.m_cost > Self::MAX_M_COST {
            return Err(VindexError::ConfigError {
                reason: format!("m_cost must be {min_m}..={} KiB", Self::MAX_M_COST),
            });
        }
        Ok(())
    }

    /// Checks that the parameters are strong enough to seal a new vault.
    ///
    /// Stored vaults are only held to [`Argon2Params::check_bounds`]; the
    /// floor applies to what this wallet writes.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::ConfigError`] naming the offending field.
    pub fn check_seal_floor(&self) -> Result<()> {
        self.check_bounds()?;
        if self.m_cost < Self::MIN_SEAL_M_COST {
            return Err(VindexError::ConfigError {
                reason: format!(
                    "m_cost must be at least {} KiB to seal a vault",
                    Self::MIN_SEAL_M_COST
                ),
            });
        }
        if self.t_cost < Self::MIN_SEAL_T_COST {
            return Err(VindexError::ConfigError {
                reason: format!(
                    "t_cost must be at least {} to seal a vault",
                    Self::MIN_SEAL_T_COST
                ),
            });
        }
        Ok(())
    }
}

impl Default for Argon2Params {
    /// 64 MiB, 3 iterations, 1 lane.
    fn default() -> Self {
        Self {
            m_cost: 65536,
            t_cost: 3,
            p_cost: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// PasswordPolicy
// ---------------------------------------------------------------------------

/// Rules applied to every new wallet password.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PasswordPolicy {
    /// Minimum length in characters.
    pub min_length: usize,
    /// Maximum length in characters.
    pub max_length: usize,
    /// Minimum number of distinct character classes
    /// (lowercase, uppercase, digit, other).
    pub min_char_classes: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_length: 8,
            max_length: 1024,
            min_char_classes: 2,
        }
    }
}

// ---------------------------------------------------------------------------
// WalletConfig
// ---------------------------------------------------------------------------

/// Global wallet configuration.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalletConfig {
    /// Bech32 human-readable prefix used for addresses.
    pub address_prefix: String,

    /// BIP32 derivation path used for newly created or imported wallets.
    pub derivation_path: String,

    /// Argon2id parameters used when sealing a vault.
    pub kdf: Argon2Params,

    /// Rules for new passwords.
    pub password_policy: PasswordPolicy,

    /// Re-encrypt a vault with `kdf` after unlock when its stored
    /// parameters are weaker.
    pub upgrade_kdf_on_unlock: bool,

    /// How long async callers wait for an operation before giving up.
    pub operation_timeout_secs: u64,

    /// Accept `kdf` below the sealing floor. Never read from a config
    /// file; only code can set it, for test suites that seal many vaults.
    #[serde(skip)]
    pub allow_weak_kdf: bool,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            address_prefix: DEFAULT_ADDRESS_PREFIX.into(),
            derivation_path: DEFAULT_DERIVATION_PATH.into(),
            kdf: Argon2Params::default(),
            password_policy: PasswordPolicy::default(),
            upgrade_kdf_on_unlock: true,
            operation_timeout_secs: 30,
            allow_weak_kdf: false,
        }
    }
}

impl WalletConfig {
    /// Validates all configuration values.
    ///
    /// The derivation path is only checked for shape here; it is fully
    /// parsed by the crypto layer.
    pub fn validate(&self) -> Result<()> {
        let prefix_ok = !self.address_prefix.is_empty()
            && self.address_prefix.len() <= 83
            && self
                .address_prefix
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit());
        if !prefix_ok {
            return Err(VindexError::ConfigError {
                reason: "address_prefix must be 1..=83 lowercase ascii characters".into(),
            });
        }

        if !self.derivation_path.starts_with('m') {
            return Err(VindexError::ConfigError {
                reason: "derivation_path must start with 'm'".into(),
            });
        }

        if self.allow_weak_kdf {
            self.kdf.check_bounds()?;
        } else {
            self.kdf.check_seal_floor()?;
        }

        let policy = &self.password_policy;
        if policy.min_length == 0 || policy.min_length > policy.max_length {
            return Err(VindexError::ConfigError {
                reason: "password_policy requires 0 < min_length <= max_length".into(),
            });
        }
        if policy.min_char_classes > 4 {
            return Err(VindexError::ConfigError {
                reason: "password_policy.min_char_classes must be 0..=4".into(),
            });
        }

        if self.operation_timeout_secs == 0 {
            return Err(VindexError::ConfigError {
                reason: "operation_timeout_secs must be greater than 0".into(),
            });
        }

        Ok(())
    }
}
