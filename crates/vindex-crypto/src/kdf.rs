//! Argon2id password hashing for vault keys.
//!
//! A [`PasswordKdf`] is built once from cost parameters, which are checked
//! against [`Argon2Params::check_bounds`] before Argon2 sees them, so an
//! absurd memory cost read from a damaged vault fails without allocating.
//! Sealing takes its parameters from [`vindex_types::config::WalletConfig`];
//! opening takes them from the vault.

use rand::rngs::OsRng;
use rand::RngCore;
use vindex_types::{Result, VindexError};
use zeroize::{Zeroize, ZeroizeOnDrop};

pub use vindex_types::config::Argon2Params;

/// Salt length stored in every vault.
pub const SALT_LEN: usize = 32;

/// Fresh random salt from OS entropy.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);
    salt
}

// ---------------------------------------------------------------------------
// DerivedKey
// ---------------------------------------------------------------------------

/// 256-bit symmetric key, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct DerivedKey([u8; 32]);

impl DerivedKey {
    /// Key length in bytes.
    pub const LEN: usize = 32;

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

// No Clone or Debug for DerivedKey.

// ---------------------------------------------------------------------------
// PasswordKdf
// ---------------------------------------------------------------------------

/// Argon2id (v1.3) bound to a set of checked cost parameters.
pub struct PasswordKdf {
    argon2: argon2::Argon2<'static>,
    params: Argon2Params,
}

impl PasswordKdf {
    /// # Errors
    ///
    /// [`VindexError::ConfigError`] if `params` is outside the accepted
    /// bounds or rejected by Argon2.
    pub fn new(params: &Argon2Params) -> Result<Self> {
        params.check_bounds()?;
        let argon2_params = argon2::Params::new(
            params.m_cost,
            params.t_cost,
            params.p_cost,
            Some(DerivedKey::LEN),
        )
        .map_err(|e| VindexError::ConfigError {
            reason: format!("invalid Argon2 parameters: {e}"),
        })?;

        Ok(Self {
            argon2: argon2::Argon2::new(
                argon2::Algorithm::Argon2id,
                argon2::Version::V0x13,
                argon2_params,
            ),
            params: *params,
        })
    }

    pub fn params(&self) -> &Argon2Params {
        &self.params
    }

    /// Hashes `password` with `salt` straight into a [`DerivedKey`].
    ///
    /// # Errors
    ///
    /// [`VindexError::CryptoError`] if Argon2 fails (for example when the
    /// memory cannot be allocated).
    pub fn derive_key(&self, password: &[u8], salt: &[u8; SALT_LEN]) -> Result<DerivedKey> {
        let mut key = DerivedKey([0u8; DerivedKey::LEN]);
        self.argon2
            .hash_password_into(password, salt, &mut key.0)
            .map_err(|e| VindexError::CryptoError {
                reason: format!("Argon2id derivation failed: {e}"),
            })?;
        Ok(key)
    }
}

/// One-shot form of [`PasswordKdf::derive_key`].
pub fn argon2id_derive_key(
    password: &[u8],
    salt: &[u8; SALT_LEN],
    params: &Argon2Params,
) -> Result<DerivedKey> {
    PasswordKdf::new(params)?.derive_key(password, salt)
}
