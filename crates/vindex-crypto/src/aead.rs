//! XChaCha20-Poly1305 authenticated encryption with associated data.
//!
//! Vault encryption uses XChaCha20-Poly1305 with 192-bit (24-byte)
//! nonces and a detached 16-byte Poly1305 tag, so the vault can store
//! ciphertext and tag as separate fields. Nonces are generated from OS
//! entropy and **must never be reused** with the same key.

use chacha20poly1305::aead::{AeadInPlace, KeyInit};
use chacha20poly1305::{Key, Tag, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use vindex_types::{Result, VindexError};
use zeroize::{Zeroize, Zeroizing};

/// Length of the Poly1305 authentication tag.
pub const TAG_LEN: usize = 16;

// ---------------------------------------------------------------------------
// AeadNonce
// ---------------------------------------------------------------------------

/// 192-bit (24-byte) nonce for XChaCha20-Poly1305.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AeadNonce([u8; 24]);

impl AeadNonce {
    /// Fixed byte length of an XChaCha20-Poly1305 nonce.
    pub const LEN: usize = 24;

    /// Creates an [`AeadNonce`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 24]) -> Self {
        Self(bytes)
    }

    /// Returns the underlying 24-byte array.
    pub fn as_bytes(&self) -> &[u8; 24] {
        &self.0
    }
}

/// Generates a fresh 192-bit random nonce from OS entropy.
///
/// The 192-bit space makes accidental collision negligible even for
/// randomly chosen nonces.
pub fn generate_aead_nonce() -> AeadNonce {
    let mut bytes = [0u8; 24];
    OsRng.fill_bytes(&mut bytes);
    AeadNonce(bytes)
}

// ---------------------------------------------------------------------------
// SealedBox
// ---------------------------------------------------------------------------

/// Output of [`encrypt_xchacha20`]: ciphertext with its detached tag.
#[derive(Clone, Debug)]
pub struct SealedBox {
    /// Encrypted payload (same length as the plaintext).
    pub ciphertext: Vec<u8>,
    /// Poly1305 authentication tag.
    pub tag: [u8; TAG_LEN],
}

// ---------------------------------------------------------------------------
// Encrypt / Decrypt
// ---------------------------------------------------------------------------

/// Encrypts `plaintext` with XChaCha20-Poly1305.
///
/// # Parameters
///
/// - `key`: 256-bit symmetric key.
/// - `nonce`: 192-bit nonce (must be unique per key; use
///   [`generate_aead_nonce`]).
/// - `plaintext`: data to encrypt.
/// - `aad`: additional authenticated data. Authenticated but **not**
///   encrypted.
pub fn encrypt_xchacha20(
    key: &[u8; 32],
    nonce: &AeadNonce,
    plaintext: &[u8],
    aad: &[u8],
) -> Result<SealedBox> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let xnonce = XNonce::from_slice(&nonce.0);

    let mut buffer = plaintext.to_vec();
    let tag = match cipher.encrypt_in_place_detached(xnonce, aad, &mut buffer) {
        Ok(tag) => tag,
        Err(e) => {
            buffer.zeroize();
            return Err(VindexError::CryptoError {
                reason: format!("XChaCha20-Poly1305 encryption failed: {e}"),
            });
        }
    };

    let mut tag_bytes = [0u8; TAG_LEN];
    tag_bytes.copy_from_slice(&tag);

    Ok(SealedBox {
        ciphertext: buffer,
        tag: tag_bytes,
    })
}

/// Decrypts `ciphertext` with XChaCha20-Poly1305 and a detached tag.
///
/// The plaintext is returned in a zeroizing buffer.
///
/// # Errors
///
/// Returns [`VindexError::AuthenticationFailure`] if the tag does not
/// verify (wrong key, wrong nonce, tampered ciphertext or tag, or wrong
/// AAD). No further detail is given.
pub fn decrypt_xchacha20(
    key: &[u8; 32],
    nonce: &AeadNonce,
    ciphertext: &[u8],
    tag: &[u8; TAG_LEN],
    aad: &[u8],
) -> Result<Zeroizing<Vec<u8>>> {
    let cipher = XChaCha20Poly1305::new(Key::from_slice(key));
    let xnonce = XNonce::from_slice(&nonce.0);

    let mut buffer = Zeroizing::new(ciphertext.to_vec());
    cipher
        .decrypt_in_place_detached(xnonce, aad, &mut buffer, Tag::from_slice(tag))
        .map_err(|_| VindexError::AuthenticationFailure)?;

    Ok(buffer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
