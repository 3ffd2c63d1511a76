//! secp256k1 ECDSA signature operations.
//!
//! Signatures are ECDSA over secp256k1 with SHA-256 as the message digest
//! and RFC 6979 deterministic nonces, normalized to low-S. Determinism
//! means a signing request never depends on the quality of a runtime RNG,
//! and two distinct payloads can never share a nonce.
//!
//! The private scalar lives only inside [`KeyPair`]. Each signing call
//! builds a transient `k256` signing key that zeroizes itself on drop.

use std::fmt;

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature as K256Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use vindex_types::{Result, VindexError};
use zeroize::{Zeroize, Zeroizing};

// ---------------------------------------------------------------------------
// PublicKey
// ---------------------------------------------------------------------------

/// SEC1 compressed secp256k1 public key (33 bytes).
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct PublicKey([u8; 33]);

impl PublicKey {
    /// Fixed byte length of a compressed public key.
    pub const LEN: usize = 33;

    /// Creates a [`PublicKey`] from compressed bytes, checking that they
    /// encode a point on the curve.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::CryptoError`] if the bytes are not a valid
    /// compressed point.
    pub fn from_bytes(bytes: [u8; 33]) -> Result<Self> {
        VerifyingKey::from_sec1_bytes(&bytes).map_err(|_| VindexError::CryptoError {
            reason: "invalid secp256k1 public key".into(),
        })?;
        Ok(Self(bytes))
    }

    /// Parses a hex-encoded compressed public key.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 33];
        hex::decode_to_slice(s.trim(), &mut bytes).map_err(|e| VindexError::CryptoError {
            reason: format!("invalid public key hex: {e}"),
        })?;
        Self::from_bytes(bytes)
    }

    /// Returns the underlying 33-byte array.
    pub fn as_bytes(&self) -> &[u8; 33] {
        &self.0
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// Signature
// ---------------------------------------------------------------------------

/// Compact ECDSA signature `r ‖ s` (64 bytes).
#[derive(Clone, Copy, Eq, PartialEq)]
pub struct Signature([u8; 64]);

impl Signature {
    /// Fixed byte length of a compact signature.
    pub const LEN: usize = 64;

    /// Creates a [`Signature`] from raw bytes.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Parses a hex-encoded compact signature.
    pub fn from_hex(s: &str) -> Result<Self> {
        let mut bytes = [0u8; 64];
        hex::decode_to_slice(s.trim(), &mut bytes).map_err(|e| VindexError::CryptoError {
            reason: format!("invalid signature hex: {e}"),
        })?;
        Ok(Self(bytes))
    }

    /// Returns the underlying 64-byte array.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// The `r` component (x-coordinate of the nonce point).
    pub fn r(&self) -> &[u8] {
        &self.0[..32]
    }

    /// Lowercase hex encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({})", self.to_hex())
    }
}

// ---------------------------------------------------------------------------
// KeyPair
// ---------------------------------------------------------------------------

/// secp256k1 signing keypair.
///
/// The private scalar is held in a zeroizing buffer and never exposed.
/// [`Zeroize::zeroize`] wipes it explicitly; dropping the keypair wipes
/// it as well.
pub struct KeyPair {
    secret: Zeroizing<[u8; 32]>,
    public: PublicKey,
}

impl KeyPair {
    /// Builds a keypair from a 32-byte private scalar.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::CryptoError`] if the scalar is zero or not
    /// below the curve order.
    pub fn from_secret_bytes(secret: &[u8; 32]) -> Result<Self> {
        let signing_key = SigningKey::from_slice(secret).map_err(|_| VindexError::CryptoError {
            reason: "invalid secp256k1 private key".into(),
        })?;

        let point = k256::PublicKey::from(signing_key.verifying_key()).to_encoded_point(true);
        let mut public = [0u8; 33];
        public.copy_from_slice(point.as_bytes());

        Ok(Self {
            secret: Zeroizing::new(*secret),
            public: PublicKey(public),
        })
    }

    /// Returns the public half of this keypair.
    pub fn public_key(&self) -> &PublicKey {
        &self.public
    }

    /// Signs `payload` (hashed with SHA-256) using RFC 6979 nonces.
    ///
    /// Deterministic: the same keypair and payload always yield the same
    /// signature.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::CryptoError`] if the keypair has been wiped.
    pub fn sign(&self, payload: &[u8]) -> Result<Signature> {
        let signing_key =
            SigningKey::from_slice(&self.secret[..]).map_err(|_| VindexError::CryptoError {
                reason: "keypair is no longer usable".into(),
            })?;
        let sig: K256Signature = signing_key.sign(payload);

        let mut out = [0u8; 64];
        out.copy_from_slice(&sig.to_bytes());
        Ok(Signature(out))
    }
}

impl Zeroize for KeyPair {
    fn zeroize(&mut self) {
        self.secret.zeroize();
    }
}

// No Clone or Debug for KeyPair.

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Verifies an ECDSA signature against a public key and payload.
///
/// High-S signatures are rejected.
///
/// # Errors
///
/// Returns [`VindexError::CryptoError`] if the signature is malformed or
/// does not verify.
pub fn verify(public_key: &PublicKey, payload: &[u8], signature: &Signature) -> Result<()> {
    let vk = VerifyingKey::from_sec1_bytes(&public_key.0).map_err(|_| VindexError::CryptoError {
        reason: "invalid secp256k1 public key".into(),
    })?;
    let sig = K256Signature::from_slice(&signature.0).map_err(|_| VindexError::CryptoError {
        reason: "malformed signature".into(),
    })?;
    vk.verify(payload, &sig).map_err(|_| VindexError::CryptoError {
        reason: "signature verification failed".into(),
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
