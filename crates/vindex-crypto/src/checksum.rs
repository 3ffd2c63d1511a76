//! Address checksum and Bech32 encoding.
//!
//! An address is derived from a compressed public key as
//! `SHA3-256(pubkey)`, followed by a 4-byte checksum (first 4 bytes of
//! `SHA3-256(hash)`), producing a 36-byte [`AddressWithChecksum`]. For
//! display it is Bech32-encoded with the configured human-readable prefix
//! (`vindex` by default).

use bech32::{self, FromBase32, ToBase32, Variant};
use vindex_types::{Result, VindexError};

use crate::hash::sha3_256;
use crate::signing::PublicKey;

/// Number of checksum bytes appended to the address hash.
const CHECKSUM_LEN: usize = 4;

// ---------------------------------------------------------------------------
// AddressWithChecksum
// ---------------------------------------------------------------------------

/// A 32-byte address hash plus a 4-byte integrity checksum (36 bytes total).
///
/// The checksum is the first 4 bytes of `SHA3-256(address_hash)`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct AddressWithChecksum {
    /// The 32-byte SHA3-256 hash of the public key.
    hash: [u8; 32],
    /// First 4 bytes of `SHA3-256(hash)`.
    checksum: [u8; CHECKSUM_LEN],
}

impl AddressWithChecksum {
    /// Returns the 32-byte hash portion.
    pub fn hash(&self) -> &[u8; 32] {
        &self.hash
    }

    /// Returns the 4-byte checksum portion.
    pub fn checksum(&self) -> &[u8; CHECKSUM_LEN] {
        &self.checksum
    }

    /// Returns the full 36-byte representation (hash ∥ checksum).
    pub fn as_bytes(&self) -> [u8; 36] {
        let mut out = [0u8; 36];
        out[..32].copy_from_slice(&self.hash);
        out[32..].copy_from_slice(&self.checksum);
        out
    }

    /// Encodes this address as a Bech32 string with the given prefix.
    pub fn to_bech32(&self, prefix: &str) -> Result<String> {
        bech32::encode(prefix, self.as_bytes().to_base32(), Variant::Bech32).map_err(|e| {
            VindexError::CryptoError {
                reason: format!("bech32 encoding failed: {e}"),
            }
        })
    }

    /// Decodes a Bech32 string back into an [`AddressWithChecksum`].
    ///
    /// Validates the Bech32 encoding, checks the prefix, and verifies the
    /// embedded checksum.
    pub fn from_bech32(s: &str, prefix: &str) -> Result<Self> {
        let (hrp, data_base32, variant) =
            bech32::decode(s).map_err(|e| VindexError::InvalidAddress {
                reason: format!("bech32 decoding failed: {e}"),
            })?;

        if hrp != prefix {
            return Err(VindexError::InvalidAddress {
                reason: format!("expected prefix '{prefix}', got '{hrp}'"),
            });
        }

        if variant != Variant::Bech32 {
            return Err(VindexError::InvalidAddress {
                reason: "expected bech32 variant, got bech32m".into(),
            });
        }

        let bytes = Vec::<u8>::from_base32(&data_base32).map_err(|e| {
            VindexError::InvalidAddress {
                reason: format!("bech32 base32 conversion failed: {e}"),
            }
        })?;

        if bytes.len() != 36 {
            return Err(VindexError::InvalidAddress {
                reason: format!(
                    "expected 36 bytes (32 hash + 4 checksum), got {}",
                    bytes.len()
                ),
            });
        }

        verify_checksum(&bytes)?;

        let mut hash = [0u8; 32];
        hash.copy_from_slice(&bytes[..32]);
        let mut checksum = [0u8; CHECKSUM_LEN];
        checksum.copy_from_slice(&bytes[32..]);
        Ok(Self { hash, checksum })
    }
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Computes a 4-byte checksum and appends it to a 32-byte address hash.
///
/// Checksum = `SHA3-256(hash)[0..4]`.
pub fn append_checksum(hash: &[u8; 32]) -> AddressWithChecksum {
    let digest = sha3_256(hash);
    let mut checksum = [0u8; CHECKSUM_LEN];
    checksum.copy_from_slice(&digest[..CHECKSUM_LEN]);
    AddressWithChecksum {
        hash: *hash,
        checksum,
    }
}

/// Verifies the checksum embedded in a 36-byte address.
///
/// # Errors
///
/// Returns [`VindexError::InvalidAddress`] if the input is not exactly
/// 36 bytes or the checksum does not match.
pub fn verify_checksum(bytes: &[u8]) -> Result<()> {
    if bytes.len() != 36 {
        return Err(VindexError::InvalidAddress {
            reason: format!(
                "expected 36 bytes for checksum verification, got {}",
                bytes.len()
            ),
        });
    }

    let digest = sha3_256(&bytes[..32]);
    if bytes[32..36] != digest[..CHECKSUM_LEN] {
        return Err(VindexError::InvalidAddress {
            reason: "checksum mismatch".into(),
        });
    }

    Ok(())
}

/// Derives the display address of a public key:
/// `bech32(prefix, SHA3-256(pubkey) ‖ checksum)`.
pub fn address_from_public_key(public_key: &PublicKey, prefix: &str) -> Result<String> {
    let hash = sha3_256(public_key.as_bytes());
    append_checksum(&hash).to_bech32(prefix)
}

/// Checks that `address` is a well-formed address with the given prefix.
pub fn validate_address(address: &str, prefix: &str) -> Result<()> {
    AddressWithChecksum::from_bech32(address, prefix).map(|_| ())
}

/// Returns `true` if `address` is the address of `public_key`.
pub fn address_matches(public_key: &PublicKey, address: &str, prefix: &str) -> bool {
    match AddressWithChecksum::from_bech32(address, prefix) {
        Ok(decoded) => decoded.hash() == &sha3_256(public_key.as_bytes()),
        Err(_) => false,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
