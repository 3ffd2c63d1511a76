//! BIP32 secp256k1 hierarchical deterministic key derivation.
//!
//! Implements private-key derivation (`CKDpriv`) from a BIP39 seed over
//! the secp256k1 curve. Both hardened and non-hardened components are
//! supported.
//!
//! # Derivation path format
//!
//! ```text
//! m/44'/118'/0'/0/0
//! ```
//!
//! Hardened components carry a `'` or `h` suffix.
//!
//! # Invalid children
//!
//! BIP32 defines a child as invalid when `parse256(IL) ≥ n` or the
//! resulting scalar is zero (probability below 2^-127). In that case
//! derivation proceeds with the next index, keeping the same hardening.
//! An invalid master key rejects the seed.
//!
//! Reference: <https://github.com/bitcoin/bips/blob/master/bip-0032.mediawiki>

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::elliptic_curve::PrimeField;
use k256::{FieldBytes, Scalar, SecretKey};
use sha2::Sha512;
use vindex_types::{Result, VindexError};
use zeroize::{Zeroize, Zeroizing};

use crate::checksum::address_from_public_key;
use crate::mnemonic::Seed;
use crate::signing::KeyPair;

/// HMAC-SHA512 type alias used throughout BIP32.
type HmacSha512 = Hmac<Sha512>;

/// The hardened index offset (0x80000000).
pub const HARDENED_OFFSET: u32 = 0x8000_0000;

/// HMAC key for master key generation.
const MASTER_HMAC_KEY: &[u8] = b"Bitcoin seed";

// ---------------------------------------------------------------------------
// DerivationPath
// ---------------------------------------------------------------------------

/// One component of a derivation path.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct ChildIndex {
    /// Index without the hardened offset (`0..2^31`).
    pub index: u32,
    /// Whether the component is hardened.
    pub hardened: bool,
}

impl ChildIndex {
    /// Returns the raw 32-bit index as serialized by BIP32.
    pub fn raw(&self) -> u32 {
        if self.hardened {
            self.index | HARDENED_OFFSET
        } else {
            self.index
        }
    }
}

impl fmt::Display for ChildIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hardened {
            write!(f, "{}'", self.index)
        } else {
            write!(f, "{}", self.index)
        }
    }
}

/// A parsed BIP32 derivation path such as `m/44'/118'/0'/0/0`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DerivationPath {
    components: Vec<ChildIndex>,
}

impl DerivationPath {
    /// Parses a path of the form `m/44'/118'/0'/0/0`.
    ///
    /// A bare `m` denotes the master key.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::ConfigError`] if the path does not start
    /// with `m`, has empty components, or has indices ≥ 2^31.
    pub fn parse(path: &str) -> Result<Self> {
        let trimmed = path.trim();

        let rest = match trimmed.strip_prefix('m') {
            Some(rest) => rest,
            None => {
                return Err(VindexError::ConfigError {
                    reason: format!("derivation path must start with 'm', got '{trimmed}'"),
                })
            }
        };

        if rest.is_empty() {
            return Ok(Self {
                components: Vec::new(),
            });
        }

        let rest = rest.strip_prefix('/').ok_or_else(|| VindexError::ConfigError {
            reason: format!("malformed derivation path '{trimmed}'"),
        })?;

        let mut components = Vec::new();
        for part in rest.split('/') {
            if part.is_empty() {
                return Err(VindexError::ConfigError {
                    reason: "empty component in derivation path".into(),
                });
            }

            let (num_str, hardened) = match part
                .strip_suffix('\'')
                .or_else(|| part.strip_suffix('h'))
                .or_else(|| part.strip_suffix('H'))
            {
                Some(num) => (num, true),
                None => (part, false),
            };

            if num_str.is_empty() || !num_str.bytes().all(|b| b.is_ascii_digit()) {
                return Err(VindexError::ConfigError {
                    reason: format!("invalid index '{part}' in derivation path"),
                });
            }

            let index: u32 = num_str.parse().map_err(|e| VindexError::ConfigError {
                reason: format!("invalid index '{num_str}' in path: {e}"),
            })?;

            if index >= HARDENED_OFFSET {
                return Err(VindexError::ConfigError {
                    reason: format!("index {index} exceeds maximum ({})", HARDENED_OFFSET - 1),
                });
            }

            components.push(ChildIndex { index, hardened });
        }

        Ok(Self { components })
    }

    /// Returns the path components in derivation order.
    pub fn components(&self) -> &[ChildIndex] {
        &self.components
    }
}

impl FromStr for DerivationPath {
    type Err = VindexError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "m")?;
        for c in &self.components {
            write!(f, "/{c}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// ExtendedKey (internal)
// ---------------------------------------------------------------------------

/// Private key plus chain code. Both halves are wiped on drop.
struct ExtendedKey {
    key: Zeroizing<[u8; 32]>,
    chain_code: Zeroizing<[u8; 32]>,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Derives a secp256k1 keypair from a BIP39 seed along `path`.
///
/// # Process (BIP32)
///
/// 1. Master key: `HMAC-SHA512(key="Bitcoin seed", data=seed)`.
/// 2. For each component, `CKDpriv` with the parent chain code:
///    - hardened: `data = 0x00 ‖ ser256(k_par) ‖ ser32(i)`
///    - normal:   `data = serP(point(k_par)) ‖ ser32(i)`
///
///    `k_i = parse256(IL) + k_par (mod n)`, chain code = `IR`.
/// 3. The final private key becomes the [`KeyPair`].
///
/// # Errors
///
/// Returns [`VindexError::CryptoError`] if the master key is invalid for
/// this seed, or if no valid child exists before the index space runs out.
pub fn derive_keypair(seed: &Seed, path: &DerivationPath) -> Result<KeyPair> {
    let mut current = master_key_from_seed(seed.as_bytes())?;

    for child in path.components() {
        current = derive_child(&current, *child)?;
    }

    KeyPair::from_secret_bytes(&current.key)
}

/// Derives the keypair along `path` together with its bech32 address.
pub fn derive_account(
    seed: &Seed,
    path: &DerivationPath,
    address_prefix: &str,
) -> Result<(KeyPair, String)> {
    let keypair = derive_keypair(seed, path)?;
    let address = address_from_public_key(keypair.public_key(), address_prefix)?;
    Ok((keypair, address))
}

// ---------------------------------------------------------------------------
// Internal: master key
// ---------------------------------------------------------------------------

/// `I = HMAC-SHA512(key="Bitcoin seed", data=seed)`;
/// `IL` = master key, `IR` = chain code.
fn master_key_from_seed(seed: &[u8]) -> Result<ExtendedKey> {
    let i = hmac_sha512(MASTER_HMAC_KEY, seed)?;

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&i[..32]);

    if parse_nonzero_scalar(&key).is_none() {
        return Err(VindexError::CryptoError {
            reason: "seed produces an invalid master key".into(),
        });
    }

    let mut chain_code = Zeroizing::new([0u8; 32]);
    chain_code.copy_from_slice(&i[32..]);

    Ok(ExtendedKey { key, chain_code })
}

// ---------------------------------------------------------------------------
// Internal: child derivation
// ---------------------------------------------------------------------------

/// Derives the child at `child`, moving to the next index while the
/// candidate is invalid.
fn derive_child(parent: &ExtendedKey, child: ChildIndex) -> Result<ExtendedKey> {
    derive_child_with(parent, child, |_, parent, il| child_scalar(parent, il))
}

/// `CKDpriv` loop with the candidate check supplied by the caller.
///
/// `tweak` maps `(candidate, k_par, IL)` to the child scalar, or `None`
/// when the candidate is invalid and the next index must be tried.
fn derive_child_with<F>(
    parent: &ExtendedKey,
    child: ChildIndex,
    mut tweak: F,
) -> Result<ExtendedKey>
where
    F: FnMut(ChildIndex, &Scalar, &[u8; 32]) -> Option<Scalar>,
{
    let parent_scalar = parse_nonzero_scalar(&parent.key).ok_or_else(|| {
        VindexError::CryptoError {
            reason: "parent key is not a valid scalar".into(),
        }
    })?;

    let parent_point = if child.hardened {
        None
    } else {
        Some(compressed_public_key(&parent.key)?)
    };

    let mut index = child.index;
    loop {
        let candidate = ChildIndex {
            index,
            hardened: child.hardened,
        };

        let mut data = Vec::with_capacity(37);
        match &parent_point {
            None => {
                data.push(0x00);
                data.extend_from_slice(&parent.key[..]);
            }
            Some(point) => data.extend_from_slice(point),
        }
        data.extend_from_slice(&candidate.raw().to_be_bytes());

        let mut i = hmac_sha512(&parent.chain_code[..], &data)?;
        data.zeroize();

        let mut il = [0u8; 32];
        il.copy_from_slice(&i[..32]);
        let scalar = tweak(candidate, &parent_scalar, &il);
        il.zeroize();

        if let Some(scalar) = scalar {
            let mut key = Zeroizing::new([0u8; 32]);
            key.copy_from_slice(&scalar.to_bytes());
            let mut chain_code = Zeroizing::new([0u8; 32]);
            chain_code.copy_from_slice(&i[32..]);
            i.zeroize();
            return Ok(ExtendedKey { key, chain_code });
        }
        i.zeroize();

        index = index
            .checked_add(1)
            .filter(|next| *next < HARDENED_OFFSET)
            .ok_or_else(|| VindexError::CryptoError {
                reason: "no valid child key in the remaining index space".into(),
            })?;
    }
}

/// `parse256(IL) + k_par (mod n)`, or `None` when the child is invalid.
fn child_scalar(parent: &Scalar, il: &[u8; 32]) -> Option<Scalar> {
    let tweak: Option<Scalar> = Scalar::from_repr(FieldBytes::clone_from_slice(il)).into();
    let sum = tweak? + parent;
    if bool::from(sum.is_zero()) {
        None
    } else {
        Some(sum)
    }
}

/// Parses 32 bytes as a scalar in `[1, n)`.
fn parse_nonzero_scalar(bytes: &[u8; 32]) -> Option<Scalar> {
    let scalar: Option<Scalar> = Scalar::from_repr(FieldBytes::clone_from_slice(bytes)).into();
    scalar.filter(|s| !bool::from(s.is_zero()))
}

/// `serP(point(k))`: 33-byte SEC1 compressed public key.
fn compressed_public_key(key: &[u8; 32]) -> Result<[u8; 33]> {
    let secret = SecretKey::from_slice(key).map_err(|_| VindexError::CryptoError {
        reason: "invalid secp256k1 secret key".into(),
    })?;
    let encoded = secret.public_key().to_encoded_point(true);
    let mut out = [0u8; 33];
    out.copy_from_slice(encoded.as_bytes());
    Ok(out)
}

// ---------------------------------------------------------------------------
// Internal: HMAC-SHA512
// ---------------------------------------------------------------------------

/// Computes HMAC-SHA512 and returns the 64-byte output.
fn hmac_sha512(key: &[u8], data: &[u8]) -> Result<[u8; 64]> {
    let mut mac = HmacSha512::new_from_slice(key).map_err(|e| VindexError::CryptoError {
        reason: format!("HMAC-SHA512 key init failed: {e}"),
    })?;
    mac.update(data);
    let result = mac.finalize().into_bytes();

    let mut output = [0u8; 64];
    output.copy_from_slice(&result);
    Ok(output)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
