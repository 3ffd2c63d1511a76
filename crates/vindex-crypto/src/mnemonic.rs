//! BIP39 mnemonic generation, validation, and seed derivation.
//!
//! Implements BIP39 for 12-word (128-bit entropy)
//! recovery phrases:
//!
//! 1. **Generation**: 128-bit entropy → SHA-256 checksum (4 bits) →
//!    132 bits split into 12 × 11-bit indices → 12 BIP39 words.
//! 2. **Validation**: Reconstruct entropy from words, recompute and
//!    verify the checksum.
//! 3. **Seed derivation**: PBKDF2-HMAC-SHA512 with 2048 rounds,
//!    salt = `"mnemonic" + passphrase`, producing a 64-byte seed.
//!
//! The English wordlist is taken from the `bip39` crate; all bit
//! manipulation happens here so secrets stay in zeroizing buffers.
//!
//! Reference: <https://github.com/bitcoin/bips/blob/master/bip-0039.mediawiki>

use hmac::Hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256, Sha512};
use vindex_types::{Result, VindexError};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of words in a recovery phrase.
pub const WORD_COUNT: usize = 12;

/// Entropy length in bytes (128 bits).
pub const ENTROPY_LEN: usize = 16;

/// Bits of SHA-256 checksum appended to the entropy (`ENT / 32`).
const CHECKSUM_BITS: usize = ENTROPY_LEN * 8 / 32;

/// Total bits encoded by the phrase.
const TOTAL_BITS: usize = ENTROPY_LEN * 8 + CHECKSUM_BITS;

/// PBKDF2 rounds fixed by BIP39.
const PBKDF2_ROUNDS: u32 = 2048;

// ---------------------------------------------------------------------------
// Wordlist access
// ---------------------------------------------------------------------------

fn wordlist() -> &'static [&'static str; 2048] {
    bip39::Language::English.word_list()
}

/// Returns the 11-bit index of `word` in the English wordlist.
///
/// The English list is sorted, so a binary search suffices.
fn word_to_index(word: &str) -> Option<u16> {
    wordlist()
        .binary_search(&word)
        .ok()
        .and_then(|i| u16::try_from(i).ok())
}

// ---------------------------------------------------------------------------
// Mnemonic
// ---------------------------------------------------------------------------

/// A validated BIP39 recovery phrase (12 space-separated lowercase words).
///
/// The inner string is zeroized on drop to prevent sensitive data from
/// lingering in memory. Instances can only be obtained through
/// [`generate_mnemonic`], [`entropy_to_mnemonic`] or [`Mnemonic::parse`],
/// so every value is known to pass checksum validation.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic(String);

impl Mnemonic {
    /// Parses and validates user-supplied recovery phrase text.
    ///
    /// Leading/trailing whitespace is trimmed, runs of whitespace are
    /// collapsed to a single space, and ASCII letters are lowercased
    /// before validation.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::InvalidMnemonic`] if the normalized text is
    /// not a valid 12-word phrase.
    pub fn parse(text: &str) -> Result<Self> {
        let mut normalized = normalize(text);
        if let Err(e) = validate_mnemonic(&normalized) {
            normalized.zeroize();
            return Err(e);
        }
        Ok(Self(normalized))
    }

    /// Returns the mnemonic phrase as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the individual words as a vector of string slices.
    pub fn words(&self) -> Vec<&str> {
        self.0.split(' ').collect()
    }

    /// Returns the word at zero-based `position`, if any.
    pub fn word(&self, position: usize) -> Option<&str> {
        self.0.split(' ').nth(position)
    }

    /// Returns the number of words in the mnemonic.
    pub fn word_count(&self) -> usize {
        self.0.split(' ').count()
    }
}

// No Clone or Debug for Mnemonic.

fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(|w| w.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Seed
// ---------------------------------------------------------------------------

/// A 64-byte seed derived from a BIP39 mnemonic via PBKDF2-HMAC-SHA512.
///
/// This seed is the input to BIP32 key derivation and is the plaintext
/// sealed inside the vault. Automatically zeroized on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; 64]);

impl Seed {
    /// Fixed byte length of a BIP39 seed.
    pub const LEN: usize = 64;

    /// Creates a [`Seed`] from a raw 64-byte array.
    ///
    /// Used when a seed is recovered from a decrypted vault. For normal
    /// operation, use [`mnemonic_to_seed`].
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Creates a [`Seed`] from a slice, which must be exactly 64 bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::CryptoError`] on a length mismatch.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::LEN {
            return Err(VindexError::CryptoError {
                reason: format!("seed must be {} bytes, got {}", Self::LEN, bytes.len()),
            });
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Returns the raw 64-byte seed.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }
}

// Seed does not implement Clone/Debug to prevent leakage.

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generates a new random 12-word BIP39 mnemonic.
///
/// # Process (BIP39)
///
/// 1. Generate 128 bits (16 bytes) of entropy from the OS-level CSPRNG.
/// 2. Compute `SHA-256(entropy)` and take the first 4 bits as checksum.
/// 3. Concatenate: 128 entropy bits + 4 checksum bits = 132 bits.
/// 4. Split into 12 groups of 11 bits.
/// 5. Each 11-bit value is an index into the BIP39 English wordlist.
pub fn generate_mnemonic() -> Result<Mnemonic> {
    let mut entropy = [0u8; ENTROPY_LEN];
    OsRng.fill_bytes(&mut entropy);

    let result = entropy_to_mnemonic(&entropy);

    entropy.zeroize();
    result
}

/// Converts raw 128-bit entropy into a 12-word BIP39 mnemonic.
///
/// This is the deterministic core of mnemonic generation. Exposed for
/// testing with known test vectors.
pub fn entropy_to_mnemonic(entropy: &[u8; ENTROPY_LEN]) -> Result<Mnemonic> {
    let checksum = Sha256::digest(entropy)[0] >> (8 - CHECKSUM_BITS);

    // 128 entropy bits followed by 4 checksum bits.
    let mut bits = Vec::with_capacity(TOTAL_BITS);
    for byte in entropy.iter() {
        for j in (0..8).rev() {
            bits.push((byte >> j) & 1);
        }
    }
    for j in (0..CHECKSUM_BITS).rev() {
        bits.push((checksum >> j) & 1);
    }

    let list = wordlist();
    let mut words = Vec::with_capacity(WORD_COUNT);
    for i in 0..WORD_COUNT {
        let mut idx: usize = 0;
        for j in 0..11 {
            idx = (idx << 1) | usize::from(bits[i * 11 + j]);
        }
        let word = list.get(idx).ok_or_else(|| VindexError::CryptoError {
            reason: format!("BIP39 word index {idx} out of range"),
        })?;
        words.push(*word);
    }

    bits.zeroize();
    Ok(Mnemonic(words.join(" ")))
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validates a BIP39 mnemonic phrase.
///
/// The input is expected to be normalized (lowercase, single spaces);
/// use [`Mnemonic::parse`] for raw user input.
///
/// # Checks performed
///
/// 1. Exactly 12 words.
/// 2. Every word exists in the BIP39 English wordlist.
/// 3. Reconstruct entropy from the 11-bit indices.
/// 4. Recompute `SHA-256(entropy)` and verify the 4-bit checksum matches.
///
/// # Errors
///
/// Returns [`VindexError::InvalidMnemonic`] if any check fails.
pub fn validate_mnemonic(words: &str) -> Result<()> {
    let word_list: Vec<&str> = words.split_whitespace().collect();

    if word_list.len() != WORD_COUNT {
        return Err(VindexError::InvalidMnemonic {
            reason: format!(
                "mnemonic must be {WORD_COUNT} words, got {}",
                word_list.len()
            ),
        });
    }

    let mut bits = Vec::with_capacity(TOTAL_BITS);
    for (position, word) in word_list.iter().enumerate() {
        // Position only: the word itself may be a typo of a secret word.
        let idx = word_to_index(word).ok_or_else(|| VindexError::InvalidMnemonic {
            reason: format!("word {} is not in the BIP39 wordlist", position + 1),
        })?;
        for j in (0..11).rev() {
            bits.push(((idx >> j) & 1) as u8);
        }
    }

    let mut entropy = [0u8; ENTROPY_LEN];
    for (i, bit) in bits.iter().take(ENTROPY_LEN * 8).enumerate() {
        if *bit == 1 {
            entropy[i / 8] |= 1 << (7 - (i % 8));
        }
    }

    let mut provided_checksum: u8 = 0;
    for bit in &bits[ENTROPY_LEN * 8..] {
        provided_checksum = (provided_checksum << 1) | bit;
    }

    let expected_checksum = Sha256::digest(entropy)[0] >> (8 - CHECKSUM_BITS);

    entropy.zeroize();
    bits.zeroize();

    if provided_checksum != expected_checksum {
        return Err(VindexError::InvalidMnemonic {
            reason: "checksum mismatch".into(),
        });
    }

    Ok(())
}

/// Boolean form of [`validate_mnemonic`] for raw user input.
///
/// Normalizes like [`Mnemonic::parse`] and fails closed: any malformed
/// input yields `false`, never a panic.
pub fn is_valid_mnemonic(text: &str) -> bool {
    let mut normalized = normalize(text);
    let ok = validate_mnemonic(&normalized).is_ok();
    normalized.zeroize();
    ok
}

// ---------------------------------------------------------------------------
// Seed derivation
// ---------------------------------------------------------------------------

/// Derives a 64-byte seed from a BIP39 mnemonic and optional passphrase.
///
/// # Process (BIP39)
///
/// - **Password**: the mnemonic sentence (the English wordlist is pure
///   ASCII, so NFKD normalization is a no-op).
/// - **Salt**: `"mnemonic"` concatenated with `passphrase`.
/// - **Algorithm**: PBKDF2-HMAC-SHA512, 2048 rounds, 64-byte output.
///
/// # Errors
///
/// Returns [`VindexError::CryptoError`] if PBKDF2 computation fails.
pub fn mnemonic_to_seed(mnemonic: &Mnemonic, passphrase: &str) -> Result<Seed> {
    let mut salt = Vec::with_capacity(8 + passphrase.len());
    salt.extend_from_slice(b"mnemonic");
    salt.extend_from_slice(passphrase.as_bytes());

    let mut output = [0u8; 64];
    let derived = pbkdf2::pbkdf2::<Hmac<Sha512>>(
        mnemonic.as_str().as_bytes(),
        &salt,
        PBKDF2_ROUNDS,
        &mut output,
    );
    salt.zeroize();

    derived.map_err(|e| VindexError::CryptoError {
        reason: format!("PBKDF2-HMAC-SHA512 failed: {e}"),
    })?;

    Ok(Seed(output))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const ABANDON_ABOUT: &str = "abandon abandon abandon abandon abandon abandon \
                                 abandon abandon abandon abandon abandon about";

    #[test]
    fn generate_produces_12_words() -> std::result::Result<(), VindexError> {
        let mnemonic = generate_mnemonic()?;
        assert_eq!(mnemonic.word_count(), 12);
        Ok(())
    }

    #[test]
    fn generated_mnemonic_validates() -> std::result::Result<(), VindexError> {
        for _ in 0..32 {
            let mnemonic = generate_mnemonic()?;
            validate_mnemonic(mnemonic.as_str())?;
        }
        Ok(())
    }

    #[test]
    fn generated_mnemonics_differ() -> std::result::Result<(), VindexError> {
        let a = generate_mnemonic()?;
        let b = generate_mnemonic()?;
        assert_ne!(a.as_str(), b.as_str());
        Ok(())
    }

    #[test]
    fn entropy_all_zeros() -> std::result::Result<(), VindexError> {
        let mnemonic = entropy_to_mnemonic(&[0x00; 16])?;
        assert_eq!(mnemonic.as_str(), normalize(ABANDON_ABOUT));
        Ok(())
    }

    #[test]
    fn entropy_all_ff() -> std::result::Result<(), VindexError> {
        let mnemonic = entropy_to_mnemonic(&[0xFF; 16])?;
        let words = mnemonic.words();
        assert!(words[..11].iter().all(|w| *w == "zoo"));
        assert_eq!(words[11], "wrong");
        Ok(())
    }

    #[test]
    fn word_accessor() -> std::result::Result<(), VindexError> {
        let mnemonic = entropy_to_mnemonic(&[0x00; 16])?;
        assert_eq!(mnemonic.word(0), Some("abandon"));
        assert_eq!(mnemonic.word(11), Some("about"));
        assert_eq!(mnemonic.word(12), None);
        Ok(())
    }

    #[test]
    fn parse_normalizes_input() -> std::result::Result<(), VindexError> {
        let messy = "  Abandon abandon\tabandon abandon abandon abandon\n\
                     abandon abandon abandon abandon   abandon ABOUT  ";
        let mnemonic = Mnemonic::parse(messy)?;
        assert_eq!(mnemonic.as_str(), normalize(ABANDON_ABOUT));
        Ok(())
    }

    #[test]
    fn validate_rejects_wrong_word_count() {
        let result = validate_mnemonic("abandon abandon abandon");
        assert!(matches!(result, Err(VindexError::InvalidMnemonic { .. })));
    }

    #[test]
    fn validate_rejects_24_words() {
        let phrase = vec!["abandon"; 24].join(" ");
        assert!(validate_mnemonic(&phrase).is_err());
    }

    #[test]
    fn validate_rejects_invalid_word() {
        let mut words = vec!["abandon"; 12];
        words[11] = "notaword";
        let phrase = words.join(" ");
        assert!(matches!(
            validate_mnemonic(&phrase),
            Err(VindexError::InvalidMnemonic { .. })
        ));
    }

    #[test]
    fn invalid_word_error_does_not_echo_word() {
        let mut words = vec!["abandon"; 12];
        words[3] = "zzzsecret";
        let err = validate_mnemonic(&words.join(" "));
        match err {
            Err(e) => assert!(!e.to_string().contains("zzzsecret")),
            Ok(()) => panic!("invalid word accepted"),
        }
    }

    #[test]
    fn validate_rejects_bad_checksum() {
        // 12 × "abandon" has the wrong checksum (should end in "about").
        let phrase = vec!["abandon"; 12].join(" ");
        assert!(validate_mnemonic(&phrase).is_err());
    }

    #[test]
    fn is_valid_fails_closed() {
        assert!(is_valid_mnemonic(ABANDON_ABOUT));
        assert!(!is_valid_mnemonic(""));
        assert!(!is_valid_mnemonic("   "));
        assert!(!is_valid_mnemonic("ünïcödé wörds"));
        assert!(!is_valid_mnemonic(&"x".repeat(10_000)));
    }

    /// TREZOR BIP39 test vector: all-zero entropy + passphrase "TREZOR".
    #[test]
    fn seed_derivation_trezor_vector() -> std::result::Result<(), VindexError> {
        let mnemonic = Mnemonic::parse(ABANDON_ABOUT)?;
        let seed = mnemonic_to_seed(&mnemonic, "TREZOR")?;
        assert_eq!(
            hex::encode(seed.as_bytes()),
            "c55257c360c07c72029aebc1b53c05ed0362ada38ead3e3e9efa3708e5349553\
             1f09a6987599d18264c1e1c92f2cf141630c7a3c4ab7c81b2f001698e7463b04"
        );
        Ok(())
    }

    #[test]
    fn seed_with_empty_passphrase_differs() -> std::result::Result<(), VindexError> {
        let mnemonic = Mnemonic::parse(ABANDON_ABOUT)?;
        let seed_no_pass = mnemonic_to_seed(&mnemonic, "")?;
        let seed_with_pass = mnemonic_to_seed(&mnemonic, "TREZOR")?;
        assert_ne!(seed_no_pass.as_bytes(), seed_with_pass.as_bytes());
        Ok(())
    }

    #[test]
    fn seed_from_slice_checks_length() {
        assert!(Seed::from_slice(&[0u8; 63]).is_err());
        assert!(Seed::from_slice(&[0u8; 64]).is_ok());
    }
}
