//! Encrypted vault format and the password-based cipher that seals it.
//!
//! The vault plaintext is the 64-byte BIP39 seed. It is sealed with
//! XChaCha20-Poly1305 under a key derived from the password by Argon2id.
//! Every header field (version, algorithm identifiers, KDF parameters,
//! derivation path, address) is bound to the ciphertext as associated
//! data, so editing any of them makes decryption fail.
//!
//! # Persisted form (version 1)
//!
//! ```json
//! {
//!   "version": 1,
//!   "cipher": "xchacha20-poly1305",
//!   "kdf": "argon2id",
//!   "kdf_params": { "m_cost": 65536, "t_cost": 3, "p_cost": 1 },
//!   "salt": "<hex 32 bytes>",
//!   "nonce": "<hex 24 bytes>",
//!   "ciphertext": "<hex 64 bytes>",
//!   "tag": "<hex 16 bytes>",
//!   "derivation_path": "m/44'/118'/0'/0/0",
//!   "address": "vindex1..."
//! }
//! ```
//!
//! No plaintext secret material is ever written.

use serde::{Deserialize, Serialize};
use vindex_crypto::aead::{
    decrypt_xchacha20, encrypt_xchacha20, generate_aead_nonce, AeadNonce, TAG_LEN,
};
use vindex_crypto::hd_derive::DerivationPath;
use vindex_crypto::kdf::{argon2id_derive_key, generate_salt, Argon2Params, SALT_LEN};
use vindex_crypto::mnemonic::Seed;
use vindex_types::{Result, VindexError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Current vault format version.
pub const VAULT_VERSION: u32 = 1;

/// Cipher identifier stored in the vault.
pub const CIPHER_ID: &str = "xchacha20-poly1305";

/// KDF identifier stored in the vault.
pub const KDF_ID: &str = "argon2id";

/// Domain separator prefixed to the associated data.
const AAD_DOMAIN: &[u8] = b"vindex-vault";

// ---------------------------------------------------------------------------
// EncryptedVault
// ---------------------------------------------------------------------------

/// Validated in-memory form of a persisted vault.
///
/// Values are immutable once built; a password change or KDF upgrade
/// produces a complete new vault.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EncryptedVault {
    version: u32,
    kdf_params: Argon2Params,
    salt: [u8; SALT_LEN],
    nonce: [u8; AeadNonce::LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
    derivation_path: String,
    address: String,
}

impl EncryptedVault {
    /// Format version.
    pub fn version(&self) -> u32 {
        self.version
    }

    /// Argon2id parameters the vault was sealed with.
    pub fn kdf_params(&self) -> &Argon2Params {
        &self.kdf_params
    }

    /// Argon2id salt.
    pub fn salt(&self) -> &[u8; SALT_LEN] {
        &self.salt
    }

    /// XChaCha20-Poly1305 nonce.
    pub fn nonce(&self) -> &[u8; AeadNonce::LEN] {
        &self.nonce
    }

    /// Encrypted seed.
    pub fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }

    /// Poly1305 tag.
    pub fn tag(&self) -> &[u8; TAG_LEN] {
        &self.tag
    }

    /// Derivation path used to derive the wallet key from the seed.
    pub fn derivation_path(&self) -> &str {
        &self.derivation_path
    }

    /// Wallet address recorded at creation time.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Serializes the vault to its JSON form.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::StorageFailure`] if serialization fails.
    pub fn to_json(&self) -> Result<String> {
        let file = VaultFile {
            version: self.version,
            cipher: CIPHER_ID.into(),
            kdf: KDF_ID.into(),
            kdf_params: self.kdf_params,
            salt: hex::encode(self.salt),
            nonce: hex::encode(self.nonce),
            ciphertext: hex::encode(&self.ciphertext),
            tag: hex::encode(self.tag),
            derivation_path: self.derivation_path.clone(),
            address: self.address.clone(),
        };
        serde_json::to_string_pretty(&file).map_err(|e| VindexError::StorageFailure {
            reason: format!("vault serialization failed: {e}"),
        })
    }

    /// Parses and structurally validates a vault from JSON.
    ///
    /// # Validation order
    ///
    /// 1. Well-formed JSON with every field present.
    /// 2. Version, cipher and KDF identifiers are supported.
    /// 3. KDF parameters are within the accepted bounds, so a tampered
    ///    vault cannot stall unlock with an enormous work factor.
    /// 4. Binary fields decode to their exact lengths.
    /// 5. The derivation path parses and the address is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`VindexError::VaultCorrupt`] naming the first failed check.
    pub fn from_json(json: &str) -> Result<Self> {
        let file: VaultFile = serde_json::from_str(json).map_err(|e| corrupt(format!(
            "malformed vault: {e}"
        )))?;

        if file.version != VAULT_VERSION {
            return Err(corrupt(format!(
                "unsupported vault version {} (expected {VAULT_VERSION})",
                file.version
            )));
        }
        if file.cipher != CIPHER_ID {
            return Err(corrupt(format!("unsupported cipher '{}'", file.cipher)));
        }
        if file.kdf != KDF_ID {
            return Err(corrupt(format!("unsupported kdf '{}'", file.kdf)));
        }
        file.kdf_params
            .check_bounds()
            .map_err(|e| corrupt(format!("kdf_params rejected: {e}")))?;

        let salt = hex_decode_fixed::<SALT_LEN>(&file.salt, "salt")?;
        let nonce = hex_decode_fixed::<{ AeadNonce::LEN }>(&file.nonce, "nonce")?;
        let tag = hex_decode_fixed::<TAG_LEN>(&file.tag, "tag")?;
        let ciphertext = hex::decode(&file.ciphertext)
            .map_err(|e| corrupt(format!("invalid ciphertext hex: {e}")))?;
        if ciphertext.len() != Seed::LEN {
            return Err(corrupt(format!(
                "ciphertext must be {} bytes, got {}",
                Seed::LEN,
                ciphertext.len()
            )));
        }

        DerivationPath::parse(&file.derivation_path)
            .map_err(|e| corrupt(format!("derivation_path rejected: {e}")))?;
        if file.address.is_empty() {
            return Err(corrupt("address is empty".into()));
        }

        Ok(Self {
            version: file.version,
            kdf_params: file.kdf_params,
            salt,
            nonce,
            ciphertext,
            tag,
            derivation_path: file.derivation_path,
            address: file.address,
        })
    }

    /// Canonical associated data binding every header field.
    fn aad(&self) -> Vec<u8> {
        build_aad(
            self.version,
            &self.kdf_params,
            &self.derivation_path,
            &self.address,
        )
    }
}

/// JSON representation of [`EncryptedVault`].
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct VaultFile {
    version: u32,
    cipher: String,
    kdf: String,
    kdf_params: Argon2Params,
    salt: String,
    nonce: String,
    ciphertext: String,
    tag: String,
    derivation_path: String,
    address: String,
}

fn build_aad(version: u32, params: &Argon2Params, path: &str, address: &str) -> Vec<u8> {
    let mut aad = Vec::with_capacity(64 + path.len() + address.len());
    aad.extend_from_slice(AAD_DOMAIN);
    aad.extend_from_slice(&version.to_be_bytes());
    for field in [CIPHER_ID.as_bytes(), KDF_ID.as_bytes()] {
        push_len_prefixed(&mut aad, field);
    }
    aad.extend_from_slice(&params.m_cost.to_be_bytes());
    aad.extend_from_slice(&params.t_cost.to_be_bytes());
    aad.extend_from_slice(&params.p_cost.to_be_bytes());
    push_len_prefixed(&mut aad, path.as_bytes());
    push_len_prefixed(&mut aad, address.as_bytes());
    aad
}

fn push_len_prefixed(buf: &mut Vec<u8>, field: &[u8]) {
    buf.extend_from_slice(&(field.len() as u32).to_be_bytes());
    buf.extend_from_slice(field);
}

fn corrupt(reason: String) -> VindexError {
    VindexError::VaultCorrupt { reason }
}

fn hex_decode_fixed<const N: usize>(hex_str: &str, field: &str) -> Result<[u8; N]> {
    let bytes = hex::decode(hex_str).map_err(|e| corrupt(format!("invalid {field} hex: {e}")))?;
    if bytes.len() != N {
        return Err(corrupt(format!(
            "{field} must be {N} bytes, got {}",
            bytes.len()
        )));
    }
    let mut arr = [0u8; N];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}

// ---------------------------------------------------------------------------
// VaultCipher
// ---------------------------------------------------------------------------

/// Seals and opens vaults.
///
/// Holds the Argon2id parameters used for *new* vaults. Opening always
/// uses the parameters stored in the vault itself.
#[derive(Clone, Copy, Debug)]
pub struct VaultCipher {
    params: Argon2Params,
}

impl VaultCipher {
    /// Creates a cipher that seals with `params`.
    pub fn new(params: Argon2Params) -> Self {
        Self { params }
    }

    /// Parameters used for sealing.
    pub fn params(&self) -> &Argon2Params {
        &self.params
    }

    /// Seals `seed` under `password`.
    ///
    /// # Process
    ///
    /// 1. Generate a 32-byte random salt and 24-byte random nonce.
    /// 2. Derive a 256-bit key via Argon2id(password, salt, params).
    /// 3. Encrypt with XChaCha20-Poly1305, binding the header as AAD.
    ///
    /// # Errors
    ///
    /// - [`VindexError::ConfigError`] if the configured parameters are
    ///   out of bounds.
    /// - [`VindexError::CryptoError`] if derivation or encryption fails.
    pub fn encrypt(
        &self,
        seed: &Seed,
        password: &str,
        derivation_path: &str,
        address: &str,
    ) -> Result<EncryptedVault> {
        let salt = generate_salt();
        let nonce = generate_aead_nonce();

        tracing::debug!(
            m_cost = self.params.m_cost,
            t_cost = self.params.t_cost,
            p_cost = self.params.p_cost,
            "sealing vault"
        );

        let key = argon2id_derive_key(password.as_bytes(), &salt, &self.params)?;
        let aad = build_aad(VAULT_VERSION, &self.params, derivation_path, address);
        let sealed = encrypt_xchacha20(key.as_bytes(), &nonce, seed.as_bytes(), &aad)?;

        Ok(EncryptedVault {
            version: VAULT_VERSION,
            kdf_params: self.params,
            salt,
            nonce: *nonce.as_bytes(),
            ciphertext: sealed.ciphertext,
            tag: sealed.tag,
            derivation_path: derivation_path.into(),
            address: address.into(),
        })
    }

    /// Opens `vault` with `password`.
    ///
    /// # Errors
    ///
    /// - [`VindexError::VaultCorrupt`] if the stored KDF parameters are
    ///   outside the accepted bounds.
    /// - [`VindexError::AuthenticationFailure`] for every other failure.
    ///   A wrong password and a tampered vault are indistinguishable.
    pub fn decrypt(vault: &EncryptedVault, password: &str) -> Result<Seed> {
        vault
            .kdf_params
            .check_bounds()
            .map_err(|e| corrupt(format!("kdf_params rejected: {e}")))?;

        let key = argon2id_derive_key(password.as_bytes(), &vault.salt, &vault.kdf_params)
            .map_err(|_| VindexError::AuthenticationFailure)?;

        let plaintext = decrypt_xchacha20(
            key.as_bytes(),
            &AeadNonce::from_bytes(vault.nonce),
            &vault.ciphertext,
            &vault.tag,
            &vault.aad(),
        )
        .map_err(|_| VindexError::AuthenticationFailure)?;
        Seed::from_slice(&plaintext).map_err(|_| VindexError::AuthenticationFailure)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    const PATH: &str = "m/44'/118'/0'/0/0";
    const ADDRESS: &str = "vindex1testaddress";

    fn cipher() -> VaultCipher {
        VaultCipher::new(Argon2Params {
            m_cost: 64,
            t_cost: 1,
            p_cost: 1,
        })
    }

    fn sealed() -> std::result::Result<EncryptedVault, VindexError> {
        cipher().encrypt(&Seed::from_bytes([0x5A; 64]), "Passw0rd!", PATH, ADDRESS)
    }

    #[test]
    fn seal_and_open() -> std::result::Result<(), VindexError> {
        let vault = sealed()?;
        assert_eq!(vault.ciphertext().len(), 64);
        assert_ne!(vault.ciphertext(), &[0x5A; 64][..]);
        let opened = VaultCipher::decrypt(&vault, "Passw0rd!")?;
        assert_eq!(opened.as_bytes(), &[0x5A; 64]);
        Ok(())
    }

    #[test]
    fn fresh_salt_and_nonce_each_time() -> std::result::Result<(), VindexError> {
        let a = sealed()?;
        let b = sealed()?;
        assert_ne!(a.salt(), b.salt());
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a.ciphertext(), b.ciphertext());
        Ok(())
    }

    #[test]
    fn wrong_password_is_authentication_failure() -> std::result::Result<(), VindexError> {
        let vault = sealed()?;
        assert!(matches!(
            VaultCipher::decrypt(&vault, "wrong"),
            Err(VindexError::AuthenticationFailure)
        ));
        Ok(())
    }

    #[test]
    fn json_roundtrip_preserves_vault() -> std::result::Result<(), VindexError> {
        let vault = sealed()?;
        let parsed = EncryptedVault::from_json(&vault.to_json()?)?;
        assert_eq!(parsed, vault);
        let opened = VaultCipher::decrypt(&parsed, "Passw0rd!")?;
        assert_eq!(opened.as_bytes(), &[0x5A; 64]);
        Ok(())
    }

    #[test]
    fn json_has_no_plaintext() -> std::result::Result<(), VindexError> {
        let json = sealed()?.to_json()?;
        assert!(!json.contains(&hex::encode([0x5A; 64])));
        assert!(json.contains("\"cipher\": \"xchacha20-poly1305\""));
        assert!(json.contains("\"kdf\": \"argon2id\""));
        Ok(())
    }

    #[test]
    fn edited_address_breaks_authentication() -> std::result::Result<(), VindexError> {
        let mut vault = sealed()?;
        vault.address = "vindex1someoneelse".into();
        assert!(matches!(
            VaultCipher::decrypt(&vault, "Passw0rd!"),
            Err(VindexError::AuthenticationFailure)
        ));
        Ok(())
    }

    #[test]
    fn edited_path_breaks_authentication() -> std::result::Result<(), VindexError> {
        let mut vault = sealed()?;
        vault.derivation_path = "m/44'/118'/0'/0/1".into();
        assert!(VaultCipher::decrypt(&vault, "Passw0rd!").is_err());
        Ok(())
    }

    #[test]
    fn edited_kdf_params_break_authentication() -> std::result::Result<(), VindexError> {
        let mut vault = sealed()?;
        vault.kdf_params.t_cost = 2;
        assert!(matches!(
            VaultCipher::decrypt(&vault, "Passw0rd!"),
            Err(VindexError::AuthenticationFailure)
        ));
        Ok(())
    }

    #[test]
    fn oversized_kdf_params_rejected_as_corrupt() -> std::result::Result<(), VindexError> {
        let mut vault = sealed()?;
        vault.kdf_params.m_cost = u32::MAX;
        assert!(matches!(
            VaultCipher::decrypt(&vault, "Passw0rd!"),
            Err(VindexError::VaultCorrupt { .. })
        ));

        let json = vault.to_json()?;
        assert!(matches!(
            EncryptedVault::from_json(&json),
            Err(VindexError::VaultCorrupt { .. })
        ));
        Ok(())
    }

    #[test]
    fn structural_damage_rejected_as_corrupt() -> std::result::Result<(), VindexError> {
        let json = sealed()?.to_json()?;
        let cases = [
            json.replace("\"version\": 1", "\"version\": 2"),
            json.replace("xchacha20-poly1305", "aes-256-gcm"),
            json.replace("argon2id", "scrypt"),
            json.replace("\"salt\": \"", "\"salt\": \"00"),
            json.replace("\"tag\": \"", "\"tag\": \"zz"),
            json.replace(PATH, "not a path"),
            "{}".to_string(),
            "not json".to_string(),
            String::new(),
        ];
        for case in cases {
            assert!(
                matches!(
                    EncryptedVault::from_json(&case),
                    Err(VindexError::VaultCorrupt { .. })
                ),
                "accepted damaged vault: {case}"
            );
        }
        Ok(())
    }
}
