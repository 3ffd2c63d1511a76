//! Payload signing for collaborators.

use serde::{Deserialize, Serialize};
use vindex_crypto::checksum::address_matches;
use vindex_crypto::signing::{KeyPair, PublicKey, Signature};
use vindex_types::{Result, VindexError};

pub use vindex_crypto::signing::verify;

/// A signature together with what a verifier needs to check it.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SignedPayload {
    /// Compact `r ‖ s` ECDSA signature.
    pub signature: Signature,
    /// Compressed public key of the signer.
    pub public_key: PublicKey,
    /// Bech32 address of the signer.
    pub address: String,
}

impl SignedPayload {
    /// Hex-encoded view suitable for JSON output.
    pub fn to_hex_view(&self) -> SignedPayloadHex {
        SignedPayloadHex {
            signature: self.signature.to_hex(),
            public_key: self.public_key.to_hex(),
            address: self.address.clone(),
        }
    }
}

/// Hex-encoded form of a [`SignedPayload`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SignedPayloadHex {
    pub signature: String,
    pub public_key: String,
    pub address: String,
}

/// Signs `payload` with `keypair`.
pub fn sign_payload(keypair: &KeyPair, address: &str, payload: &[u8]) -> Result<SignedPayload> {
    let signature = keypair.sign(payload)?;
    Ok(SignedPayload {
        signature,
        public_key: *keypair.public_key(),
        address: address.to_string(),
    })
}

/// Verifies a signature and that `public_key` belongs to `address`.
///
/// # Errors
///
/// - [`VindexError::InvalidAddress`] if the key does not hash to `address`.
/// - [`VindexError::CryptoError`] if the signature does not verify.
pub fn verify_from_address(
    address: &str,
    address_prefix: &str,
    public_key: &PublicKey,
    payload: &[u8],
    signature: &Signature,
) -> Result<()> {
    if !address_matches(public_key, address, address_prefix) {
        return Err(VindexError::InvalidAddress {
            reason: "public key does not match address".into(),
        });
    }
    verify(public_key, payload, signature)
}

#[cfg(test)]
mod tests {
    use super::*;
    use vindex_crypto::checksum::address_from_public_key;

    #[test]
    fn signed_payload_verifies() -> std::result::Result<(), VindexError> {
        let kp = KeyPair::from_secret_bytes(&[7u8; 32])?;
        let address = address_from_public_key(kp.public_key(), "vindex")?;
        let signed = sign_payload(&kp, &address, b"transfer 10")?;

        assert_eq!(signed.address, address);
        verify(&signed.public_key, b"transfer 10", &signed.signature)?;
        verify_from_address(&address, "vindex", &signed.public_key, b"transfer 10", &signed.signature)?;
        Ok(())
    }

    #[test]
    fn foreign_key_rejected_for_address() -> std::result::Result<(), VindexError> {
        let kp = KeyPair::from_secret_bytes(&[7u8; 32])?;
        let other = KeyPair::from_secret_bytes(&[8u8; 32])?;
        let address = address_from_public_key(kp.public_key(), "vindex")?;
        let signed = sign_payload(&other, &address, b"x")?;

        let result =
            verify_from_address(&address, "vindex", &signed.public_key, b"x", &signed.signature);
        assert!(matches!(result, Err(VindexError::InvalidAddress { .. })));
        Ok(())
    }

    #[test]
    fn hex_view_serializes() -> std::result::Result<(), VindexError> {
        let kp = KeyPair::from_secret_bytes(&[7u8; 32])?;
        let signed = sign_payload(&kp, "vindex1x", b"x")?;
        let view = signed.to_hex_view();
        assert_eq!(view.signature.len(), 128);
        assert_eq!(view.public_key.len(), 66);
        let json = serde_json::to_string(&view).map_err(|e| VindexError::CryptoError {
            reason: e.to_string(),
        })?;
        assert!(json.contains("\"address\":\"vindex1x\""));
        Ok(())
    }
}
