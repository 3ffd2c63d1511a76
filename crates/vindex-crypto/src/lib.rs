//! Cryptographic primitives for the VindexChain wallet core.
//!
//! This crate is the **sole** location for all cryptographic operations.
//! No other crate in the workspace may perform raw crypto directly.
//!
//! # Modules
//!
//! - [`mnemonic`]: BIP39 12-word recovery phrases and seed derivation
//! - [`hd_derive`]: BIP32 secp256k1 hierarchical key derivation
//! - [`signing`]: secp256k1 keypairs, ECDSA signing and verification
//! - [`checksum`]: address checksum and Bech32 encoding
//! - [`hash`]: SHA3-256 hashing
//! - [`kdf`]: Argon2id password-based key derivation
//! - [`aead`]: XChaCha20-Poly1305 authenticated encryption/decryption

pub mod aead;
pub mod checksum;
pub mod hash;
pub mod hd_derive;
pub mod kdf;
pub mod mnemonic;
pub mod signing;
