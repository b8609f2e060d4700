//! Cryptographic primitives for the records registry.
//!
//! This module provides:
//! - Ed25519 key generation, signing, and verification
//! - Argon2id + HKDF-SHA256 passphrase key derivation
//! - ChaCha20-Poly1305 authenticated encryption for key files
//! - Cryptographically secure random number generation

pub mod encryption;
pub mod keys;
pub mod random;
pub mod signing;
