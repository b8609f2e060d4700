//! Passphrase-based encryption for key files.
//!
//! passphrase → Argon2id(passphrase, salt) → master key
//! HKDF-SHA256(master key, context) → ChaCha20-Poly1305 key

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use hkdf::Hkdf;
use sha2::Sha256;
use zeroize::Zeroize;

use crate::crypto::random::{random_nonce_12, random_salt_16};
use crate::error::{RegistryError, Result};

const ARGON2_M_COST: u32 = 65536; // 64 MiB
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

/// Output of [`seal`]: everything needed to decrypt except the passphrase.
#[derive(Debug, Clone)]
pub struct Sealed {
    pub salt: [u8; 16],
    pub nonce: [u8; 12],
    pub ciphertext: Vec<u8>,
}

/// Derive a 32-byte key from a passphrase, salt, and context string.
pub fn derive_passphrase_key(passphrase: &[u8], salt: &[u8; 16], context: &str) -> Result<[u8; 32]> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(32))
        .map_err(|e| RegistryError::DerivationFailed(format!("Argon2 params: {e}")))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut master = [0u8; 32];
    argon2
        .hash_password_into(passphrase, salt, &mut master)
        .map_err(|e| RegistryError::DerivationFailed(format!("Argon2 hash: {e}")))?;

    let hk = Hkdf::<Sha256>::new(None, &master);
    let mut key = [0u8; 32];
    let expanded = hk.expand(context.as_bytes(), &mut key);
    master.zeroize();
    expanded.map_err(|e| RegistryError::DerivationFailed(format!("HKDF expand: {e}")))?;

    Ok(key)
}

/// Encrypt `plaintext` under a key derived from `passphrase`.
pub fn seal(passphrase: &[u8], context: &str, plaintext: &[u8]) -> Result<Sealed> {
    let salt = random_salt_16();
    let nonce = random_nonce_12();
    let mut key = derive_passphrase_key(passphrase, &salt, context)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| RegistryError::EncryptionFailed(format!("cipher init: {e}")));
    key.zeroize();

    let ciphertext = cipher?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| RegistryError::EncryptionFailed(format!("encrypt: {e}")))?;

    Ok(Sealed {
        salt,
        nonce,
        ciphertext,
    })
}

/// Decrypt a [`Sealed`] payload. A wrong passphrase fails authentication
/// and is reported as `InvalidPassphrase`.
pub fn open(passphrase: &[u8], context: &str, sealed: &Sealed) -> Result<Vec<u8>> {
    let mut key = derive_passphrase_key(passphrase, &sealed.salt, context)?;

    let cipher = ChaCha20Poly1305::new_from_slice(&key)
        .map_err(|e| RegistryError::DecryptionFailed(format!("cipher init: {e}")));
    key.zeroize();

    cipher?
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.ciphertext.as_slice())
        .map_err(|_| RegistryError::InvalidPassphrase)
}
