//! Ed25519 key pairs for institutions that sign ledger requests.
//!
//! `ed25519_dalek::SigningKey` wipes its secret on drop, so the pair
//! needs no manual zeroization.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::error::{RegistryError, Result};

/// An Ed25519 key pair used to authenticate ledger commands.
pub struct SigningKeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
}

impl SigningKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Reconstruct a key pair from raw signing key bytes.
    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(bytes);
        let verifying_key = signing_key.verifying_key();
        Self {
            signing_key,
            verifying_key,
        }
    }

    /// Return a reference to the signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Return the signing key bytes. Caller must zeroize after use.
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }

    /// Return the verifying key as standard base64.
    pub fn verifying_key_base64(&self) -> String {
        STANDARD.encode(self.verifying_key.to_bytes())
    }
}

/// Reconstruct a verifying key from raw bytes.
pub fn verifying_key_from_bytes(bytes: &[u8; 32]) -> Result<VerifyingKey> {
    VerifyingKey::from_bytes(bytes)
        .map_err(|e| RegistryError::InvalidKey(format!("invalid verifying key: {e}")))
}

/// Decode a base64 verifying key.
pub fn verifying_key_from_base64(encoded: &str) -> Result<VerifyingKey> {
    let raw = STANDARD
        .decode(encoded)
        .map_err(|e| RegistryError::InvalidKey(format!("invalid base64 public key: {e}")))?;
    let bytes: [u8; 32] = raw
        .try_into()
        .map_err(|_| RegistryError::InvalidKey("public key must be 32 bytes".into()))?;
    verifying_key_from_bytes(&bytes)
}
