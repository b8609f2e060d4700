//! Institution keys — the signing key pair behind an owner identity.

use ed25519_dalek::{SigningKey, VerifyingKey};

use crate::crypto::keys::SigningKeyPair;

use super::principal::Identity;

/// A named Ed25519 key pair able to sign ledger requests.
pub struct InstitutionKey {
    key_pair: SigningKeyPair,
    /// Creation timestamp (microseconds since Unix epoch).
    pub created_at: u64,
    /// Human-readable name (optional).
    pub name: Option<String>,
}

impl InstitutionKey {
    /// Create a new institution key with a fresh key pair.
    pub fn new(name: Option<String>) -> Self {
        Self {
            key_pair: SigningKeyPair::generate(),
            created_at: crate::time::now_micros(),
            name,
        }
    }

    /// Reconstruct from existing key bytes and metadata.
    pub fn from_parts(signing_key_bytes: &[u8; 32], created_at: u64, name: Option<String>) -> Self {
        Self {
            key_pair: SigningKeyPair::from_signing_key_bytes(signing_key_bytes),
            created_at,
            name,
        }
    }

    /// The ledger identity of this key.
    pub fn id(&self) -> Identity {
        Identity::from_verifying_key(self.key_pair.verifying_key())
    }

    /// Return a reference to the signing key.
    pub fn signing_key(&self) -> &SigningKey {
        self.key_pair.signing_key()
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        self.key_pair.verifying_key()
    }

    /// Return the signing key bytes. Caller must zeroize after use.
    pub fn signing_key_bytes(&self) -> [u8; 32] {
        self.key_pair.signing_key_bytes()
    }

    /// Return the public key as base64.
    pub fn public_key_base64(&self) -> String {
        self.key_pair.verifying_key_base64()
    }
}
