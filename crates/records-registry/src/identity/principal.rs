//! Opaque principal identities.

use std::str::FromStr;

use ed25519_dalek::VerifyingKey;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

const IDENTITY_PREFIX: &str = "idn_";

/// A fixed-width principal reference.
///
/// Format: `idn_` + base58 of the 32 raw bytes. Key-bearing identities
/// are SHA-256 of the Ed25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; 32]);

impl Identity {
    /// The null identity. Never a valid owner.
    pub const ZERO: Identity = Identity([0u8; 32]);

    /// Wrap raw identity bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Compute the identity of a verifying (public) key.
    pub fn from_verifying_key(key: &VerifyingKey) -> Self {
        Self(Sha256::digest(key.as_bytes()).into())
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }
}

impl std::fmt::Display for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{IDENTITY_PREFIX}{}", bs58::encode(self.0).into_string())
    }
}

impl std::fmt::Debug for Identity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Identity({self})")
    }
}

impl FromStr for Identity {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let encoded = s.trim().strip_prefix(IDENTITY_PREFIX).ok_or_else(|| {
            RegistryError::InvalidIdentity(format!("missing '{IDENTITY_PREFIX}' prefix: {s}"))
        })?;

        let raw = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| RegistryError::InvalidIdentity(format!("{s}: {e}")))?;

        let bytes: [u8; 32] = raw.try_into().map_err(|_| {
            RegistryError::InvalidIdentity(format!("{s}: must decode to 32 bytes"))
        })?;

        Ok(Self(bytes))
    }
}

impl Serialize for Identity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Identity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
