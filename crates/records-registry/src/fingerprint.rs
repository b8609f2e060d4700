//! Fingerprints — fixed-size SHA-256 digests.
//!
//! A fingerprint is used both as a record identifier and as the stored
//! integrity value of a record. The text form is `0x` followed by 64
//! lowercase hex characters.

use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use crate::error::{RegistryError, Result};

/// Length of a fingerprint in bytes.
pub const FINGERPRINT_LEN: usize = 32;

/// A 256-bit collision-resistant digest.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; FINGERPRINT_LEN]);

impl Fingerprint {
    /// Wrap raw digest bytes.
    pub const fn from_bytes(bytes: [u8; FINGERPRINT_LEN]) -> Self {
        Self(bytes)
    }

    /// SHA-256 of `data`.
    pub fn digest(data: impl AsRef<[u8]>) -> Self {
        Self(Sha256::digest(data.as_ref()).into())
    }

    /// SHA-256 of a file's contents, streamed in chunks.
    pub fn digest_file(path: &Path) -> Result<Self> {
        let mut file = std::fs::File::open(path)?;
        let mut hasher = Sha256::new();
        let mut buf = [0u8; 8192];
        loop {
            let n = file.read(&mut buf)?;
            if n == 0 {
                break;
            }
            hasher.update(&buf[..n]);
        }
        Ok(Self(hasher.finalize().into()))
    }

    /// Return the raw bytes.
    pub fn as_bytes(&self) -> &[u8; FINGERPRINT_LEN] {
        &self.0
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Derive the conventional record identifier for a student record.
///
/// The identifier is the digest of `institution|student|period`. The
/// ledger itself never calls this; issuers use it off-ledger.
pub fn record_id_for(institution: &str, student: &str, period: &str) -> Fingerprint {
    Fingerprint::digest(format!("{institution}|{student}|{period}"))
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", self.to_hex())
    }
}

impl std::fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Fingerprint({self})")
    }
}

impl FromStr for Fingerprint {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.len() != FINGERPRINT_LEN * 2 {
            return Err(RegistryError::InvalidFingerprint(format!(
                "expected {} hex characters, got {}",
                FINGERPRINT_LEN * 2,
                digits.len()
            )));
        }

        let mut bytes = [0u8; FINGERPRINT_LEN];
        hex::decode_to_slice(digits, &mut bytes)
            .map_err(|e| RegistryError::InvalidFingerprint(format!("{s}: {e}")))?;
        Ok(Self(bytes))
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
