//! Record identifiers and stored entries.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RegistryError;
use crate::fingerprint::Fingerprint;

/// Lookup key of a record. Derived off-ledger; the ledger only compares it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub Fingerprint);

impl From<Fingerprint> for RecordId {
    fn from(fp: Fingerprint) -> Self {
        Self(fp)
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.0, f)
    }
}

impl std::fmt::Debug for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl FromStr for RecordId {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

/// The value stored for an issued record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordEntry {
    /// Fingerprint of the record's content.
    pub record_hash: Fingerprint,
    /// Write time assigned by the ledger clock (microseconds since Unix epoch).
    pub issued_at: u64,
}

/// Outcome of comparing a candidate fingerprint with a stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordVerification {
    pub record_id: RecordId,
    pub candidate: Fingerprint,
    pub stored_hash: Fingerprint,
    pub issued_at: u64,
    pub matches: bool,
}
