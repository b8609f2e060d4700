//! Ledger events — the notifications emitted by successful state changes.
//!
//! Events double as the journal payload: replaying them in order through
//! [`super::RecordLedger::apply`] rebuilds the ledger.

use serde::{Deserialize, Serialize};

use crate::fingerprint::Fingerprint;
use crate::identity::Identity;

use super::record::RecordId;

/// A committed change to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LedgerEvent {
    /// Genesis: the ledger came into existence with `owner`.
    LedgerCreated { owner: Identity, created_at: u64 },

    /// A record fingerprint was stored.
    RecordIssued {
        record_id: RecordId,
        issuer: Identity,
        record_hash: Fingerprint,
        issued_at: u64,
    },

    /// Write authority moved to a new identity.
    OwnershipTransferred {
        previous_owner: Identity,
        new_owner: Identity,
        transferred_at: u64,
    },
}

impl LedgerEvent {
    /// Stable event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::LedgerCreated { .. } => "LedgerCreated",
            Self::RecordIssued { .. } => "RecordIssued",
            Self::OwnershipTransferred { .. } => "OwnershipTransferred",
        }
    }

    /// Ledger-assigned time of the event.
    pub fn timestamp(&self) -> u64 {
        match self {
            Self::LedgerCreated { created_at, .. } => *created_at,
            Self::RecordIssued { issued_at, .. } => *issued_at,
            Self::OwnershipTransferred { transferred_at, .. } => *transferred_at,
        }
    }
}
