//! The ledger state machine.
//!
//! Every mutation is split into a `prepare_*` step that runs all checks
//! against `&self` and builds the event, and [`RecordLedger::apply`] which
//! re-validates and commits it. A failed check never touches state.

use std::collections::HashMap;

use crate::error::{RegistryError, Result};
use crate::fingerprint::Fingerprint;
use crate::identity::Identity;
use crate::time::Clock;

use super::event::LedgerEvent;
use super::record::{RecordEntry, RecordId, RecordVerification};

/// Write-once map of record fingerprints with a single owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLedger {
    owner: Identity,
    founder: Identity,
    records: HashMap<RecordId, RecordEntry>,
    created_at: u64,
    /// Timestamp of the latest committed event; new timestamps never go below it.
    last_timestamp: u64,
}

impl RecordLedger {
    /// Create an empty ledger owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::InvalidOwner` for the null identity.
    pub fn new(owner: Identity, created_at: u64) -> Result<Self> {
        if owner.is_zero() {
            return Err(RegistryError::InvalidOwner(
                "the null identity cannot own a ledger".into(),
            ));
        }
        Ok(Self {
            owner,
            founder: owner,
            records: HashMap::new(),
            created_at,
            last_timestamp: created_at,
        })
    }

    /// Rebuild an empty ledger from its genesis event.
    pub fn from_genesis(event: &LedgerEvent) -> Result<Self> {
        match event {
            LedgerEvent::LedgerCreated { owner, created_at } => Self::new(*owner, *created_at),
            other => Err(RegistryError::InvalidEvent(format!(
                "expected LedgerCreated as first event, found {}",
                other.name()
            ))),
        }
    }

    /// The genesis event describing this ledger's creation.
    pub fn genesis_event(&self) -> LedgerEvent {
        LedgerEvent::LedgerCreated {
            owner: self.founder,
            created_at: self.created_at,
        }
    }

    /// Stable identifier of this ledger, derived from its genesis event.
    ///
    /// Signed requests carry it so a request made for one ledger is
    /// rejected by every other ledger, even one with the same owner.
    pub fn ledger_id(&self) -> Fingerprint {
        Fingerprint::digest(format!(
            "srr-ledger-v1:{}:{}",
            self.founder, self.created_at
        ))
    }

    /// The identity currently allowed to issue records.
    pub fn owner(&self) -> Identity {
        self.owner
    }

    pub fn created_at(&self) -> u64 {
        self.created_at
    }

    /// Timestamp of the most recent committed event.
    pub fn last_timestamp(&self) -> u64 {
        self.last_timestamp
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, record_id: &RecordId) -> bool {
        self.records.contains_key(record_id)
    }

    /// Iterate over all stored records in no particular order.
    pub fn records(&self) -> impl Iterator<Item = (&RecordId, &RecordEntry)> {
        self.records.iter()
    }

    // ── Commands ──────────────────────────────────────────────────────────

    /// Check an issuance and build its event without changing state.
    ///
    /// Checks run in order and the first failure wins: the caller must be
    /// the owner (`Unauthorized`), then the id must be unused (`AlreadyIssued`).
    pub fn prepare_issue(
        &self,
        caller: &Identity,
        record_id: RecordId,
        record_hash: Fingerprint,
        clock: &dyn Clock,
    ) -> Result<LedgerEvent> {
        self.authorize(caller)?;
        if self.records.contains_key(&record_id) {
            return Err(RegistryError::AlreadyIssued(record_id));
        }
        Ok(LedgerEvent::RecordIssued {
            record_id,
            issuer: *caller,
            record_hash,
            issued_at: self.next_timestamp(clock),
        })
    }

    /// Store `record_hash` under `record_id`, stamped by `clock`.
    pub fn issue_record(
        &mut self,
        caller: &Identity,
        record_id: RecordId,
        record_hash: Fingerprint,
        clock: &dyn Clock,
    ) -> Result<LedgerEvent> {
        let event = self.prepare_issue(caller, record_id, record_hash, clock)?;
        self.apply(&event)?;
        Ok(event)
    }

    /// Check an ownership transfer and build its event without changing state.
    pub fn prepare_transfer(
        &self,
        caller: &Identity,
        new_owner: Identity,
        clock: &dyn Clock,
    ) -> Result<LedgerEvent> {
        self.authorize(caller)?;
        if new_owner.is_zero() {
            return Err(RegistryError::InvalidOwner(
                "cannot transfer ownership to the null identity".into(),
            ));
        }
        Ok(LedgerEvent::OwnershipTransferred {
            previous_owner: *caller,
            new_owner,
            transferred_at: self.next_timestamp(clock),
        })
    }

    /// Hand write authority to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        caller: &Identity,
        new_owner: Identity,
        clock: &dyn Clock,
    ) -> Result<LedgerEvent> {
        let event = self.prepare_transfer(caller, new_owner, clock)?;
        self.apply(&event)?;
        Ok(event)
    }

    /// Validate and commit an event.
    ///
    /// Used for fresh commands and for journal replay alike, so an event
    /// that would break an invariant is rejected either way.
    pub fn apply(&mut self, event: &LedgerEvent) -> Result<()> {
        if event.timestamp() < self.last_timestamp {
            return Err(RegistryError::InvalidEvent(format!(
                "{} at {} precedes last event at {}",
                event.name(),
                event.timestamp(),
                self.last_timestamp
            )));
        }

        match event {
            LedgerEvent::LedgerCreated { .. } => {
                return Err(RegistryError::InvalidEvent(
                    "LedgerCreated may only appear as the first event".into(),
                ));
            }
            LedgerEvent::RecordIssued {
                record_id,
                issuer,
                record_hash,
                issued_at,
            } => {
                self.authorize(issuer)?;
                if self.records.contains_key(record_id) {
                    return Err(RegistryError::AlreadyIssued(*record_id));
                }
                self.records.insert(
                    *record_id,
                    RecordEntry {
                        record_hash: *record_hash,
                        issued_at: *issued_at,
                    },
                );
            }
            LedgerEvent::OwnershipTransferred {
                previous_owner,
                new_owner,
                ..
            } => {
                self.authorize(previous_owner)?;
                if new_owner.is_zero() {
                    return Err(RegistryError::InvalidOwner(
                        "cannot transfer ownership to the null identity".into(),
                    ));
                }
                self.owner = *new_owner;
            }
        }

        self.last_timestamp = event.timestamp();
        Ok(())
    }

    // ── Queries ───────────────────────────────────────────────────────────

    /// Look up the stored fingerprint. Open to every caller.
    pub fn get_record_hash(&self, record_id: &RecordId) -> Result<Fingerprint> {
        self.get_record(record_id).map(|entry| entry.record_hash)
    }

    /// Look up the full stored entry.
    pub fn get_record(&self, record_id: &RecordId) -> Result<RecordEntry> {
        self.records
            .get(record_id)
            .copied()
            .ok_or(RegistryError::NotFound(*record_id))
    }

    /// Compare a candidate document fingerprint with the stored one.
    pub fn verify_record(
        &self,
        record_id: &RecordId,
        candidate: Fingerprint,
    ) -> Result<RecordVerification> {
        let entry = self.get_record(record_id)?;
        Ok(RecordVerification {
            record_id: *record_id,
            candidate,
            stored_hash: entry.record_hash,
            issued_at: entry.issued_at,
            matches: entry.record_hash == candidate,
        })
    }

    // ── Internal helpers ──────────────────────────────────────────────────

    fn authorize(&self, caller: &Identity) -> Result<()> {
        if *caller != self.owner {
            return Err(RegistryError::Unauthorized {
                caller: *caller,
                owner: self.owner,
            });
        }
        Ok(())
    }

    fn next_timestamp(&self, clock: &dyn Clock) -> u64 {
        clock.now_micros().max(self.last_timestamp)
    }
}
