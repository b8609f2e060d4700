//! `LedgerService` — a shareable, durable ledger.
//!
//! Wraps a [`RecordLedger`] and its [`Journal`] in one `RwLock`. Reads
//! share the lock. A write holds it exclusively across the whole
//! check → journal append → apply → notify sequence, so two writers can
//! never interleave between a precondition check and the insert it guards.
//! Across handles and processes the journal's file lock gives the same
//! guarantee: only one service at a time may open a path for writing.

use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{RegistryError, Result};
use crate::fingerprint::Fingerprint;
use crate::identity::Identity;
use crate::ledger::{
    EventObserver, LedgerEvent, RecordEntry, RecordId, RecordLedger, RecordVerification,
};
use crate::request::{IssueRequest, TransferRequest};
use crate::storage::{Journal, JournalEntry, JournalOptions};
use crate::time::{Clock, SystemClock};

/// Where committed events go.
enum Backing {
    /// Durable, and the journal's counter is the sequence number.
    Journal(Journal),
    /// Memory only.
    Memory { next_seq: u64 },
    /// A snapshot of a journal another handle may be writing.
    ReadOnly { path: PathBuf, next_seq: u64 },
}

impl Backing {
    fn next_seq(&self) -> u64 {
        match self {
            Self::Journal(journal) => journal.next_seq(),
            Self::Memory { next_seq } | Self::ReadOnly { next_seq, .. } => *next_seq,
        }
    }

    fn path(&self) -> Option<&Path> {
        match self {
            Self::Journal(journal) => Some(journal.path()),
            Self::Memory { .. } => None,
            Self::ReadOnly { path, .. } => Some(path),
        }
    }

    fn ensure_writable(&self) -> Result<()> {
        match self {
            Self::ReadOnly { path, .. } => Err(RegistryError::ReadOnly(path.clone())),
            _ => Ok(()),
        }
    }

    fn record(&mut self, event: &LedgerEvent) -> Result<()> {
        match self {
            Self::Journal(journal) => journal.append(event).map(|_| ()),
            Self::Memory { next_seq } => {
                *next_seq += 1;
                Ok(())
            }
            Self::ReadOnly { path, .. } => Err(RegistryError::ReadOnly(path.clone())),
        }
    }
}

struct ServiceState {
    ledger: RecordLedger,
    backing: Backing,
}

/// Thread-safe front door to a record ledger.
pub struct LedgerService {
    state: RwLock<ServiceState>,
    observers: RwLock<Vec<Arc<dyn EventObserver>>>,
    clock: Arc<dyn Clock>,
}

impl LedgerService {
    /// Create a new durable ledger at `path` owned by `owner`.
    ///
    /// # Errors
    ///
    /// `InvalidOwner` for the null identity, `StorageError` if a journal
    /// already exists at `path`.
    pub fn create(
        path: &Path,
        owner: Identity,
        clock: Arc<dyn Clock>,
        options: JournalOptions,
    ) -> Result<Self> {
        let ledger = RecordLedger::new(owner, clock.now_micros())?;
        let journal = Journal::create(path, &ledger.genesis_event(), options)?;
        log::info!("ledger created at {} with owner {owner}", path.display());
        Ok(Self::from_parts(ledger, Backing::Journal(journal), clock))
    }

    /// Open an existing durable ledger for writing and replay its journal.
    ///
    /// # Errors
    ///
    /// `StorageError` while another handle has the journal open for
    /// writing, `CorruptJournal` for damaged content.
    pub fn open(path: &Path, clock: Arc<dyn Clock>, options: JournalOptions) -> Result<Self> {
        let (journal, entries) = Journal::open(path, options)?;
        let ledger = replay(&entries)?;
        log::info!(
            "ledger opened at {}: {} records, owner {}",
            path.display(),
            ledger.len(),
            ledger.owner()
        );
        Ok(Self::from_parts(ledger, Backing::Journal(journal), clock))
    }

    /// Load a snapshot of a durable ledger for queries only.
    ///
    /// Needs read permission alone, never modifies the file and works
    /// while a writer holds the journal. An append still in flight is not
    /// part of the snapshot. Commands fail with `ReadOnly`.
    pub fn open_read_only(path: &Path) -> Result<Self> {
        let entries = Journal::read_entries(path)?;
        let ledger = replay(&entries)?;
        log::debug!(
            "ledger snapshot loaded from {}: {} records",
            path.display(),
            ledger.len()
        );
        let backing = Backing::ReadOnly {
            path: path.to_path_buf(),
            next_seq: entries.len() as u64,
        };
        Ok(Self::from_parts(ledger, backing, Arc::new(SystemClock)))
    }

    /// A ledger that lives only in memory.
    pub fn ephemeral(owner: Identity, clock: Arc<dyn Clock>) -> Result<Self> {
        let ledger = RecordLedger::new(owner, clock.now_micros())?;
        Ok(Self::from_parts(ledger, Backing::Memory { next_seq: 1 }, clock))
    }

    fn from_parts(ledger: RecordLedger, backing: Backing, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: RwLock::new(ServiceState { ledger, backing }),
            observers: RwLock::new(Vec::new()),
            clock,
        }
    }

    /// Register an observer for every future committed event.
    pub fn subscribe(&self, observer: Arc<dyn EventObserver>) -> Result<()> {
        self.observers
            .write()
            .map_err(|_| RegistryError::LockPoisoned)?
            .push(observer);
        Ok(())
    }

    // ── Commands ──────────────────────────────────────────────────────────────

    /// Issue a record on behalf of an already-authenticated caller.
    pub fn issue_record(
        &self,
        caller: &Identity,
        record_id: RecordId,
        record_hash: Fingerprint,
    ) -> Result<LedgerEvent> {
        self.commit(|ledger, _, clock| ledger.prepare_issue(caller, record_id, record_hash, clock))
    }

    /// Authenticate a signed request, then issue it.
    ///
    /// The request must name this ledger, else `WrongLedger`.
    pub fn submit_issue(&self, request: &IssueRequest) -> Result<LedgerEvent> {
        let caller = request.authenticate()?;
        self.commit(|ledger, _, clock| {
            check_ledger_id(ledger, &request.ledger_id)?;
            ledger.prepare_issue(&caller, request.record_id, request.record_hash, clock)
        })
    }

    /// Transfer ownership on behalf of an already-authenticated caller.
    pub fn transfer_ownership(
        &self,
        caller: &Identity,
        new_owner: Identity,
    ) -> Result<LedgerEvent> {
        self.commit(|ledger, _, clock| ledger.prepare_transfer(caller, new_owner, clock))
    }

    /// Authenticate a signed transfer, check its ledger and sequence, then
    /// apply it.
    pub fn submit_transfer(&self, request: &TransferRequest) -> Result<LedgerEvent> {
        let caller = request.authenticate()?;
        self.commit(|ledger, sequence, clock| {
            check_ledger_id(ledger, &request.ledger_id)?;
            let event = ledger.prepare_transfer(&caller, request.new_owner, clock)?;
            if request.sequence != sequence {
                return Err(RegistryError::StaleRequest {
                    expected: sequence,
                    actual: request.sequence,
                });
            }
            Ok(event)
        })
    }

    // ── Queries ───────────────────────────────────────────────────────────────

    pub fn owner(&self) -> Result<Identity> {
        Ok(self.read()?.ledger.owner())
    }

    /// Identifier that signed requests must carry.
    pub fn ledger_id(&self) -> Result<Fingerprint> {
        Ok(self.read()?.ledger.ledger_id())
    }

    pub fn get_record_hash(&self, record_id: &RecordId) -> Result<Fingerprint> {
        self.read()?.ledger.get_record_hash(record_id)
    }

    pub fn get_record(&self, record_id: &RecordId) -> Result<RecordEntry> {
        self.read()?.ledger.get_record(record_id)
    }

    /// Check a document fingerprint against the stored one.
    pub fn verify_document(
        &self,
        record_id: &RecordId,
        candidate: Fingerprint,
    ) -> Result<RecordVerification> {
        self.read()?.ledger.verify_record(record_id, candidate)
    }

    /// Sequence number the next committed event will receive.
    pub fn sequence(&self) -> Result<u64> {
        Ok(self.read()?.backing.next_seq())
    }

    /// Number of issued records.
    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.ledger.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.read()?.ledger.is_empty())
    }

    /// Whether this handle was opened with [`LedgerService::open_read_only`].
    pub fn is_read_only(&self) -> Result<bool> {
        Ok(matches!(self.read()?.backing, Backing::ReadOnly { .. }))
    }

    /// A consistent copy of the current ledger state.
    pub fn snapshot(&self) -> Result<RecordLedger> {
        Ok(self.read()?.ledger.clone())
    }

    /// Path of the backing journal, if any.
    pub fn journal_path(&self) -> Result<Option<PathBuf>> {
        Ok(self.read()?.backing.path().map(Path::to_path_buf))
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn read(&self) -> Result<RwLockReadGuard<'_, ServiceState>> {
        self.state.read().map_err(|_| RegistryError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, ServiceState>> {
        self.state.write().map_err(|_| RegistryError::LockPoisoned)
    }

    /// Run `prepare` and, if it succeeds, persist, apply and broadcast the
    /// event, all under the write lock.
    fn commit<F>(&self, prepare: F) -> Result<LedgerEvent>
    where
        F: FnOnce(&RecordLedger, u64, &dyn Clock) -> Result<LedgerEvent>,
    {
        let mut guard = self.write()?;
        let state = &mut *guard;
        state.backing.ensure_writable()?;

        let sequence = state.backing.next_seq();
        let event = match prepare(&state.ledger, sequence, self.clock.as_ref()) {
            Ok(event) => event,
            Err(e) => {
                log::debug!("ledger command rejected: {e}");
                return Err(e);
            }
        };

        state.backing.record(&event)?;
        state.ledger.apply(&event)?;

        if let LedgerEvent::RecordIssued {
            record_id, issuer, ..
        } = &event
        {
            log::info!("record {record_id} issued by {issuer}");
        }

        self.notify(&event);
        Ok(event)
    }

    fn notify(&self, event: &LedgerEvent) {
        let observers = match self.observers.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for observer in observers.iter() {
            observer.on_event(event);
        }
    }
}

fn check_ledger_id(ledger: &RecordLedger, requested: &Fingerprint) -> Result<()> {
    let expected = ledger.ledger_id();
    if *requested != expected {
        return Err(RegistryError::WrongLedger {
            expected,
            actual: *requested,
        });
    }
    Ok(())
}

/// Rebuild a ledger from journal entries.
///
/// Every entry after genesis goes through [`RecordLedger::apply`], so a
/// journal that encodes an invariant violation is rejected.
pub fn replay(entries: &[JournalEntry]) -> Result<RecordLedger> {
    let corrupt = |index: usize, e: RegistryError| RegistryError::CorruptJournal {
        line: index + 1,
        reason: e.to_string(),
    };

    let (first, rest) = entries.split_first().ok_or(RegistryError::CorruptJournal {
        line: 1,
        reason: "journal has no genesis entry".into(),
    })?;

    let mut ledger = RecordLedger::from_genesis(&first.event).map_err(|e| corrupt(0, e))?;
    for (i, entry) in rest.iter().enumerate() {
        ledger.apply(&entry.event).map_err(|e| corrupt(i + 1, e))?;
    }
    Ok(ledger)
}
