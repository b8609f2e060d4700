//! Records Registry — an immutable, owner-gated ledger of record fingerprints.
//!
//! An institution registers the fingerprint of a student record under a
//! unique identifier. Anyone can later look the fingerprint up to check
//! that an off-ledger document has not been altered. Entries are
//! write-once: there is no update and no delete.

pub mod crypto;
pub mod error;
pub mod fingerprint;
pub mod identity;
pub mod ledger;
pub mod request;
pub mod service;
pub mod storage;
pub mod time;

// Re-export primary types
pub use error::{RegistryError, Result};
pub use fingerprint::{record_id_for, Fingerprint};
pub use identity::{Identity, InstitutionKey};
pub use ledger::{
    ChannelObserver, EventObserver, LedgerEvent, MemoryObserver, RecordEntry, RecordId,
    RecordLedger, RecordVerification,
};
pub use request::{IssueRequest, TransferRequest};
pub use service::LedgerService;
pub use storage::{Journal, JournalEntry, JournalOptions};
pub use time::{Clock, ManualClock, SystemClock};
