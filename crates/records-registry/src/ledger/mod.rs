//! The record ledger — write-once, owner-gated storage of fingerprints.
//!
//! [`RecordLedger`] is the pure state machine. It has no locking and no
//! I/O; durability lives in [`crate::storage::Journal`] and serialized
//! access in [`crate::service::LedgerService`].

pub mod event;
pub mod observer;
pub mod record;
pub mod state;

pub use event::LedgerEvent;
pub use observer::{ChannelObserver, EventObserver, MemoryObserver};
pub use record::{RecordEntry, RecordId, RecordVerification};
pub use state::RecordLedger;
