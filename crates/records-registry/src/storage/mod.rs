//! Storage layer for ledger journals and institution key files.
//!
//! # Directory layout
//!
//! By convention the CLI roots everything at `~/.srms/`:
//!
//! ```text
//! ~/.srms/
//! ├── config.json      (optional)
//! ├── ledger.jsonl     journal, one event per line
//! └── keys/
//!     └── {name}.srk
//! ```
//!
//! # Modules
//!
//! - [`journal`] — append-only, hash-chained event journal with crash recovery.
//! - [`key_file`] — `.srk` save/load with passphrase encryption.

pub mod journal;
pub mod key_file;

pub use journal::{Journal, JournalEntry, JournalOptions};
pub use key_file::{load_key, read_public_info, save_key, PublicKeyInfo};
