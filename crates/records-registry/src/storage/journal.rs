//! Append-only ledger journal.
//!
//! The journal is the durable form of the ledger: one JSON object per
//! line, each carrying a sequence number, a [`LedgerEvent`], and a
//! checksum chained to the previous line. Replaying the events rebuilds
//! the exact map observed after the last acknowledged write.
//!
//! File format (one entry per line):
//! ```json
//! {"seq":0,"event":{"type":"ledger_created",...},"checksum":"<blake3 hex>"}
//! {"seq":1,"event":{"type":"record_issued",...},"checksum":"<blake3 hex>"}
//! ```
//!
//! `checksum = blake3("srr-journal-v1" : prev_checksum : seq : event_json)`
//! with an empty `prev_checksum` for the genesis line.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use fs2::FileExt;
use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::ledger::LedgerEvent;

// ── Format constants ──────────────────────────────────────────────────────────

const JOURNAL_FORMAT: &str = "srr-journal-v1";

// ── On-disk structure ─────────────────────────────────────────────────────────

/// One committed line of the journal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Position in the journal, starting at 0 for the genesis event.
    pub seq: u64,
    /// The committed event.
    pub event: LedgerEvent,
    /// Hex blake3 chain checksum.
    pub checksum: String,
}

impl JournalEntry {
    fn chain_checksum(prev: &str, seq: u64, event: &LedgerEvent) -> Result<String> {
        let event_json = serde_json::to_string(event)
            .map_err(|e| RegistryError::SerializationError(e.to_string()))?;

        let mut hasher = blake3::Hasher::new();
        hasher.update(JOURNAL_FORMAT.as_bytes());
        hasher.update(b":");
        hasher.update(prev.as_bytes());
        hasher.update(b":");
        hasher.update(seq.to_string().as_bytes());
        hasher.update(b":");
        hasher.update(event_json.as_bytes());
        Ok(hasher.finalize().to_hex().to_string())
    }
}

/// Durability knobs for a journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JournalOptions {
    /// `fsync` file data after every append before acknowledging it.
    pub sync_writes: bool,
}

impl Default for JournalOptions {
    fn default() -> Self {
        Self { sync_writes: true }
    }
}

// ── Journal ───────────────────────────────────────────────────────────────────

/// Writable handle on a journal file.
///
/// Holds an exclusive advisory lock on the file for its whole lifetime,
/// so a second writer on the same path (in this process or another) is
/// refused instead of racing on the chain head. Readers use
/// [`Journal::read_entries`], which takes no lock and never writes.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    file: File,
    options: JournalOptions,
    next_seq: u64,
    last_checksum: String,
    /// Byte length of the committed prefix.
    committed_len: u64,
}

/// Result of scanning a journal file.
struct Scan {
    entries: Vec<JournalEntry>,
    valid_len: u64,
    torn: bool,
}

impl Journal {
    /// Create a new journal whose first line is `genesis`.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::StorageError` if the file already exists or
    /// is locked by another writer.
    pub fn create(path: &Path, genesis: &LedgerEvent, options: JournalOptions) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .append(true)
            .create_new(true)
            .open(path)
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::AlreadyExists => RegistryError::StorageError(format!(
                    "journal already exists: {}",
                    path.display()
                )),
                _ => RegistryError::Io(e),
            })?;
        lock_exclusive(&file, path)?;

        let mut journal = Self {
            path: path.to_path_buf(),
            file,
            options,
            next_seq: 0,
            last_checksum: String::new(),
            committed_len: 0,
        };
        journal.append(genesis)?;

        log::info!("created journal {}", path.display());
        Ok(journal)
    }

    /// Open an existing journal for appending and return its entries.
    ///
    /// A trailing partial line left by an interrupted write is discarded
    /// and truncated away. Any damage before that point is an error.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::StorageError` if another writer holds the
    /// journal, `RegistryError::CorruptJournal` for damaged content.
    pub fn open(path: &Path, options: JournalOptions) -> Result<(Self, Vec<JournalEntry>)> {
        let file = OpenOptions::new().read(true).append(true).open(path)?;
        lock_exclusive(&file, path)?;

        let bytes = std::fs::read(path)?;
        let scan = scan(&bytes)?;

        if scan.entries.is_empty() {
            return Err(RegistryError::CorruptJournal {
                line: 1,
                reason: "journal has no genesis entry".into(),
            });
        }

        if scan.torn {
            log::warn!(
                "discarding {} bytes of incomplete entry at end of {}",
                bytes.len() as u64 - scan.valid_len,
                path.display()
            );
            file.set_len(scan.valid_len)?;
            file.sync_data()?;
        }

        let last = &scan.entries[scan.entries.len() - 1];
        let journal = Self {
            path: path.to_path_buf(),
            file,
            options,
            next_seq: last.seq + 1,
            last_checksum: last.checksum.clone(),
            committed_len: scan.valid_len,
        };

        log::debug!(
            "opened journal {} with {} entries",
            path.display(),
            scan.entries.len()
        );
        Ok((journal, scan.entries))
    }

    /// Read and chain-check a journal without opening it for writing.
    ///
    /// Needs only read permission and takes no lock. A trailing partial
    /// line, whether left by a crash or by an append still in progress, is
    /// skipped and left on disk.
    pub fn read_entries(path: &Path) -> Result<Vec<JournalEntry>> {
        let bytes = std::fs::read(path)?;
        Ok(scan(&bytes)?.entries)
    }

    /// Durably append one event.
    ///
    /// On failure the file is cut back to its committed length so no
    /// partial line survives, and the error is returned.
    pub fn append(&mut self, event: &LedgerEvent) -> Result<JournalEntry> {
        let checksum = JournalEntry::chain_checksum(&self.last_checksum, self.next_seq, event)?;
        let entry = JournalEntry {
            seq: self.next_seq,
            event: event.clone(),
            checksum,
        };

        let mut line = serde_json::to_vec(&entry)
            .map_err(|e| RegistryError::SerializationError(e.to_string()))?;
        line.push(b'\n');

        if let Err(e) = self.write_line(&line) {
            if let Err(cut) = self.file.set_len(self.committed_len) {
                log::error!(
                    "failed to roll back partial append to {}: {cut}",
                    self.path.display()
                );
            }
            return Err(e);
        }

        self.committed_len += line.len() as u64;
        self.next_seq += 1;
        self.last_checksum = entry.checksum.clone();
        Ok(entry)
    }

    /// Sequence number the next append will receive.
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Checksum of the last committed entry.
    pub fn last_checksum(&self) -> &str {
        &self.last_checksum
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    // ── Internal helpers ──────────────────────────────────────────────────────

    fn write_line(&mut self, line: &[u8]) -> Result<()> {
        self.file.write_all(line)?;
        if self.options.sync_writes {
            self.file.sync_data()?;
        }
        Ok(())
    }
}

fn lock_exclusive(file: &File, path: &Path) -> Result<()> {
    file.try_lock_exclusive().map_err(|e| {
        RegistryError::StorageError(format!(
            "journal {} is locked by another writer: {e}",
            path.display()
        ))
    })
}

fn scan(bytes: &[u8]) -> Result<Scan> {
    let mut entries: Vec<JournalEntry> = Vec::new();
    let mut offset = 0usize;
    let mut prev = String::new();

    while offset < bytes.len() {
        let Some(rel) = bytes[offset..].iter().position(|b| *b == b'\n') else {
            return Ok(Scan {
                entries,
                valid_len: offset as u64,
                torn: true,
            });
        };

        let line_no = entries.len() + 1;
        let line = &bytes[offset..offset + rel];
        let entry: JournalEntry =
            serde_json::from_slice(line).map_err(|e| RegistryError::CorruptJournal {
                line: line_no,
                reason: format!("unparseable entry: {e}"),
            })?;

        let expected_seq = entries.len() as u64;
        if entry.seq != expected_seq {
            return Err(RegistryError::CorruptJournal {
                line: line_no,
                reason: format!("expected sequence {expected_seq}, found {}", entry.seq),
            });
        }

        let expected = JournalEntry::chain_checksum(&prev, entry.seq, &entry.event)?;
        if expected != entry.checksum {
            return Err(RegistryError::CorruptJournal {
                line: line_no,
                reason: "checksum mismatch".into(),
            });
        }

        prev = entry.checksum.clone();
        entries.push(entry);
        offset += rel + 1;
    }

    Ok(Scan {
        entries,
        valid_len: offset as u64,
        torn: false,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
