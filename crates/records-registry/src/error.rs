//! Error types for the records registry.
//!
//! Ledger rejections (`Unauthorized`, `AlreadyIssued`, `NotFound`) are
//! caller-facing and never retried internally. Private key material is
//! never included in error messages.

use std::path::PathBuf;

use crate::fingerprint::Fingerprint;
use crate::identity::Identity;
use crate::ledger::RecordId;

/// Registry error types covering all operations.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Unauthorized: caller {caller} is not the owner {owner}")]
    Unauthorized { caller: Identity, owner: Identity },

    #[error("Record already issued. Cannot be overwritten: {0}")]
    AlreadyIssued(RecordId),

    #[error("Record not found in the registry: {0}")]
    NotFound(RecordId),

    #[error("Invalid ledger event: {0}")]
    InvalidEvent(String),

    #[error("Invalid owner: {0}")]
    InvalidOwner(String),

    #[error("Invalid fingerprint: {0}")]
    InvalidFingerprint(String),

    #[error("Invalid identity: {0}")]
    InvalidIdentity(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Stale request: expected sequence {expected}, got {actual}")]
    StaleRequest { expected: u64, actual: u64 },

    #[error("Request is for ledger {actual}, this is ledger {expected}")]
    WrongLedger {
        expected: Fingerprint,
        actual: Fingerprint,
    },

    #[error("Ledger {} is open read-only", .0.display())]
    ReadOnly(PathBuf),

    #[error("Invalid passphrase")]
    InvalidPassphrase,

    #[error("Key derivation failed: {0}")]
    DerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Corrupt journal at line {line}: {reason}")]
    CorruptJournal { line: usize, reason: String },

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid file format: {0}")]
    InvalidFileFormat(String),

    #[error("Ledger lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, RegistryError>;
