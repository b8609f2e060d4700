//! `.srk` key files — passphrase-encrypted institution keys.
//!
//! The private signing key is encrypted with ChaCha20-Poly1305 under a key
//! derived from the passphrase (Argon2id, then HKDF-SHA256). The public
//! section stays in plaintext so the identity can be shown without the
//! passphrase.
//!
//! File format (JSON):
//! ```json
//! {
//!     "version": 1,
//!     "format": "srk-v1",
//!     "encryption": {
//!         "algorithm": "chacha20-poly1305",
//!         "kdf": "argon2id+hkdf-sha256",
//!         "salt": "<base64-16-bytes>",
//!         "nonce": "<base64-12-bytes>"
//!     },
//!     "encrypted_key": "<base64-ciphertext>",
//!     "public": { "identity": "idn_...", "public_key": "...", "name": "...", "created_at": 0 }
//! }
//! ```

use std::path::Path;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::Zeroize;

use crate::crypto::encryption::{self, Sealed};
use crate::error::{RegistryError, Result};
use crate::identity::{Identity, InstitutionKey};

// ── File format constants ─────────────────────────────────────────────────────

const KEY_FILE_VERSION: u32 = 1;
const KEY_FILE_FORMAT: &str = "srk-v1";
const KEY_FILE_ALGORITHM: &str = "chacha20-poly1305";
const KEY_FILE_KDF: &str = "argon2id+hkdf-sha256";

/// HKDF context for the key-file encryption key. Must stay stable.
const KEY_FILE_CONTEXT: &str = "records-registry/key-file";

// ── On-disk structures ────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    version: u32,
    format: String,
    encryption: EncryptionMetadata,
    encrypted_key: String,
    public: PublicKeyInfo,
}

#[derive(Debug, Serialize, Deserialize)]
struct EncryptionMetadata {
    algorithm: String,
    kdf: String,
    salt: String,
    nonce: String,
}

/// The plaintext part of a key file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublicKeyInfo {
    pub identity: Identity,
    pub public_key: String,
    pub name: Option<String>,
    pub created_at: u64,
}

/// Serialized, then encrypted.
#[derive(Serialize, Deserialize, Zeroize)]
struct PrivateKeyData {
    signing_key_b64: String,
    created_at: u64,
    name: Option<String>,
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Save an institution key to `path`, encrypted with `passphrase`.
///
/// The file is written to a sibling temp file and renamed into place.
pub fn save_key(key: &InstitutionKey, path: &Path, passphrase: &str) -> Result<()> {
    let mut signing_bytes = key.signing_key_bytes();
    let mut private = PrivateKeyData {
        signing_key_b64: STANDARD.encode(signing_bytes),
        created_at: key.created_at,
        name: key.name.clone(),
    };
    signing_bytes.zeroize();

    let plaintext = serde_json::to_vec(&private);
    private.zeroize();
    let mut plaintext = plaintext.map_err(|e| RegistryError::SerializationError(e.to_string()))?;

    let sealed = encryption::seal(passphrase.as_bytes(), KEY_FILE_CONTEXT, &plaintext);
    plaintext.zeroize();
    let sealed = sealed?;

    let file = KeyFile {
        version: KEY_FILE_VERSION,
        format: KEY_FILE_FORMAT.to_string(),
        encryption: EncryptionMetadata {
            algorithm: KEY_FILE_ALGORITHM.to_string(),
            kdf: KEY_FILE_KDF.to_string(),
            salt: STANDARD.encode(sealed.salt),
            nonce: STANDARD.encode(sealed.nonce),
        },
        encrypted_key: STANDARD.encode(&sealed.ciphertext),
        public: PublicKeyInfo {
            identity: key.id(),
            public_key: key.public_key_base64(),
            name: key.name.clone(),
            created_at: key.created_at,
        },
    };

    let json = serde_json::to_string_pretty(&file)
        .map_err(|e| RegistryError::SerializationError(e.to_string()))?;
    write_atomic(path, json.as_bytes())
}

/// Load and decrypt an institution key.
///
/// # Errors
///
/// Returns `RegistryError::InvalidPassphrase` for a wrong passphrase and
/// `RegistryError::InvalidFileFormat` for malformed files or a public
/// section that does not match the decrypted key.
pub fn load_key(path: &Path, passphrase: &str) -> Result<InstitutionKey> {
    let file = read_key_file(path)?;

    let sealed = Sealed {
        salt: decode_fixed(&file.encryption.salt, "salt")?,
        nonce: decode_fixed(&file.encryption.nonce, "nonce")?,
        ciphertext: STANDARD.decode(&file.encrypted_key).map_err(|e| {
            RegistryError::InvalidFileFormat(format!("invalid ciphertext base64: {e}"))
        })?,
    };

    let mut plaintext = encryption::open(passphrase.as_bytes(), KEY_FILE_CONTEXT, &sealed)?;
    let parsed: std::result::Result<PrivateKeyData, _> = serde_json::from_slice(&plaintext);
    plaintext.zeroize();
    let mut private = parsed
        .map_err(|e| RegistryError::InvalidFileFormat(format!("invalid private section: {e}")))?;

    let decoded = STANDARD.decode(&private.signing_key_b64);
    let name = private.name.take();
    let created_at = private.created_at;
    private.zeroize();

    let mut raw = decoded
        .map_err(|e| RegistryError::InvalidFileFormat(format!("invalid signing key base64: {e}")))?;
    let bytes: std::result::Result<[u8; 32], _> = raw.as_slice().try_into();
    raw.zeroize();
    let mut bytes = bytes
        .map_err(|_| RegistryError::InvalidFileFormat("signing key must be 32 bytes".into()))?;

    let key = InstitutionKey::from_parts(&bytes, created_at, name);
    bytes.zeroize();

    if key.id() != file.public.identity {
        return Err(RegistryError::InvalidFileFormat(
            "public identity does not match the encrypted key".into(),
        ));
    }

    Ok(key)
}

/// Read the plaintext public section without decrypting.
pub fn read_public_info(path: &Path) -> Result<PublicKeyInfo> {
    Ok(read_key_file(path)?.public)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn read_key_file(path: &Path) -> Result<KeyFile> {
    let bytes = std::fs::read(path)?;
    let file: KeyFile = serde_json::from_slice(&bytes)
        .map_err(|e| RegistryError::InvalidFileFormat(format!("failed to parse key file: {e}")))?;

    if file.version != KEY_FILE_VERSION || file.format != KEY_FILE_FORMAT {
        return Err(RegistryError::InvalidFileFormat(format!(
            "unsupported key file version={} format={}",
            file.version, file.format,
        )));
    }
    Ok(file)
}

fn decode_fixed<const N: usize>(encoded: &str, what: &str) -> Result<[u8; N]> {
    let raw = STANDARD
        .decode(encoded)
        .map_err(|e| RegistryError::InvalidFileFormat(format!("invalid {what} base64: {e}")))?;
    raw.try_into()
        .map_err(|_| RegistryError::InvalidFileFormat(format!("{what} must be {N} bytes")))
}

fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("srk.tmp");
    std::fs::write(&tmp_path, data)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────
