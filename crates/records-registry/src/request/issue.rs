//! Signed issuance requests.

use serde::{Deserialize, Serialize};

use crate::crypto::{keys, signing};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::identity::{Identity, InstitutionKey};
use crate::ledger::RecordId;

/// A request to store `record_hash` under `record_id` on one ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueRequest {
    /// [`crate::RecordLedger::ledger_id`] of the target ledger.
    pub ledger_id: Fingerprint,
    pub record_id: RecordId,
    pub record_hash: Fingerprint,
    /// Base64 Ed25519 public key of the signer.
    pub issuer_key: String,
    /// Base64 signature over [`IssueRequest::payload`].
    pub signature: String,
}

impl IssueRequest {
    /// Build and sign a request with an institution key.
    pub fn sign(
        key: &InstitutionKey,
        ledger_id: Fingerprint,
        record_id: RecordId,
        record_hash: Fingerprint,
    ) -> Self {
        let payload = Self::payload(&ledger_id, &record_id, &record_hash);
        Self {
            ledger_id,
            record_id,
            record_hash,
            issuer_key: key.public_key_base64(),
            signature: signing::sign_to_base64(key.signing_key(), payload.as_bytes()),
        }
    }

    /// Canonical bytes covered by the signature.
    pub fn payload(
        ledger_id: &Fingerprint,
        record_id: &RecordId,
        record_hash: &Fingerprint,
    ) -> String {
        format!("srr/issue/v2:{ledger_id}:{record_id}:{record_hash}")
    }

    /// Verify the signature and return the signer's identity.
    pub fn authenticate(&self) -> Result<Identity> {
        let key = keys::verifying_key_from_base64(&self.issuer_key)?;
        let payload = Self::payload(&self.ledger_id, &self.record_id, &self.record_hash);
        signing::verify_from_base64(&key, payload.as_bytes(), &self.signature)?;
        Ok(Identity::from_verifying_key(&key))
    }
}
