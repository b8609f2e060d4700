//! Signed ownership-transfer requests.
//!
//! A transfer is bound to the journal sequence number it expects to
//! occupy, so a captured request cannot be replayed later.

use serde::{Deserialize, Serialize};

use crate::crypto::{keys, signing};
use crate::error::Result;
use crate::fingerprint::Fingerprint;
use crate::identity::{Identity, InstitutionKey};

/// A request to hand ownership to `new_owner`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// [`crate::RecordLedger::ledger_id`] of the target ledger.
    pub ledger_id: Fingerprint,
    pub new_owner: Identity,
    /// Sequence number the transfer event must receive.
    pub sequence: u64,
    /// Base64 Ed25519 public key of the current owner.
    pub owner_key: String,
    /// Base64 signature over [`TransferRequest::payload`].
    pub signature: String,
}

impl TransferRequest {
    /// Build and sign a request with the current owner's key.
    pub fn sign(
        key: &InstitutionKey,
        ledger_id: Fingerprint,
        new_owner: Identity,
        sequence: u64,
    ) -> Self {
        let payload = Self::payload(&ledger_id, &new_owner, sequence);
        Self {
            ledger_id,
            new_owner,
            sequence,
            owner_key: key.public_key_base64(),
            signature: signing::sign_to_base64(key.signing_key(), payload.as_bytes()),
        }
    }

    /// Canonical bytes covered by the signature.
    pub fn payload(ledger_id: &Fingerprint, new_owner: &Identity, sequence: u64) -> String {
        format!("srr/transfer/v2:{ledger_id}:{new_owner}:{sequence}")
    }

    /// Verify the signature and return the signer's identity.
    pub fn authenticate(&self) -> Result<Identity> {
        let key = keys::verifying_key_from_base64(&self.owner_key)?;
        let payload = Self::payload(&self.ledger_id, &self.new_owner, self.sequence);
        signing::verify_from_base64(&key, payload.as_bytes(), &self.signature)?;
        Ok(Identity::from_verifying_key(&key))
    }
}
