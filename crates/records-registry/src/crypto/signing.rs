//! Ed25519 signing and verification over base64 transport.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::error::{RegistryError, Result};

/// Sign a message and return the signature as standard base64.
pub fn sign_to_base64(signing_key: &SigningKey, message: &[u8]) -> String {
    let sig: Signature = signing_key.sign(message);
    STANDARD.encode(sig.to_bytes())
}

/// Verify a base64-encoded signature against a public key and message.
pub fn verify_from_base64(
    verifying_key: &VerifyingKey,
    message: &[u8],
    signature_b64: &str,
) -> Result<()> {
    let sig_bytes = STANDARD
        .decode(signature_b64)
        .map_err(|_| RegistryError::SignatureInvalid)?;

    let sig_array: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| RegistryError::SignatureInvalid)?;

    let signature = Signature::from_bytes(&sig_array);
    verifying_key
        .verify(message, &signature)
        .map_err(|_| RegistryError::SignatureInvalid)
}
