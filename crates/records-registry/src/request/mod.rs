//! Signed ledger requests.
//!
//! A request carries the caller's public key and an Ed25519 signature
//! over a canonical payload. Authenticating a request yields the caller
//! [`crate::identity::Identity`]; the ledger then applies its ordinary
//! owner check to that identity.

pub mod issue;
pub mod transfer;

pub use issue::IssueRequest;
pub use transfer::TransferRequest;
