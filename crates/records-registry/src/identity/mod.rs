//! Identities — who may call the ledger and who owns it.
//!
//! An [`Identity`] is an opaque 32-byte principal reference compared by
//! equality. An [`InstitutionKey`] is the key pair behind an identity
//! that can sign ledger requests.

pub mod institution;
pub mod principal;

pub use institution::InstitutionKey;
pub use principal::Identity;
