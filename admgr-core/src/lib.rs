//! Shared error, cancellation, domain-model and logging types used by every
//! crate in the acme-dns-manager workspace.

pub mod account;
pub mod cancel;
pub mod domain;
pub mod error;
pub mod keytype;
pub mod logging;
pub mod request;

pub use account::AcmeDnsAccount;
pub use cancel::CancellationToken;
pub use error::{Error, ErrorKind, Result};
pub use keytype::KeyType;
pub use request::{validate_unique_names, CertificateRequest};
