//! Credential store for acme-dns-manager: acme-dns accounts and issued
//! certificates, sharing one on-disk root.

pub mod accounts;
pub mod atomic;
pub mod certificates;

pub use accounts::AccountStore;
pub use certificates::{CertMetadata, CertResource, CertificateStore};

use admgr_core::Error;
use std::path::{Path, PathBuf};

/// Opens both sub-stores rooted at the same directory, the unit a caller
/// actually wants: one `CredentialStore` per configured `cert_storage_path`.
pub struct CredentialStore {
    pub accounts: AccountStore,
    pub certificates: CertificateStore,
    root: PathBuf,
}

impl CredentialStore {
    pub async fn open(root: &Path) -> Result<Self, Error> {
        atomic::ensure_dir(root, 0o755).await?;
        Ok(Self {
            accounts: AccountStore::load(root).await?,
            certificates: CertificateStore::new(root),
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
