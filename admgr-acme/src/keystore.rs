//! ACME user keystore: the account's asymmetric key and registration
//! resource, keyed by ACME server hostname and email.
//!
//! Grounded on `pingclair-tls/src/acme.rs`'s `ensure_account` helper,
//! generalized to an on-disk layout keyed by server and email, and to EC P-384 key
//! generation via `openssl` (the account key type is fixed, unlike the
//! per-certificate key which follows `KeyType`).

use std::path::{Path, PathBuf};

use admgr_core::Error;
use openssl::ec::{EcGroup, EcKey};
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use serde::{Deserialize, Serialize};
use url::Url;

use admgr_store::atomic::{ensure_dir, write_atomic};

const ACCOUNT_KEY_MODE: u32 = 0o600;
const ACCOUNT_DIR_MODE: u32 = 0o755;

/// Opaque ACME registration resource, persisted exactly as the ACME
/// library hands it back so it can be replayed into `load_account`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountRegistration {
    pub private_key_pem: String,
    pub contact: Vec<String>,
}

pub struct LoadedAccount {
    pub key_pem: Vec<u8>,
    pub registration: Option<AccountRegistration>,
}

/// Keystore rooted at `<root>/accounts/`.
pub struct AccountKeystore {
    root: PathBuf,
}

impl AccountKeystore {
    pub fn new(root: &Path) -> Self {
        Self { root: root.join("accounts") }
    }

    fn server_host(server_url: &str) -> Result<String, Error> {
        let parsed = Url::parse(server_url).map_err(|e| {
            Error::config("acme_keystore", format!("malformed ACME server URL '{server_url}': {e}"))
        })?;
        parsed
            .host_str()
            .map(|h| h.to_string())
            .ok_or_else(|| Error::config("acme_keystore", format!("ACME server URL '{server_url}' has no host")))
    }

    fn key_path(&self, host: &str, email: &str) -> PathBuf {
        self.root.join(host).join(email).join("keys").join(format!("{email}.key"))
    }

    fn account_path(&self, host: &str) -> PathBuf {
        self.root.join(host).join("account.json")
    }

    /// Loads the account key, generating and persisting one if absent.
    /// The registration resource is left unset if it has never been
    /// saved; the ACME driver registers and calls `save_registration`
    /// afterward.
    pub async fn load_or_create(&self, server_url: &str, email: &str) -> Result<LoadedAccount, Error> {
        let host = Self::server_host(server_url)?;
        let key_path = self.key_path(&host, email);
        ensure_dir(key_path.parent().unwrap(), ACCOUNT_DIR_MODE).await?;
        ensure_dir(&self.root.join(&host), ACCOUNT_DIR_MODE).await?;

        let key_pem = match tokio::fs::read(&key_path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let pem = generate_account_key_pem()?;
                write_atomic(&key_path, &pem, ACCOUNT_KEY_MODE).await?;
                pem
            }
            Err(e) => {
                return Err(Error::storage("acme_keystore_load", format!("failed to read account key: {e}"))
                    .with_resource(key_path.display().to_string()))
            }
        };

        // A parse failure on an existing key is fatal (`KeyParseError`):
        // the key file is load-bearing, unlike the registration resource.
        PKey::private_key_from_pem(&key_pem).map_err(|e| {
            Error::certificate("acme_keystore_load", format!("account key is unparseable: {e}"))
                .with_resource(key_path.display().to_string())
        })?;

        let account_path = self.account_path(&host);
        let registration = match tokio::fs::read(&account_path).await {
            Ok(bytes) => serde_json::from_slice(&bytes).ok(),
            Err(_) => None,
        };

        Ok(LoadedAccount { key_pem, registration })
    }

    /// Persists the registration resource. A save failure here is logged
    /// by the caller but is not fatal: registration already succeeded at
    /// the ACME server and can be re-derived from the account key alone.
    pub async fn save_registration(&self, server_url: &str, registration: &AccountRegistration) -> Result<(), Error> {
        let host = Self::server_host(server_url)?;
        let path = self.account_path(&host);
        let json = serde_json::to_vec_pretty(registration).map_err(|e| {
            Error::storage("acme_keystore_save", format!("failed to serialize registration: {e}"))
        })?;
        write_atomic(&path, &json, 0o644).await
    }
}

fn generate_account_key_pem() -> Result<Vec<u8>, Error> {
    let group = EcGroup::from_curve_name(Nid::SECP384R1)
        .map_err(|e| Error::certificate("generate_account_key", format!("failed to load P-384 group: {e}")))?;
    let ec_key = EcKey::generate(&group)
        .map_err(|e| Error::certificate("generate_account_key", format!("failed to generate EC key: {e}")))?;
    let pkey: PKey<Private> = PKey::from_ec_key(ec_key)
        .map_err(|e| Error::certificate("generate_account_key", format!("failed to wrap EC key: {e}")))?;
    pkey.private_key_to_pem_pkcs8()
        .map_err(|e| Error::certificate("generate_account_key", format!("failed to PEM-encode account key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_key_on_first_use() {
        let dir = tempfile::tempdir().unwrap();
        let ks = AccountKeystore::new(dir.path());
        let loaded = ks.load_or_create("https://acme.example.com/directory", "ops@example.com").await.unwrap();
        assert!(loaded.registration.is_none());
        assert!(!loaded.key_pem.is_empty());

        use std::os::unix::fs::PermissionsExt;
        let meta = std::fs::metadata(
            dir.path()
                .join("accounts/acme.example.com/ops@example.com/keys/ops@example.com.key"),
        )
        .unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }

    #[tokio::test]
    async fn reuses_existing_key_across_calls() {
        let dir = tempfile::tempdir().unwrap();
        let ks = AccountKeystore::new(dir.path());
        let first = ks.load_or_create("https://acme.example.com/directory", "ops@example.com").await.unwrap();
        let second = ks.load_or_create("https://acme.example.com/directory", "ops@example.com").await.unwrap();
        assert_eq!(first.key_pem, second.key_pem);
    }

    #[tokio::test]
    async fn registration_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let ks = AccountKeystore::new(dir.path());
        ks.load_or_create("https://acme.example.com/directory", "ops@example.com").await.unwrap();

        let reg = AccountRegistration {
            private_key_pem: "irrelevant".to_string(),
            contact: vec!["mailto:ops@example.com".to_string()],
        };
        ks.save_registration("https://acme.example.com/directory", &reg).await.unwrap();

        let reloaded = ks.load_or_create("https://acme.example.com/directory", "ops@example.com").await.unwrap();
        assert!(reloaded.registration.is_some());
    }

    #[tokio::test]
    async fn rejects_malformed_server_url() {
        let dir = tempfile::tempdir().unwrap();
        let ks = AccountKeystore::new(dir.path());
        let err = ks.load_or_create("not a url", "ops@example.com").await.unwrap_err();
        assert_eq!(err.kind, admgr_core::ErrorKind::Config);
    }
}
