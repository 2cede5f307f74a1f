//! Account sub-store: a single JSON file keyed by base domain.
//!
//! Generalizes `pingclair-tls/src/cert_store.rs`'s pattern (disk-backed
//! JSON + an in-memory cache guarded by a `tokio::sync::RwLock`) from a
//! single flat map to a store keyed on a domain's base with the
//! wildcard/apex sharing invariant.

use admgr_core::domain::base;
use admgr_core::{AcmeDnsAccount, Error};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::atomic::{ensure_dir, write_atomic};

const ACCOUNTS_FILE_MODE: u32 = 0o600;
const ACCOUNTS_DIR_MODE: u32 = 0o755;

/// Thread-safe, persistent store of acme-dns accounts keyed by base domain.
pub struct AccountStore {
    path: PathBuf,
    data: Arc<RwLock<BTreeMap<String, AcmeDnsAccount>>>,
}

impl AccountStore {
    /// Constructs a store rooted at `root/acme-dns-accounts.json`, loading
    /// any existing contents. An absent file is not an error (empty
    /// store); a zero-length file is not an error either.
    pub async fn load(root: &Path) -> Result<Self, Error> {
        let path = root.join("acme-dns-accounts.json");
        let data = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|e| {
                Error::storage("account_store_load", format!("invalid JSON: {e}"))
                    .with_resource(path.display().to_string())
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(
                    Error::storage("account_store_load", format!("failed to read: {e}"))
                        .with_resource(path.display().to_string()),
                )
            }
        };

        if let Some(warning) = crate::atomic::check_mode(&path, ACCOUNTS_FILE_MODE) {
            tracing::warn!(%warning, "account store file has loose permissions");
        }

        Ok(Self {
            path,
            data: Arc::new(RwLock::new(data)),
        })
    }

    /// Returns the record for `base(domain)`. If absent and `domain` is
    /// not itself a wildcard, falls back to `*.domain` for compatibility
    /// with legacy stores that only ever saw the wildcard form.
    pub async fn get(&self, domain: &str) -> Option<AcmeDnsAccount> {
        let key = base(domain);
        let data = self.data.read().await;
        if let Some(acc) = data.get(key) {
            return Some(acc.clone());
        }
        if !domain.starts_with("*.") {
            let wildcard_key = format!("*.{key}");
            if let Some(acc) = data.get(&wildcard_key) {
                return Some(acc.clone());
            }
        }
        None
    }

    /// Inserts `account` for `domain`, also writing the paired
    /// base/wildcard key so both resolve to the same record. Does not
    /// persist; call `save()` afterwards.
    pub async fn set(&self, domain: &str, account: AcmeDnsAccount) {
        let b = base(domain).to_string();
        let wildcard = format!("*.{b}");
        let mut data = self.data.write().await;
        data.insert(b, account.clone());
        data.insert(wildcard, account);
    }

    /// Serializes the store to disk with a stable key ordering (the
    /// `BTreeMap` already iterates in sorted order), via temp-file +
    /// fsync + rename, mode 0600. Holds the write lock for the full
    /// serialize+write+rename so no concurrent `set()` can interleave
    /// with what gets persisted.
    pub async fn save(&self) -> Result<(), Error> {
        if let Some(parent) = self.path.parent() {
            ensure_dir(parent, ACCOUNTS_DIR_MODE).await?;
        }
        let data = self.data.write().await;
        let json = serde_json::to_vec_pretty(&*data).map_err(|e| {
            Error::storage("account_store_save", format!("failed to serialize: {e}"))
                .with_resource(self.path.display().to_string())
        })?;
        write_atomic(&self.path, &json, ACCOUNTS_FILE_MODE).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(n: &str) -> AcmeDnsAccount {
        AcmeDnsAccount {
            username: format!("user-{n}"),
            password: format!("pass-{n}"),
            full_domain: format!("{n}.acme-dns.example"),
            sub_domain: n.to_string(),
            allow_from: vec![],
        }
    }

    #[tokio::test]
    async fn base_and_wildcard_resolve_to_same_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::load(dir.path()).await.unwrap();
        store.set("example.com", account("abc")).await;
        store.save().await.unwrap();

        let reloaded = AccountStore::load(dir.path()).await.unwrap();
        let a = reloaded.get("example.com").await.unwrap();
        let b = reloaded.get("*.example.com").await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn wildcard_insert_is_found_from_apex_lookup() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::load(dir.path()).await.unwrap();
        store.set("*.example.com", account("xyz")).await;
        store.save().await.unwrap();

        let reloaded = AccountStore::load(dir.path()).await.unwrap();
        assert!(reloaded.get("example.com").await.is_some());
    }

    #[tokio::test]
    async fn absent_file_is_empty_store_not_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::load(dir.path()).await.unwrap();
        assert!(store.get("example.com").await.is_none());
    }

    #[tokio::test]
    async fn file_mode_is_0600_after_save() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().unwrap();
        let store = AccountStore::load(dir.path()).await.unwrap();
        store.set("example.com", account("abc")).await;
        store.save().await.unwrap();

        let meta = std::fs::metadata(dir.path().join("acme-dns-accounts.json")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
