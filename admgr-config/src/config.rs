//! `Config::load`: the five-step YAML → validated config pipeline.
//! Grounded on `pingclair-core::config::loader::ConfigLoader`'s
//! format-dispatch shape, collapsed to a single format since only YAML
//! is accepted.

use std::path::{Path, PathBuf};
use std::time::Duration;

use admgr_core::{Error, KeyType};

use crate::schema::{compiled_schema, RawConfig};

const DEFAULT_CERT_STORAGE_DIR: &str = ".lego";
const DEFAULT_CHALLENGE_TIMEOUT: Duration = Duration::from_secs(600);
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_GRACE_DAYS: u32 = 30;
const PLACEHOLDER_EMAIL: &str = "your-email@example.com";

#[derive(Debug, Clone)]
pub struct AutoCertConfig {
    pub name: String,
    pub domains: Vec<String>,
    pub key_type: KeyType,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub email: String,
    pub acme_server: String,
    pub acme_dns_server: String,
    pub default_key_type: KeyType,
    pub dns_resolver: Option<String>,
    pub cert_storage_path: PathBuf,
    pub challenge_timeout: Duration,
    pub http_timeout: Duration,
    pub grace_days: u32,
    /// Sorted by certificate name for deterministic processing order.
    pub auto_certs: Vec<AutoCertConfig>,
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let raw_text = std::fs::read_to_string(path)
            .map_err(|e| Error::config("config_load", format!("failed to read config file: {e}")).with_resource(path.display().to_string()))?;

        let yaml_value: serde_yaml::Value = serde_yaml::from_str(&raw_text)
            .map_err(|e| Error::config("config_parse", format!("invalid YAML: {e}")).with_resource(path.display().to_string()))?;

        let json_value = yaml_to_json(yaml_value);
        let schema = compiled_schema();
        if let Err(errors) = schema.validate(&json_value) {
            let messages: Vec<String> = errors
                .map(|e| format!("{} ({})", e, e.instance_path))
                .collect();
            return Err(Error::config("config_validate", format!("config does not match schema: {}", messages.join("; ")))
                .with_resource(path.display().to_string()));
        }

        let raw: RawConfig = serde_json::from_value(json_value)
            .map_err(|e| Error::config("config_parse", format!("failed to deserialize validated config: {e}")))?;

        Self::from_raw(raw, path)
    }

    fn from_raw(raw: RawConfig, config_path: &Path) -> Result<Self, Error> {
        if raw.email == PLACEHOLDER_EMAIL {
            return Err(Error::config("config_validate", "email is still the placeholder 'your-email@example.com'")
                .with_resource("email")
                .suggest("set 'email' to a real address you control"));
        }
        if !raw.email.contains('@') {
            return Err(Error::config("config_validate", format!("'{}' is not a valid email address", raw.email)).with_resource("email"));
        }

        let default_key_type = raw.key_type.unwrap_or_default();

        let cert_storage_path = resolve_cert_storage_path(raw.cert_storage_path.as_deref(), config_path);

        let grace_days = match &raw.auto_domains {
            Some(a) => a.grace_days.unwrap_or(DEFAULT_GRACE_DAYS),
            None => DEFAULT_GRACE_DAYS,
        };
        if grace_days < 1 {
            return Err(Error::config("config_validate", "auto_domains.grace_days must be >= 1").with_resource("auto_domains.grace_days"));
        }

        let mut auto_certs = Vec::new();
        if let Some(auto) = &raw.auto_domains {
            for (name, cert) in &auto.certs {
                if cert.domains.is_empty() {
                    return Err(Error::config(
                        "config_validate",
                        format!("auto_domains.certs.{name}.domains must be non-empty"),
                    )
                    .with_resource(format!("auto_domains.certs.{name}.domains")));
                }
                auto_certs.push(AutoCertConfig {
                    name: name.clone(),
                    domains: cert.domains.clone(),
                    key_type: cert.key_type.unwrap_or(default_key_type),
                });
            }
        }
        auto_certs.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(Self {
            email: raw.email,
            acme_server: raw.acme_server,
            acme_dns_server: raw.acme_dns_server,
            default_key_type,
            dns_resolver: raw.dns_resolver,
            cert_storage_path,
            challenge_timeout: raw.challenge_timeout.unwrap_or(DEFAULT_CHALLENGE_TIMEOUT),
            http_timeout: raw.http_timeout.unwrap_or(DEFAULT_HTTP_TIMEOUT),
            grace_days,
            auto_certs,
        })
    }

    /// A hand-written YAML template documenting every recognized key,
    /// emitted by `--print-config-template`. This is the one place in the
    /// workspace where comments-as-documentation are appropriate: the
    /// output itself *is* the documentation artifact.
    pub fn template() -> &'static str {
        r#"# acme-dns-manager configuration
# ACME account email. Required.
email: ops@example.com

# ACME directory URL (e.g. Let's Encrypt production or staging).
acme_server: https://acme-v02.api.letsencrypt.org/directory

# acme-dns server base URL used for DNS-01 delegation.
acme_dns_server: https://auth.acme-dns.io

# Default certificate key type: rsa2048, rsa3072, rsa4096, ec256, ec384.
# key_type: ec256

# Force a specific recursive resolver for CNAME verification, "host" or
# "host:port" (default port 53).
# dns_resolver: 127.0.0.1:53

# Where issued certificates and account state are stored, relative to
# this file if not absolute. Default: .lego
# cert_storage_path: .lego

# How long to wait for an ACME challenge to complete overall.
# challenge_timeout: 10m

# HTTP timeout for calls to the ACME server.
# http_timeout: 30s

# Auto mode: certificates managed from this file instead of CLI arguments.
auto_domains:
  grace_days: 30
  certs:
    web:
      domains:
        - example.com
        - www.example.com
      # key_type: ec256
"#
    }
}

fn resolve_cert_storage_path(configured: Option<&str>, config_path: &Path) -> PathBuf {
    let base = config_path.parent().unwrap_or_else(|| Path::new("."));
    match configured {
        Some(p) => {
            let path = Path::new(p);
            if path.is_absolute() {
                path.to_path_buf()
            } else {
                base.join(path)
            }
        }
        None => base.join(DEFAULT_CERT_STORAGE_DIR),
    }
}

fn yaml_to_json(value: serde_yaml::Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}
