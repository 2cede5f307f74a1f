//! Config schema: a `schemars`-derived JSON Schema mirrors
//! `#[serde(deny_unknown_fields)]` into `"additionalProperties": false`,
//! so unknown keys at any level are a hard validation failure.
//!
//! Grounded on `NiklasRosenstein-rise`'s `schemars` derive usage and
//! `ShabbirHasan1-sentinel/crates/config`'s `jsonschema`-based validation
//! pipeline.

use std::collections::BTreeMap;

use admgr_core::KeyType;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub email: String,
    pub acme_server: String,
    pub acme_dns_server: String,
    #[serde(default)]
    pub key_type: Option<KeyType>,
    #[serde(default)]
    pub dns_resolver: Option<String>,
    #[serde(default)]
    pub cert_storage_path: Option<String>,
    #[serde(default, with = "humantime_serde::option")]
    #[schemars(with = "Option<String>")]
    pub challenge_timeout: Option<std::time::Duration>,
    #[serde(default, with = "humantime_serde::option")]
    #[schemars(with = "Option<String>")]
    pub http_timeout: Option<std::time::Duration>,
    #[serde(default)]
    pub auto_domains: Option<AutoDomains>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AutoDomains {
    #[serde(default)]
    pub grace_days: Option<u32>,
    #[serde(default)]
    pub certs: BTreeMap<String, AutoCert>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AutoCert {
    pub domains: Vec<String>,
    #[serde(default)]
    pub key_type: Option<KeyType>,
}

/// Compiles the schema once, for reuse across every `Config::load` call in
/// a process (schema compilation is not cheap; the schema itself never
/// changes at runtime).
pub fn compiled_schema() -> jsonschema::JSONSchema {
    let schema = schemars::schema_for!(RawConfig);
    let schema_json = serde_json::to_value(&schema).expect("derived schema always serializes");
    jsonschema::JSONSchema::compile(&schema_json).expect("derived schema always compiles")
}
