//! `AcmeDnsAccount` — credentials returned by acme-dns `/register`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcmeDnsAccount {
    pub username: String,
    pub password: String,
    #[serde(rename = "fulldomain")]
    pub full_domain: String,
    #[serde(rename = "subdomain")]
    pub sub_domain: String,
    #[serde(rename = "allowfrom", default)]
    pub allow_from: Vec<String>,
}
