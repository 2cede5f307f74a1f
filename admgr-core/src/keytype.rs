//! Certificate/account key types.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Key type requested for an *issued certificate*. The ACME account key is
/// always EC P-384 regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum KeyType {
    Rsa2048,
    Rsa3072,
    Rsa4096,
    Ec256,
    #[serde(rename = "ec384")]
    Ec384,
}

impl Default for KeyType {
    fn default() -> Self {
        KeyType::Ec256
    }
}

impl std::str::FromStr for KeyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsa2048" => Ok(KeyType::Rsa2048),
            "rsa3072" => Ok(KeyType::Rsa3072),
            "rsa4096" => Ok(KeyType::Rsa4096),
            "ec256" => Ok(KeyType::Ec256),
            "ec384" => Ok(KeyType::Ec384),
            other => Err(format!(
                "unknown key type '{other}' (expected one of rsa2048, rsa3072, rsa4096, ec256, ec384)"
            )),
        }
    }
}

impl std::fmt::Display for KeyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            KeyType::Rsa2048 => "rsa2048",
            KeyType::Rsa3072 => "rsa3072",
            KeyType::Rsa4096 => "rsa4096",
            KeyType::Ec256 => "ec256",
            KeyType::Ec384 => "ec384",
        };
        write!(f, "{s}")
    }
}
