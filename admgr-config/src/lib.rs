//! YAML configuration loading, schema validation and CLI positional
//! argument parsing for acme-dns-manager.

pub mod config;
pub mod positional;
pub mod schema;

pub use config::{AutoCertConfig, Config};
pub use positional::parse_positional_args;
