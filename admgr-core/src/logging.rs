//! Log format and level selection for `--log-format`/`--log-level`.
//!
//! No component below the binary crate takes a logger parameter — per the
//! Design Notes' re-architecture flag against a global mutable logger,
//! every component just calls `tracing::info!`/`warn!`/`error!` directly,
//! and only `admgr`'s `main.rs` installs a subscriber. `LogFormat` lives
//! here so the CLI layer and the subscriber-construction code agree on the
//! same four variants without a circular dependency.

use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Compact, no ANSI, fields inline — approximates the plain formatter
    /// of the original Go logger.
    #[default]
    Go,
    /// Level-glyph prefixed lines (matches the register of Pingclair's
    /// own source comments).
    Emoji,
    /// ANSI-colored compact formatter.
    Color,
    /// Compact, no color, no emoji.
    Ascii,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "go" => Ok(LogFormat::Go),
            "emoji" => Ok(LogFormat::Emoji),
            "color" => Ok(LogFormat::Color),
            "ascii" => Ok(LogFormat::Ascii),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl LogLevel {
    pub fn as_tracing_level(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}
