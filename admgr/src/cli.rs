//! CLI surface.
//!
//! Grounded on `clap`'s derive API as used throughout the corpus
//! (`pingclair/src/main.rs`, `NiklasRosenstein-rise/rise-cli/src/main.rs`).
//! `admgr` is a flat, single-command batch utility (no subcommands): every
//! flag lives directly on `Cli`, plus the manual-mode
//! positional argument list.

use admgr_core::logging::{LogFormat, LogLevel};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "admgr", author, version, about = "Automated ACME DNS-01 certificate lifecycle manager", long_about = None)]
pub struct Cli {
    /// Path to the YAML configuration file.
    #[arg(long, default_value = "config.yaml")]
    pub config: String,

    /// Select auto mode: certificates come from `auto_domains` in the
    /// config file instead of positional arguments.
    #[arg(long)]
    pub auto: bool,

    /// Raise the log level floor from info to warn.
    #[arg(long)]
    pub quiet: bool,

    /// Emit a documented configuration template to stdout and exit.
    #[arg(long)]
    pub print_config_template: bool,

    /// Force debug-level logging.
    #[arg(long)]
    pub debug: bool,

    /// Explicit log level; wins over both --quiet and --debug.
    #[arg(long)]
    pub log_level: Option<LogLevel>,

    /// Log line format.
    #[arg(long, default_value = "go")]
    pub log_format: LogFormat,

    /// Manual-mode certificate requests, `name@d1,d2,.../key_type=T` or a
    /// bare domain. Mutually exclusive with `--auto`.
    pub requests: Vec<String>,
}

impl Cli {
    /// The effective log level, resolving `--log-level` > `--debug` >
    /// `--quiet` > the default; an explicit `--log-level` always wins
    /// over both.
    pub fn effective_log_level(&self) -> LogLevel {
        if let Some(level) = self.log_level {
            return level;
        }
        if self.debug {
            return LogLevel::Debug;
        }
        if self.quiet {
            return LogLevel::Warn;
        }
        LogLevel::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_precedence_is_explicit_then_debug_then_quiet() {
        let cli = Cli::parse_from(["admgr", "--quiet", "--debug"]);
        assert_eq!(cli.effective_log_level(), LogLevel::Debug);

        let cli = Cli::parse_from(["admgr", "--quiet"]);
        assert_eq!(cli.effective_log_level(), LogLevel::Warn);

        let cli = Cli::parse_from(["admgr", "--quiet", "--log-level", "debug"]);
        assert_eq!(cli.effective_log_level(), LogLevel::Debug);

        let cli = Cli::parse_from(["admgr"]);
        assert_eq!(cli.effective_log_level(), LogLevel::Info);
    }

    #[test]
    fn positional_requests_collect_in_order() {
        let cli = Cli::parse_from(["admgr", "web@example.com", "other.example.com"]);
        assert_eq!(cli.requests, vec!["web@example.com", "other.example.com"]);
    }
}
