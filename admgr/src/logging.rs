//! Subscriber installation for the four `--log-format` variants.
//!
//! Grounded on `tracing_subscriber::registry()...init()` as used
//! throughout the corpus (`pingclair/src/main.rs`,
//! `NiklasRosenstein-rise/rise-cli/src/main.rs`); `Emoji` is the one
//! variant without a stock `tracing_subscriber` formatter, implemented as
//! a small custom `FormatEvent`, its glyph choice matching the register of
//! Pingclair's own source comments (`🔐`, `✅`, `⚠️`, `❌` prefixes
//! throughout `pingclair-tls`).

use admgr_core::logging::{LogFormat, LogLevel};
use tracing_subscriber::EnvFilter;

/// Installs the global subscriber for the process. Call exactly once, at
/// the top of `main` — no component below `admgr` ever installs or
/// receives a logger (Design Notes: no module-level mutable logger
/// state).
pub fn init(format: LogFormat, level: LogLevel) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_tracing_level()));

    match format {
        LogFormat::Go => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(false)
                .compact()
                .init();
        }
        LogFormat::Ascii => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(true)
                .compact()
                .init();
        }
        LogFormat::Color => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(true)
                .with_target(true)
                .compact()
                .init();
        }
        LogFormat::Emoji => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_target(false)
                .event_format(EmojiFormatter)
                .init();
        }
    }
}

/// A `FormatEvent` that prefixes each line with a level glyph instead of
/// the bare level name, then falls back to the compact field layout for
/// everything else.
struct EmojiFormatter;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for EmojiFormatter
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let glyph = match *event.metadata().level() {
            tracing::Level::ERROR => "\u{274c}",
            tracing::Level::WARN => "\u{26a0}\u{fe0f}",
            tracing::Level::INFO => "\u{2705}",
            tracing::Level::DEBUG => "\u{1f50e}",
            tracing::Level::TRACE => "\u{1f50e}",
        };
        write!(writer, "{glyph} ")?;
        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
