// src/logging.rs

//! Logging setup using `tracing` + `tracing-subscriber`.
//!
//! The filter comes from, in order:
//! 1. `--log-level` on the command line, applied to every target;
//! 2. `SCRIPTPULSE_LOG`, read as `EnvFilter` directives, so
//!    `SCRIPTPULSE_LOG=warn,scripting=debug` quiets the scheduler but keeps
//!    script chatter;
//! 3. `info`.
//!
//! Logs go to STDERR; STDOUT carries status lines and script output.

use anyhow::Result;
use tracing_subscriber::{EnvFilter, fmt};

use crate::cli::LogLevel;

pub const LOG_ENV: &str = "SCRIPTPULSE_LOG";

/// Install the global subscriber. Call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV).ok().as_deref());

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install log subscriber: {e}"))?;

    Ok(())
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> EnvFilter {
    if let Some(level) = cli_level {
        return EnvFilter::new(level_directive(level_from_log_level(level)));
    }
    let Some(raw) = env.map(str::trim).filter(|s| !s.is_empty()) else {
        return EnvFilter::new("info");
    };
    match parse_level_str(raw) {
        Some(level) => EnvFilter::new(level_directive(level)),
        None => EnvFilter::try_new(raw).unwrap_or_else(|e| {
            eprintln!("ignoring invalid {LOG_ENV}={raw:?}: {e}");
            EnvFilter::new("info")
        }),
    }
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn level_directive(level: tracing::Level) -> String {
    level.as_str().to_ascii_lowercase()
}

/// Parse a bare level name (`warning` is accepted for `warn`).
pub fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_level_wins_over_env() {
        let filter = build_filter(Some(LogLevel::Debug), Some("error"));
        assert!(filter.to_string().contains("debug"));
    }

    #[test]
    fn env_directives_are_used_verbatim() {
        let filter = build_filter(None, Some("warn,scripting=debug"));
        let rendered = filter.to_string();
        assert!(rendered.contains("scripting=debug"));
        assert!(rendered.contains("warn"));
    }

    #[test]
    fn bare_level_names_are_normalized() {
        assert!(build_filter(None, Some("Warning")).to_string().contains("warn"));
    }

    #[test]
    fn missing_or_blank_env_defaults_to_info() {
        assert!(build_filter(None, None).to_string().contains("info"));
        assert!(build_filter(None, Some("  ")).to_string().contains("info"));
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level_str("Warning"), Some(tracing::Level::WARN));
        assert_eq!(parse_level_str("TRACE"), Some(tracing::Level::TRACE));
        assert_eq!(parse_level_str("loud"), None);
    }
}
