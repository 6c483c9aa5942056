// src/config/validate.rs

use std::time::Duration;

use crate::config::model::{ConfigFile, HostSection, RawConfigFile, SchedulerSection};
use crate::errors::{PulseError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PulseError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        let scheduler = validate_scheduler(&raw)?;
        let host = validate_host(&raw)?;
        validate_scripts(&raw)?;
        Ok(ConfigFile::new_unchecked(scheduler, raw.scripts, host))
    }
}

fn validate_scheduler(cfg: &RawConfigFile) -> Result<SchedulerSection> {
    let s = &cfg.scheduler;

    if s.turbo == 0 {
        return Err(PulseError::ConfigError(
            "[scheduler].turbo must be >= 1 (got 0)".to_string(),
        ));
    }

    if s.event_queue_limit == Some(0) {
        return Err(PulseError::ConfigError(
            "[scheduler].event_queue_limit must be >= 1 when set (got 0)".to_string(),
        ));
    }

    let info_gc = parse_duration(&s.info_gc).map_err(|e| {
        PulseError::ConfigError(format!("[scheduler].info_gc is invalid: {e}"))
    })?;

    Ok(SchedulerSection {
        turbo: s.turbo,
        info_gc: (!info_gc.is_zero()).then_some(info_gc),
        event_dispatch: s.event_dispatch,
        event_queue_limit: s.event_queue_limit,
    })
}

fn validate_host(cfg: &RawConfigFile) -> Result<HostSection> {
    let pulse_interval = parse_duration(&cfg.host.pulse_interval).map_err(|e| {
        PulseError::ConfigError(format!("[host].pulse_interval is invalid: {e}"))
    })?;

    if pulse_interval.is_zero() {
        return Err(PulseError::ConfigError(
            "[host].pulse_interval must be greater than zero".to_string(),
        ));
    }

    Ok(HostSection {
        pulse_interval,
        squelch_status: cfg.host.squelch_status,
    })
}

fn validate_scripts(cfg: &RawConfigFile) -> Result<()> {
    let ext = cfg.scripts.extension.trim().trim_start_matches('.');
    if ext.is_empty() {
        return Err(PulseError::ConfigError(
            "[scripts].extension must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Parse durations like `"250ms"`, `"3s"`, `"1m"`, `"2h"`. A bare number is
/// milliseconds.
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration string".to_string());
    }

    let idx = s.chars().position(|c| !c.is_ascii_digit()).unwrap_or(s.len());
    let (num_part, unit_part) = s.split_at(idx);
    if num_part.is_empty() {
        return Err(format!("duration '{s}' must start with a number"));
    }

    let value: u64 = num_part
        .parse()
        .map_err(|e| format!("invalid duration number '{num_part}': {e}"))?;
    let unit = unit_part.trim().to_lowercase();

    let secs = |mult: u64| {
        value
            .checked_mul(mult)
            .map(Duration::from_secs)
            .ok_or_else(|| format!("duration '{s}' is too large"))
    };

    match unit.as_str() {
        "" | "ms" => Ok(Duration::from_millis(value)),
        "s" => secs(1),
        "m" => secs(60),
        "h" => secs(60 * 60),
        _ => Err(format!(
            "unsupported duration unit '{unit}'; expected ms, s, m, or h"
        )),
    }
}
