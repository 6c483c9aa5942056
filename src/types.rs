use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Process identifier handed out by the scheduler. Never reused.
pub type Pid = u32;

/// Milliseconds on the scheduler clock.
pub type Millis = u64;

/// Who a stop/pause/info request is aimed at.
///
/// Parsing follows the command surface: `all` (any case) is every script,
/// a positive integer is a pid, anything else is a script name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    Pid(Pid),
    Name(String),
    All,
}

impl Target {
    /// `None` means "every script".
    pub fn from_optional(raw: Option<&str>) -> Self {
        match raw {
            Some(s) => s.parse().unwrap_or(Target::All),
            None => Target::All,
        }
    }
}

impl FromStr for Target {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty target".to_string());
        }
        if s.eq_ignore_ascii_case("all") {
            return Ok(Target::All);
        }
        match s.parse::<Pid>() {
            Ok(pid) if pid > 0 => Ok(Target::Pid(pid)),
            _ => Ok(Target::Name(s.to_string())),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Pid(pid) => write!(f, "pid {pid}"),
            Target::Name(name) => write!(f, "'{name}'"),
            Target::All => f.write_str("all scripts"),
        }
    }
}

/// When queued event matches are handed to their callbacks.
///
/// - `OnResume`: the scheduler drains a thread's queue right before each
///   resume, so callbacks fire even if the script never asks (default).
/// - `Explicit`: callbacks only fire when the script drains its queue itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventDispatch {
    OnResume,
    Explicit,
}

impl Default for EventDispatch {
    fn default() -> Self {
        EventDispatch::OnResume
    }
}

impl FromStr for EventDispatch {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on_resume" | "onresume" => Ok(EventDispatch::OnResume),
            "explicit" => Ok(EventDispatch::Explicit),
            other => Err(format!(
                "invalid event_dispatch: {other} (expected \"on_resume\" or \"explicit\")"
            )),
        }
    }
}
