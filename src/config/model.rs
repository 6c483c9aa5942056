// src/config/model.rs

use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::types::EventDispatch;

/// Configuration as read from TOML, before validation.
///
/// ```toml
/// [scheduler]
/// turbo = 500
/// info_gc = "1h"
/// event_dispatch = "on_resume"
///
/// [scripts]
/// dir = "scripts"
/// search_paths = ["shared"]
/// extension = "step"
///
/// [host]
/// pulse_interval = "50ms"
/// squelch_status = false
/// ```
///
/// All sections are optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfigFile {
    #[serde(default)]
    pub scheduler: RawSchedulerSection,

    #[serde(default)]
    pub scripts: ScriptsSection,

    #[serde(default)]
    pub host: RawHostSection,
}

/// `[scheduler]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawSchedulerSection {
    /// Steps each thread may run per tick.
    #[serde(default = "default_turbo")]
    pub turbo: u32,

    /// How long finished entries stay in the process table. `"0"` keeps
    /// them forever.
    #[serde(default = "default_info_gc")]
    pub info_gc: String,

    #[serde(default)]
    pub event_dispatch: EventDispatch,

    /// Optional cap on each thread's pending event queue.
    #[serde(default)]
    pub event_queue_limit: Option<usize>,
}

fn default_turbo() -> u32 {
    500
}

fn default_info_gc() -> String {
    "1h".to_string()
}

impl Default for RawSchedulerSection {
    fn default() -> Self {
        Self {
            turbo: default_turbo(),
            info_gc: default_info_gc(),
            event_dispatch: EventDispatch::default(),
            event_queue_limit: None,
        }
    }
}

/// `[scripts]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScriptsSection {
    /// Primary script directory, searched first.
    #[serde(default = "default_script_dir")]
    pub dir: PathBuf,

    /// Extra directories searched after `dir`.
    #[serde(default)]
    pub search_paths: Vec<PathBuf>,

    /// Appended to script names given without one.
    #[serde(default = "default_extension")]
    pub extension: String,
}

fn default_script_dir() -> PathBuf {
    PathBuf::from("scripts")
}

fn default_extension() -> String {
    "step".to_string()
}

impl Default for ScriptsSection {
    fn default() -> Self {
        Self {
            dir: default_script_dir(),
            search_paths: Vec::new(),
            extension: default_extension(),
        }
    }
}

impl ScriptsSection {
    /// `dir` followed by `search_paths`.
    pub fn all_search_paths(&self) -> Vec<PathBuf> {
        let mut paths = vec![self.dir.clone()];
        paths.extend(self.search_paths.iter().cloned());
        paths
    }
}

/// `[host]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawHostSection {
    #[serde(default = "default_pulse_interval")]
    pub pulse_interval: String,

    /// Hide start/stop/pause chatter.
    #[serde(default)]
    pub squelch_status: bool,
}

fn default_pulse_interval() -> String {
    "50ms".to_string()
}

impl Default for RawHostSection {
    fn default() -> Self {
        Self {
            pulse_interval: default_pulse_interval(),
            squelch_status: false,
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub scheduler: SchedulerSection,
    pub scripts: ScriptsSection,
    pub host: HostSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerSection {
    pub turbo: u32,
    /// `None` disables collection.
    pub info_gc: Option<Duration>,
    pub event_dispatch: EventDispatch,
    pub event_queue_limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostSection {
    pub pulse_interval: Duration,
    pub squelch_status: bool,
}

impl ConfigFile {
    /// Build without validation. Use `TryFrom<RawConfigFile>` instead.
    pub(crate) fn new_unchecked(
        scheduler: SchedulerSection,
        scripts: ScriptsSection,
        host: HostSection,
    ) -> Self {
        Self {
            scheduler,
            scripts,
            host,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSection {
                turbo: default_turbo(),
                info_gc: Some(Duration::from_secs(60 * 60)),
                event_dispatch: EventDispatch::default(),
                event_queue_limit: None,
            },
            scripts: ScriptsSection::default(),
            host: HostSection {
                pulse_interval: Duration::from_millis(50),
                squelch_status: false,
            },
        }
    }
}
