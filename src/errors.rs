// src/errors.rs

//! Crate-wide error aliases and helpers.

use std::any::Any;
use std::path::PathBuf;

use thiserror::Error;

use crate::types::{Pid, Target};

#[derive(Error, Debug)]
pub enum PulseError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Start(#[from] StartError),

    #[error(transparent)]
    Event(#[from] EventError),

    #[error("No script matching {0}")]
    NotFound(Target),

    #[error("No running or paused scripts")]
    NothingToPause,

    #[error("Execution context of pid {0} has already terminated")]
    ContextTerminated(Pid),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Reasons a run request is refused before any script code executes.
#[derive(Error, Debug)]
pub enum StartError {
    #[error("script '{name}' is already running (pid {pid})")]
    DuplicateRunning { name: String, pid: Pid },

    #[error("could not find script '{script}' (searched {searched:?})")]
    ScriptNotFound {
        script: String,
        searched: Vec<PathBuf>,
    },

    #[error("failed to load {path:?}: {message}")]
    Load { path: PathBuf, message: String },

    #[error("process identifiers exhausted")]
    PidsExhausted,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EventError {
    #[error("invalid event pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A script step failed or panicked. Reported, never propagated past the
/// scheduler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct ScriptFault {
    pub message: String,
    pub context: Option<String>,
}

impl ScriptFault {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

/// An event callback returned an error while the queue was drained.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("event '{event}' callback failed: {message}")]
pub struct CallbackFault {
    pub event: String,
    pub message: String,
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PulseError>;
