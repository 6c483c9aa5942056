// src/engine/status.rs

use std::fmt;

use crate::types::Pid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Started,
    Ended,
    Errored,
    Paused,
    Resumed,
    Stopping,
    /// Text printed by a script.
    Output,
    /// A request from a script or the host could not be carried out.
    Notice,
}

/// Lifecycle line for the host to show the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEvent {
    pub pid: Option<Pid>,
    pub name: String,
    pub kind: StatusKind,
    pub message: String,
}

impl StatusEvent {
    pub fn new(pid: Option<Pid>, name: &str, kind: StatusKind, message: impl Into<String>) -> Self {
        Self {
            pid,
            name: name.to_string(),
            kind,
            message: message.into(),
        }
    }

    pub fn for_thread(pid: Pid, name: &str, kind: StatusKind, message: impl Into<String>) -> Self {
        Self::new(Some(pid), name, kind, message)
    }

    pub fn notice(message: impl Into<String>) -> Self {
        Self::new(None, "", StatusKind::Notice, message)
    }

    /// Lifecycle chatter the host may hide. Errors, notices and script
    /// output are always shown.
    pub fn is_squelchable(&self) -> bool {
        matches!(
            self.kind,
            StatusKind::Started
                | StatusKind::Ended
                | StatusKind::Paused
                | StatusKind::Resumed
                | StatusKind::Stopping
        )
    }
}

impl fmt::Display for StatusEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.kind, self.pid) {
            (StatusKind::Output, Some(pid)) => write!(f, "[{}:{}] {}", self.name, pid, self.message),
            _ => f.write_str(&self.message),
        }
    }
}
