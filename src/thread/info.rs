// src/thread/info.rs

use std::fmt;
use std::str::FromStr;

use crate::types::{Millis, Pid};

/// Lifecycle status as shown in listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadStatus {
    Running,
    Paused,
    Exited,
    Errored,
}

impl ThreadStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ThreadStatus::Exited | ThreadStatus::Errored)
    }

    /// Default listing filter.
    pub const LIVE: [ThreadStatus; 2] = [ThreadStatus::Running, ThreadStatus::Paused];
}

impl fmt::Display for ThreadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ThreadStatus::Running => "RUNNING",
            ThreadStatus::Paused => "PAUSED",
            ThreadStatus::Exited => "EXITED",
            ThreadStatus::Errored => "ERRORED",
        };
        f.write_str(s)
    }
}

impl FromStr for ThreadStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "running" => Ok(ThreadStatus::Running),
            "paused" => Ok(ThreadStatus::Paused),
            "exited" => Ok(ThreadStatus::Exited),
            "errored" | "error" => Ok(ThreadStatus::Errored),
            other => Err(format!("invalid status: {other}")),
        }
    }
}

/// Introspection record for a script run. Outlives the thread itself until
/// garbage collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreadInfo {
    pub pid: Pid,
    pub name: String,
    pub path: String,
    pub arguments: Vec<String>,
    pub start_time: Millis,
    /// `None` while the thread is live.
    pub end_time: Option<Millis>,
    pub return_values: Vec<String>,
    pub status: ThreadStatus,
    pub error: Option<String>,
}

impl ThreadInfo {
    pub fn started(
        pid: Pid,
        name: impl Into<String>,
        path: impl Into<String>,
        arguments: Vec<String>,
        start_time: Millis,
    ) -> Self {
        Self {
            pid,
            name: name.into(),
            path: path.into(),
            arguments,
            start_time,
            end_time: None,
            return_values: Vec::new(),
            status: ThreadStatus::Running,
            error: None,
        }
    }

    pub fn is_live(&self) -> bool {
        self.end_time.is_none()
    }

    pub fn finish_exited(&mut self, at: Millis, return_values: Vec<String>) {
        self.end_time = Some(at);
        self.return_values = return_values;
        self.status = ThreadStatus::Exited;
    }

    pub fn finish_errored(&mut self, at: Millis, message: impl Into<String>) {
        self.end_time = Some(at);
        self.error = Some(message.into());
        self.status = ThreadStatus::Errored;
    }

    /// Arguments joined the way they were typed.
    pub fn argument_line(&self) -> String {
        self.arguments.join(" ")
    }
}
