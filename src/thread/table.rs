// src/thread/table.rs

use std::collections::BTreeMap;

use tracing::debug;

use crate::thread::info::{ThreadInfo, ThreadStatus};
use crate::types::{Millis, Pid, Target};

/// Every known script run, live or finished, keyed by pid.
#[derive(Debug, Default)]
pub struct ProcessTable {
    entries: BTreeMap<Pid, ThreadInfo>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, info: ThreadInfo) {
        self.entries.insert(info.pid, info);
    }

    pub fn remove(&mut self, pid: Pid) -> Option<ThreadInfo> {
        self.entries.remove(&pid)
    }

    pub fn get_pid(&self, pid: Pid) -> Option<&ThreadInfo> {
        self.entries.get(&pid)
    }

    pub fn get_pid_mut(&mut self, pid: Pid) -> Option<&mut ThreadInfo> {
        self.entries.get_mut(&pid)
    }

    /// Look up by pid or name. A name resolves to its most recent pid;
    /// `Target::All` resolves to the most recently finished run.
    pub fn get(&self, target: &Target) -> Option<&ThreadInfo> {
        match target {
            Target::Pid(pid) => self.entries.get(pid),
            Target::Name(name) => self.entries.values().rev().find(|i| &i.name == name),
            Target::All => self.last_finished(),
        }
    }

    /// Entries whose status is in `filter` (default: running or paused),
    /// ordered by pid.
    pub fn list(&self, filter: Option<&[ThreadStatus]>) -> Vec<ThreadInfo> {
        let filter = filter.unwrap_or(&ThreadStatus::LIVE);
        self.entries
            .values()
            .filter(|i| filter.contains(&i.status))
            .cloned()
            .collect()
    }

    pub fn find_by_path(&self, path: &str) -> Option<&ThreadInfo> {
        self.entries.values().find(|i| i.path == path)
    }

    /// The ended entry that started most recently.
    pub fn last_finished(&self) -> Option<&ThreadInfo> {
        self.entries
            .values()
            .filter(|i| i.end_time.is_some())
            .max_by_key(|i| (i.start_time, i.pid))
    }

    /// Drop ended entries whose `end_time + retention <= now`. Returns the
    /// removed pids.
    pub fn garbage_collect(&mut self, now: Millis, retention: Millis) -> Vec<Pid> {
        let expired: Vec<Pid> = self
            .entries
            .values()
            .filter(|i| i.status.is_terminal())
            .filter(|i| match i.end_time {
                Some(end) => end.saturating_add(retention) <= now,
                None => false,
            })
            .map(|i| i.pid)
            .collect();

        for pid in &expired {
            self.entries.remove(pid);
        }
        if !expired.is_empty() {
            debug!(removed = ?expired, "collected finished process entries");
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ThreadInfo> {
        self.entries.values()
    }
}
