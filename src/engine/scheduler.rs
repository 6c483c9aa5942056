// src/engine/scheduler.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::config::ConfigFile;
use crate::engine::status::{StatusEvent, StatusKind};
use crate::engine::tick::TickReport;
use crate::errors::{PulseError, Result, StartError};
use crate::exec::{ControlRequest, Script, ScriptLoader};
use crate::thread::{
    ProcessTable, ResumeOutcome, ScriptThread, ThreadInfo, ThreadOutcome, ThreadStatus,
};
use crate::types::{EventDispatch, Millis, Pid, Target};

/// Name and table path used for inline `parse` scripts.
pub const PARSE_NAME: &str = "parse";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerOptions {
    /// Steps per thread per tick.
    pub turbo: u32,
    /// Retention for finished process entries; `None` keeps them.
    pub info_gc: Option<Millis>,
    pub dispatch: EventDispatch,
    pub event_queue_limit: Option<usize>,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            turbo: 500,
            info_gc: Some(60 * 60 * 1000),
            dispatch: EventDispatch::OnResume,
            event_queue_limit: None,
        }
    }
}

impl SchedulerOptions {
    pub fn from_config(cfg: &ConfigFile) -> Self {
        Self {
            turbo: cfg.scheduler.turbo,
            info_gc: cfg.scheduler.info_gc.map(|d| d.as_millis() as Millis),
            dispatch: cfg.scheduler.event_dispatch,
            event_queue_limit: cfg.scheduler.event_queue_limit,
        }
    }
}

/// Owns every live script thread and the process table, and drives them one
/// tick at a time.
///
/// Threads are kept in pid order, which is also start order, so a tick
/// services them in the order they were started.
pub struct Scheduler {
    threads: BTreeMap<Pid, ScriptThread>,
    table: ProcessTable,
    next_pid: Pid,
    options: SchedulerOptions,
    clock: Arc<dyn Clock>,
    loader: Box<dyn ScriptLoader>,
    search_paths: Vec<PathBuf>,
    status: Vec<StatusEvent>,
    last_gc: Millis,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("threads", &self.threads.keys().collect::<Vec<_>>())
            .field("table", &self.table.len())
            .field("next_pid", &self.next_pid)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Scheduler {
    pub fn new(
        options: SchedulerOptions,
        clock: Arc<dyn Clock>,
        loader: Box<dyn ScriptLoader>,
        search_paths: Vec<PathBuf>,
    ) -> Self {
        let last_gc = clock.now_millis();
        Self {
            threads: BTreeMap::new(),
            table: ProcessTable::new(),
            next_pid: 1,
            options,
            clock,
            loader,
            search_paths,
            status: Vec::new(),
            last_gc,
        }
    }

    pub fn options(&self) -> &SchedulerOptions {
        &self.options
    }

    pub fn set_turbo(&mut self, turbo: u32) {
        self.options.turbo = turbo.max(1);
        info!(turbo = self.options.turbo, "turbo updated");
    }

    pub fn search_paths(&self) -> &[PathBuf] {
        &self.search_paths
    }

    pub fn table(&self) -> &ProcessTable {
        &self.table
    }

    pub fn thread(&self, pid: Pid) -> Option<&ScriptThread> {
        self.threads.get(&pid)
    }

    /// Pids of threads still in the live set, in service order.
    pub fn live_pids(&self) -> Vec<Pid> {
        self.threads.keys().copied().collect()
    }

    /// No live threads left.
    pub fn is_idle(&self) -> bool {
        self.threads.is_empty()
    }

    /// Take the status lines produced since the last call.
    pub fn drain_status(&mut self) -> Vec<StatusEvent> {
        std::mem::take(&mut self.status)
    }

    pub fn list(&self, filter: Option<&[ThreadStatus]>) -> Vec<ThreadInfo> {
        self.table.list(filter)
    }

    pub fn info(&self, target: &Target) -> Option<&ThreadInfo> {
        self.table.get(target)
    }

    /// Start `identity` using the configured search paths.
    pub fn run(&mut self, identity: &str, args: Vec<String>) -> Result<Pid> {
        let paths = self.search_paths.clone();
        self.start(identity, &paths, args)
    }

    /// Resolve, load and start a script file, then run its first resume.
    pub fn start(
        &mut self,
        identity: &str,
        search_paths: &[PathBuf],
        args: Vec<String>,
    ) -> Result<Pid> {
        let path = self.loader.resolve(identity, search_paths)?;
        let label = path.display().to_string();
        self.reject_live(&label)?;

        let script = self.loader.load(&path)?;
        self.forget_finished(&label);
        self.launch(identity, &label, script, args)
    }

    /// Start an in-process script under `label`, which plays the role of
    /// the path for duplicate detection.
    pub fn start_script(
        &mut self,
        name: &str,
        label: &str,
        script: Box<dyn Script>,
        args: Vec<String>,
    ) -> Result<Pid> {
        self.reject_live(label)?;
        self.forget_finished(label);
        self.launch(name, label, script, args)
    }

    /// Run inline source. Only one parse thread may be live; the entry of a
    /// finished one is replaced.
    pub fn parse(&mut self, source: &str) -> Result<Pid> {
        self.reject_live(PARSE_NAME)?;
        let script = self.loader.load_source(PARSE_NAME, source)?;
        self.forget_finished(PARSE_NAME);
        self.launch(PARSE_NAME, PARSE_NAME, script, Vec::new())
    }

    /// A path has at most one table entry; refuse it while that entry is
    /// live.
    fn reject_live(&self, label: &str) -> Result<()> {
        match self.table.find_by_path(label) {
            Some(info) if info.is_live() => Err(StartError::DuplicateRunning {
                name: info.name.clone(),
                pid: info.pid,
            }
            .into()),
            _ => Ok(()),
        }
    }

    /// Forget finished runs of `label`. Called once the replacement has
    /// loaded, so a failed restart keeps the previous entry.
    fn forget_finished(&mut self, label: &str) {
        let stale: Vec<Pid> = self
            .table
            .iter()
            .filter(|i| i.path == label && !i.is_live())
            .map(|i| i.pid)
            .collect();

        for pid in stale {
            debug!(pid, path = %label, "replacing finished process entry");
            self.table.remove(pid);
        }
    }

    fn allocate_pid(&mut self) -> Result<Pid> {
        let pid = self.next_pid;
        self.next_pid = pid.checked_add(1).ok_or(StartError::PidsExhausted)?;
        Ok(pid)
    }

    fn launch(
        &mut self,
        name: &str,
        label: &str,
        script: Box<dyn Script>,
        args: Vec<String>,
    ) -> Result<Pid> {
        let pid = self.allocate_pid()?;
        let now = self.clock.now_millis();

        let thread = ScriptThread::new(
            pid,
            name,
            label,
            args.clone(),
            script,
            self.options.event_queue_limit,
        );
        self.threads.insert(pid, thread);
        self.table
            .insert(ThreadInfo::started(pid, name, label, args, now));

        info!(pid, script = %name, path = %label, "script started");
        self.status.push(StatusEvent::for_thread(
            pid,
            name,
            StatusKind::Started,
            format!("Running script '{name}' with pid {pid}"),
        ));

        self.resume_thread(pid, now);
        Ok(pid)
    }

    /// One heartbeat: resume every eligible thread in pid order, then reap
    /// finished and stopped threads and run the periodic table cleanup.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now_millis();
        let mut report = TickReport::new(now);

        let snapshot: Vec<Pid> = self.threads.keys().copied().collect();
        for pid in snapshot {
            if self.resume_thread(pid, now) {
                report.resumed.push(pid);
            }
        }

        report.reaped = self.sweep(now);
        report.collected = self.maybe_collect(now);

        if !report.is_quiet() {
            debug!(
                resumed = report.resumed.len(),
                reaped = ?report.reaped,
                collected = ?report.collected,
                "tick complete"
            );
        }
        report
    }

    /// Resume `pid` if it is eligible. Returns whether it ran.
    fn resume_thread(&mut self, pid: Pid, now: Millis) -> bool {
        let mut requests = Vec::new();

        let outcome = {
            let Some(thread) = self.threads.get_mut(&pid) else {
                return false;
            };
            if !thread.is_active() {
                return false;
            }
            thread.begin_tick(self.options.turbo);
            if self.options.dispatch == EventDispatch::OnResume {
                if let Err(e) = thread.dispatch_events(now, &mut self.status, &mut requests) {
                    warn!(pid, error = %e, "event dispatch failed");
                }
            }
            match thread.poll_eligible(now) {
                Ok(true) => Some(thread.resume(now, &mut self.status, &mut requests)),
                Ok(false) => None,
                Err(fault) => Some(Ok(ResumeOutcome::Finished(ThreadOutcome::Errored(fault)))),
            }
        };

        let Some(outcome) = outcome else {
            self.apply_requests(requests);
            return false;
        };

        match outcome {
            Ok(ResumeOutcome::Suspended) => {}
            Ok(ResumeOutcome::Finished(outcome)) => self.record_outcome(pid, outcome, now),
            Err(e) => warn!(pid, error = %e, "resume failed"),
        }

        self.apply_requests(requests);
        true
    }

    fn apply_requests(&mut self, requests: Vec<ControlRequest>) {
        for request in requests {
            let result = match &request {
                ControlRequest::Stop(target) => self.stop(target).map(|_| ()),
                ControlRequest::Pause(target) => self.pause(target).map(|_| ()),
                ControlRequest::Run { script, args } => self.run(script, args.clone()).map(|_| ()),
            };
            if let Err(e) = result {
                warn!(?request, error = %e, "script request failed");
                self.status.push(StatusEvent::notice(e.to_string()));
            }
        }
    }

    /// Finalize the process entry for a thread that ended.
    fn record_outcome(&mut self, pid: Pid, outcome: ThreadOutcome, now: Millis) {
        let Some(info) = self.table.get_pid_mut(pid) else {
            return;
        };
        let name = info.name.clone();

        match outcome {
            ThreadOutcome::Exited(values) => {
                info!(pid, script = %name, ?values, "script ended");
                let message = if values.is_empty() {
                    format!("Ending script '{name}' with pid {pid}")
                } else {
                    format!(
                        "Ending script '{name}' with pid {pid} and return values: {}",
                        values.join(", ")
                    )
                };
                info.finish_exited(now, values);
                self.status
                    .push(StatusEvent::for_thread(pid, &name, StatusKind::Ended, message));
            }
            ThreadOutcome::Stopped => {
                info!(pid, script = %name, "script stopped");
                info.finish_exited(now, Vec::new());
                self.status.push(StatusEvent::for_thread(
                    pid,
                    &name,
                    StatusKind::Ended,
                    format!("Ended script '{name}' with pid {pid}"),
                ));
            }
            ThreadOutcome::Errored(fault) => {
                let detail = match &fault.context {
                    Some(ctx) => format!("{} ({ctx})", fault.message),
                    None => fault.message.clone(),
                };
                info.finish_errored(now, detail.clone());
                self.status.push(StatusEvent::for_thread(
                    pid,
                    &name,
                    StatusKind::Errored,
                    format!("Script '{name}' (pid {pid}) ended with an error: {detail}"),
                ));
            }
        }
    }

    /// Remove terminated and stopped threads from the live set.
    fn sweep(&mut self, now: Millis) -> Vec<Pid> {
        let mut stopped = Vec::new();
        let mut reaped = Vec::new();

        self.threads.retain(|pid, thread| {
            if thread.is_terminated() {
                reaped.push(*pid);
                false
            } else if thread.is_abandoned() {
                thread.terminate();
                stopped.push(*pid);
                reaped.push(*pid);
                false
            } else {
                true
            }
        });

        for pid in stopped {
            self.record_outcome(pid, ThreadOutcome::Stopped, now);
        }
        reaped
    }

    fn maybe_collect(&mut self, now: Millis) -> Vec<Pid> {
        let Some(retention) = self.options.info_gc else {
            return Vec::new();
        };
        if now.saturating_sub(self.last_gc) < retention {
            return Vec::new();
        }
        self.last_gc = now;
        self.table.garbage_collect(now, retention)
    }

    /// Collect finished entries past retention right away.
    pub fn collect_garbage(&mut self) -> Vec<Pid> {
        let now = self.clock.now_millis();
        let Some(retention) = self.options.info_gc else {
            return Vec::new();
        };
        self.last_gc = now;
        self.table.garbage_collect(now, retention)
    }

    /// Feed one line of host text to every thread that is not paused.
    /// Returns the number of matches queued.
    pub fn on_text_line(&mut self, line: &str) -> usize {
        self.threads
            .values_mut()
            .map(|thread| thread.feed(line))
            .sum()
    }

    /// Pids an active-thread request resolves to. A name picks the oldest
    /// live thread with that name.
    fn resolve_active(&self, target: &Target) -> Vec<Pid> {
        let mut active = self.threads.values().filter(|t| t.is_active());
        match target {
            Target::Pid(pid) => active
                .find(|t| t.pid() == *pid)
                .map(|t| t.pid())
                .into_iter()
                .collect(),
            Target::Name(name) => active
                .find(|t| t.name() == name)
                .map(|t| t.pid())
                .into_iter()
                .collect(),
            Target::All => active.map(|t| t.pid()).collect(),
        }
    }

    /// Stop a thread, or every thread for `Target::All`. The thread runs no
    /// further steps and is reaped at the end of the current or next tick.
    pub fn stop(&mut self, target: &Target) -> Result<Vec<Pid>> {
        if *target == Target::All {
            return Ok(self.stop_all());
        }
        let pids = self.resolve_active(target);
        if pids.is_empty() {
            return Err(PulseError::NotFound(target.clone()));
        }
        for pid in &pids {
            self.abandon(*pid);
        }
        Ok(pids)
    }

    /// Stop every live thread. Calling it again is a no-op.
    pub fn stop_all(&mut self) -> Vec<Pid> {
        let pids = self.resolve_active(&Target::All);
        for pid in &pids {
            self.abandon(*pid);
        }
        if !pids.is_empty() {
            info!(count = pids.len(), "stopping all scripts");
        }
        pids
    }

    fn abandon(&mut self, pid: Pid) {
        if let Some(thread) = self.threads.get_mut(&pid) {
            thread.abandon();
            let name = thread.name().to_string();
            debug!(pid, script = %name, "script marked for stopping");
            self.status.push(StatusEvent::for_thread(
                pid,
                &name,
                StatusKind::Stopping,
                format!("Ending script '{name}' with pid {pid}"),
            ));
        }
    }

    /// Toggle pause on one thread, or apply the all-threads policy for
    /// `Target::All`. Returns the pids whose state changed.
    pub fn pause(&mut self, target: &Target) -> Result<Vec<Pid>> {
        if *target == Target::All {
            return self.toggle_all();
        }
        let pids = self.resolve_active(target);
        let Some(&pid) = pids.first() else {
            return Err(PulseError::NotFound(target.clone()));
        };
        self.set_paused(pid, None);
        Ok(vec![pid])
    }

    /// If anything is running, pause everything that runs; otherwise resume
    /// everything paused.
    pub fn toggle_all(&mut self) -> Result<Vec<Pid>> {
        let active = self.resolve_active(&Target::All);
        if active.is_empty() {
            return Err(PulseError::NothingToPause);
        }

        let running: Vec<Pid> = active
            .iter()
            .copied()
            .filter(|pid| {
                self.threads
                    .get(pid)
                    .is_some_and(|t| !t.state().is_paused())
            })
            .collect();

        let (pids, pause) = if running.is_empty() {
            (active, false)
        } else {
            (running, true)
        };
        for pid in &pids {
            self.set_paused(*pid, Some(pause));
        }
        info!(count = pids.len(), paused = pause, "toggled all scripts");
        Ok(pids)
    }

    /// `None` flips the current state.
    fn set_paused(&mut self, pid: Pid, pause: Option<bool>) {
        let Some(thread) = self.threads.get_mut(&pid) else {
            return;
        };
        let now_paused = match pause {
            Some(true) => {
                thread.state_mut().pause();
                true
            }
            Some(false) => {
                thread.state_mut().resume();
                false
            }
            None => thread.state_mut().toggle_pause(),
        };
        let name = thread.name().to_string();

        if let Some(info) = self.table.get_pid_mut(pid) {
            info.status = if now_paused {
                ThreadStatus::Paused
            } else {
                ThreadStatus::Running
            };
        }

        let (kind, verb) = if now_paused {
            (StatusKind::Paused, "Paused")
        } else {
            (StatusKind::Resumed, "Resumed")
        };
        debug!(pid, script = %name, paused = now_paused, "pause toggled");
        self.status.push(StatusEvent::for_thread(
            pid,
            &name,
            kind,
            format!("{verb} script '{name}' with pid {pid}"),
        ));
    }
}
