// src/thread/script_thread.rs

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use tracing::{debug, error, trace};

use crate::engine::status::StatusEvent;
use crate::errors::{PulseError, Result, ScriptFault, panic_message};
use crate::events::processor::EventProcessor;
use crate::exec::{ControlRequest, Script, ScriptContext, Step};
use crate::thread::budget::StepBudget;
use crate::thread::info::ThreadStatus;
use crate::thread::state::ExecutionState;
use crate::types::{Millis, Pid};

/// How a thread ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ThreadOutcome {
    Exited(Vec<String>),
    Errored(ScriptFault),
    /// Stopped from outside (or by itself) before finishing.
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeOutcome {
    /// Still alive; yielded, waiting, or out of budget.
    Suspended,
    Finished(ThreadOutcome),
}

/// One live script instance.
pub struct ScriptThread {
    pid: Pid,
    name: String,
    path: String,
    args: Vec<String>,
    budget: StepBudget,
    state: ExecutionState,
    events: EventProcessor,
    script: Option<Box<dyn Script>>,
    abandoned: bool,
}

impl std::fmt::Debug for ScriptThread {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptThread")
            .field("pid", &self.pid)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("budget", &self.budget)
            .field("events", &self.events.len())
            .field("terminated", &self.script.is_none())
            .field("abandoned", &self.abandoned)
            .finish()
    }
}

impl ScriptThread {
    pub fn new(
        pid: Pid,
        name: impl Into<String>,
        path: impl Into<String>,
        args: Vec<String>,
        script: Box<dyn Script>,
        queue_limit: Option<usize>,
    ) -> Self {
        Self {
            pid,
            name: name.into(),
            path: path.into(),
            args,
            budget: StepBudget::default(),
            state: ExecutionState::Running,
            events: EventProcessor::new(queue_limit),
            script: Some(script),
            abandoned: false,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    pub fn state(&self) -> &ExecutionState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut ExecutionState {
        &mut self.state
    }

    pub fn status(&self) -> ThreadStatus {
        self.state.status()
    }

    pub fn budget(&self) -> &StepBudget {
        &self.budget
    }

    pub fn events(&self) -> &EventProcessor {
        &self.events
    }

    pub fn events_mut(&mut self) -> &mut EventProcessor {
        &mut self.events
    }

    pub fn is_terminated(&self) -> bool {
        self.script.is_none()
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    /// Live and not marked for stopping.
    pub fn is_active(&self) -> bool {
        !self.abandoned && self.script.is_some()
    }

    /// Fresh allowance for this tick, per the current state.
    pub fn begin_tick(&mut self, turbo: u32) {
        self.budget.reset(self.state.budget(turbo));
    }

    /// Whether the thread may step at `now`. A wait condition that panics
    /// ends this thread with a fault.
    pub fn poll_eligible(&mut self, now: Millis) -> std::result::Result<bool, ScriptFault> {
        if !self.is_active() {
            return Ok(false);
        }
        let state = &mut self.state;
        match panic::catch_unwind(AssertUnwindSafe(|| state.poll_eligible(now))) {
            Ok(eligible) => Ok(eligible),
            Err(payload) => {
                let fault = fault_from_panic(payload).with_context("wait condition");
                error!(
                    target: "scripting",
                    pid = self.pid,
                    script = %self.name,
                    error = %fault,
                    "wait condition panicked"
                );
                self.terminate();
                Err(fault)
            }
        }
    }

    /// Queue event matches for `line`. Paused threads see nothing.
    pub fn feed(&mut self, line: &str) -> usize {
        if !self.is_active() || self.state.is_paused() {
            return 0;
        }
        self.events.feed(line)
    }

    /// Mark for stopping; no further steps run.
    pub fn abandon(&mut self) {
        self.abandoned = true;
        self.budget.force_zero();
    }

    /// Drop the execution context. Later resumes fail.
    pub fn terminate(&mut self) {
        self.script = None;
    }

    /// Run queued event callbacks without stepping the script. Used before
    /// the eligibility check so callbacks can satisfy a pending wait.
    pub fn dispatch_events(
        &mut self,
        now: Millis,
        status: &mut Vec<StatusEvent>,
        requests: &mut Vec<ControlRequest>,
    ) -> Result<usize> {
        if self.script.is_none() {
            return Err(PulseError::ContextTerminated(self.pid));
        }
        if self.abandoned || self.state.is_paused() || self.events.pending() == 0 {
            return Ok(0);
        }

        let mut cx = ScriptContext::new(
            self.pid,
            &self.name,
            &self.args,
            now,
            &mut self.events,
            &mut self.budget,
            status,
            requests,
        );
        let dispatched = cx.do_events();
        trace!(pid = self.pid, dispatched, "dispatched queued events");
        Ok(dispatched)
    }

    /// Run steps until the script yields, finishes, faults, or spends its
    /// budget.
    pub fn resume(
        &mut self,
        now: Millis,
        status: &mut Vec<StatusEvent>,
        requests: &mut Vec<ControlRequest>,
    ) -> Result<ResumeOutcome> {
        let Some(script) = self.script.as_mut() else {
            return Err(PulseError::ContextTerminated(self.pid));
        };

        let mut cx = ScriptContext::new(
            self.pid,
            &self.name,
            &self.args,
            now,
            &mut self.events,
            &mut self.budget,
            status,
            requests,
        );

        let mut steps = 0u32;
        let result = loop {
            if cx.budget_exhausted() {
                break None;
            }
            cx.charge_step();
            steps += 1;

            match panic::catch_unwind(AssertUnwindSafe(|| script.step(&mut cx))) {
                Ok(Ok(Step::Continue)) => continue,
                Ok(Ok(step)) => break Some(Ok(step)),
                Ok(Err(fault)) => break Some(Err(fault)),
                Err(payload) => break Some(Err(fault_from_panic(payload))),
            }
        };
        drop(cx);

        match result {
            None | Some(Ok(Step::Continue)) => {
                trace!(pid = self.pid, steps, "thread out of budget");
                Ok(ResumeOutcome::Suspended)
            }
            Some(Ok(Step::Yield(wait))) => {
                trace!(pid = self.pid, steps, delay_ms = wait.delay_ms, "thread yielded");
                self.state.delay(now, wait.delay_ms, wait.condition);
                Ok(ResumeOutcome::Suspended)
            }
            Some(Ok(Step::Done(values))) => {
                debug!(pid = self.pid, script = %self.name, ?values, "script returned");
                self.terminate();
                Ok(ResumeOutcome::Finished(ThreadOutcome::Exited(values)))
            }
            Some(Err(fault)) => {
                error!(
                    target: "scripting",
                    pid = self.pid,
                    script = %self.name,
                    error = %fault,
                    context = ?fault.context,
                    "script faulted"
                );
                self.terminate();
                Ok(ResumeOutcome::Finished(ThreadOutcome::Errored(fault)))
            }
        }
    }
}

fn fault_from_panic(payload: Box<dyn Any + Send>) -> ScriptFault {
    ScriptFault::new(format!("script panicked: {}", panic_message(payload.as_ref())))
}
