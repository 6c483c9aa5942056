// src/exec/context.rs

use tracing::{info, warn};

use crate::engine::status::{StatusEvent, StatusKind};
use crate::errors::EventError;
use crate::events::processor::{EventCallback, EventProcessor};
use crate::thread::budget::StepBudget;
use crate::types::{Millis, Pid, Target};

/// Something a script asked the scheduler to do once its step returns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlRequest {
    Stop(Target),
    Pause(Target),
    Run { script: String, args: Vec<String> },
}

/// A running script's view of its own thread.
///
/// Lives only for one resume. Requests that touch the scheduler are queued
/// and applied in order after the resume returns.
pub struct ScriptContext<'a> {
    pid: Pid,
    name: &'a str,
    args: &'a [String],
    now: Millis,
    events: &'a mut EventProcessor,
    budget: &'a mut StepBudget,
    status: &'a mut Vec<StatusEvent>,
    requests: &'a mut Vec<ControlRequest>,
    draining: bool,
}

impl<'a> ScriptContext<'a> {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        pid: Pid,
        name: &'a str,
        args: &'a [String],
        now: Millis,
        events: &'a mut EventProcessor,
        budget: &'a mut StepBudget,
        status: &'a mut Vec<StatusEvent>,
        requests: &'a mut Vec<ControlRequest>,
    ) -> Self {
        Self {
            pid,
            name,
            args,
            now,
            events,
            budget,
            status,
            requests,
            draining: false,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn args(&self) -> &[String] {
        self.args
    }

    /// Scheduler time for this tick.
    pub fn now(&self) -> Millis {
        self.now
    }

    pub fn register_event(
        &mut self,
        name: &str,
        pattern: &str,
        callback: EventCallback,
    ) -> Result<(), EventError> {
        self.events.register(name, pattern, callback)
    }

    pub fn unregister_event(&mut self, name: &str) -> bool {
        self.events.unregister(name)
    }

    pub fn pending_events(&self) -> usize {
        self.events.pending()
    }

    /// Run queued callbacks in arrival order, one budget step each.
    ///
    /// A failing callback is reported and the rest still run. Calling this
    /// from inside a callback does nothing. Returns callbacks dispatched.
    pub fn do_events(&mut self) -> usize {
        if self.draining {
            return 0;
        }
        self.draining = true;

        let mut dispatched = 0;
        while let Some(pending) = self.events.pop() {
            self.budget.charge(1);
            dispatched += 1;
            if let Err(fault) = pending.invoke(self) {
                warn!(
                    target: "scripting",
                    pid = self.pid,
                    script = %self.name,
                    event = %fault.event,
                    error = %fault.message,
                    "event callback failed"
                );
                let message = format!("{} (pid {}): {}", self.name, self.pid, fault);
                self.status.push(StatusEvent::for_thread(
                    self.pid,
                    self.name,
                    StatusKind::Errored,
                    message,
                ));
            }
        }

        self.draining = false;
        dispatched
    }

    pub fn print(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: "scripting", pid = self.pid, script = %self.name, "{message}");
        self.status.push(StatusEvent::for_thread(
            self.pid,
            self.name,
            StatusKind::Output,
            message,
        ));
    }

    /// Charge extra steps for expensive work done inside one step.
    pub fn consume(&mut self, steps: u32) {
        self.budget.charge(steps);
    }

    pub fn remaining_budget(&self) -> u32 {
        self.budget.remaining()
    }

    pub(crate) fn budget_exhausted(&self) -> bool {
        self.budget.exhausted()
    }

    pub(crate) fn charge_step(&mut self) {
        self.budget.charge(1);
    }

    /// Ask the scheduler to stop `target`. Targeting this thread ends the
    /// current resume after the step returns.
    pub fn stop(&mut self, target: Target) {
        if self.targets_self(&target) {
            self.budget.force_zero();
        }
        self.requests.push(ControlRequest::Stop(target));
    }

    /// Stop this thread.
    pub fn exit(&mut self) {
        self.stop(Target::Pid(self.pid));
    }

    pub fn pause(&mut self, target: Target) {
        if self.targets_self(&target) {
            self.budget.force_zero();
        }
        self.requests.push(ControlRequest::Pause(target));
    }

    pub fn run(&mut self, script: impl Into<String>, args: Vec<String>) {
        self.requests.push(ControlRequest::Run {
            script: script.into(),
            args,
        });
    }

    fn targets_self(&self, target: &Target) -> bool {
        match target {
            Target::Pid(pid) => *pid == self.pid,
            Target::Name(name) => name == self.name,
            Target::All => true,
        }
    }
}
