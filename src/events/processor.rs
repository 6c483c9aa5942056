// src/events/processor.rs

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::errors::{CallbackFault, EventError, panic_message};
use crate::events::patterns::{CapturedArgs, CompiledPattern, PatternMatcher};
use crate::events::queue::EventQueue;
use crate::exec::ScriptContext;

/// Callback run inside the owning script's context when a queued match is
/// dispatched.
pub type EventCallback =
    Box<dyn FnMut(&CapturedArgs, &mut ScriptContext<'_>) -> anyhow::Result<()>>;

pub struct EventDefinition {
    name: String,
    pattern: CompiledPattern,
    callback: RefCell<EventCallback>,
}

impl EventDefinition {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn pattern(&self) -> &str {
        self.pattern.source()
    }
}

impl fmt::Debug for EventDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDefinition")
            .field("name", &self.name)
            .field("pattern", &self.pattern.source())
            .finish_non_exhaustive()
    }
}

/// One match waiting for its callback.
#[derive(Debug)]
pub struct PendingEvent {
    definition: Rc<EventDefinition>,
    args: CapturedArgs,
}

impl PendingEvent {
    pub fn name(&self) -> &str {
        self.definition.name()
    }

    pub fn args(&self) -> &CapturedArgs {
        &self.args
    }

    /// Run the callback. A callback that is already running (re-entered
    /// through a nested drain) is reported as a fault instead of aliasing,
    /// and so is a callback that panics.
    pub fn invoke(&self, cx: &mut ScriptContext<'_>) -> Result<(), CallbackFault> {
        let fault = |message: String| CallbackFault {
            event: self.definition.name.clone(),
            message,
        };
        let mut callback = self
            .definition
            .callback
            .try_borrow_mut()
            .map_err(|_| fault("callback is already running".to_string()))?;
        let args = &self.args;
        match panic::catch_unwind(AssertUnwindSafe(|| (&mut **callback)(args, cx))) {
            Ok(result) => result.map_err(|e| fault(format!("{e:#}"))),
            Err(payload) => Err(fault(format!(
                "callback panicked: {}",
                panic_message(payload.as_ref())
            ))),
        }
    }
}

/// Per-thread event definitions plus their queue of pending matches.
#[derive(Debug)]
pub struct EventProcessor {
    definitions: Vec<Rc<EventDefinition>>,
    matcher: PatternMatcher,
    queue: EventQueue<PendingEvent>,
}

impl EventProcessor {
    pub fn new(queue_limit: Option<usize>) -> Self {
        Self {
            definitions: Vec::new(),
            matcher: PatternMatcher::new(),
            queue: EventQueue::new(queue_limit),
        }
    }

    /// Register `name`, replacing an existing definition in place.
    ///
    /// Replacing discards matches still queued for the old definition.
    pub fn register(
        &mut self,
        name: &str,
        pattern: &str,
        callback: EventCallback,
    ) -> Result<(), EventError> {
        let compiled = CompiledPattern::compile(pattern)?;
        let definition = Rc::new(EventDefinition {
            name: name.to_string(),
            pattern: compiled.clone(),
            callback: RefCell::new(callback),
        });

        match self.position(name) {
            Some(idx) => {
                self.definitions[idx] = definition;
                self.matcher.replace(idx, compiled);
                self.queue.retain(|p| p.name() != name);
                debug!(event = %name, pattern, "replaced event definition");
            }
            None => {
                self.definitions.push(definition);
                self.matcher.push(compiled);
                debug!(event = %name, pattern, "registered event");
            }
        }
        Ok(())
    }

    /// Remove `name` and its queued matches. Unknown names are ignored.
    pub fn unregister(&mut self, name: &str) -> bool {
        let Some(idx) = self.position(name) else {
            return false;
        };
        self.definitions.remove(idx);
        self.matcher.remove(idx);
        self.queue.retain(|p| p.name() != name);
        debug!(event = %name, "unregistered event");
        true
    }

    /// Match `line` against every definition and queue the hits in
    /// registration order. Returns how many were queued.
    pub fn feed(&mut self, line: &str) -> usize {
        let hits = self.matcher.matches(line);
        let count = hits.len();
        for (idx, args) in hits {
            let definition = Rc::clone(&self.definitions[idx]);
            trace!(event = %definition.name(), ?args, "queued event match");
            self.queue.push(PendingEvent { definition, args });
        }
        count
    }

    pub fn pop(&mut self) -> Option<PendingEvent> {
        self.queue.pop()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn dropped(&self) -> u64 {
        self.queue.dropped()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.definitions.iter().map(|d| d.name())
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.definitions.iter().position(|d| d.name == name)
    }
}

impl Default for EventProcessor {
    fn default() -> Self {
        Self::new(None)
    }
}
