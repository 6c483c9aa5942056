// src/exec/mod.rs

//! Script execution layer.
//!
//! - [`Script`] is the resumable unit the scheduler drives one step at a
//!   time; [`FnScript`] adapts a closure.
//! - [`context`] is the handle a running step gets to its thread: events,
//!   budget, output and control requests.
//! - [`backend`] resolves and loads scripts from disk.
//! - [`text`] is the line-oriented step script format loaded from files and
//!   from `parse` strings.

use std::fmt;

use crate::errors::ScriptFault;
use crate::thread::state::WaitCondition;
use crate::types::Millis;

pub mod backend;
pub mod context;
pub mod text;

pub use backend::{FileScriptLoader, ScriptLoader};
pub use context::{ControlRequest, ScriptContext};

/// A resumable script.
///
/// Each call to `step` is one unit of budget. Returning `Continue` lets the
/// scheduler call again in the same tick while budget remains.
pub trait Script {
    fn step(&mut self, cx: &mut ScriptContext<'_>) -> Result<Step, ScriptFault>;
}

/// Result of one step.
pub enum Step {
    Continue,
    /// Suspend until the wait is satisfied; a zero wait resumes next tick.
    Yield(Wait),
    /// Finished with these return values.
    Done(Vec<String>),
}

impl fmt::Debug for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Step::Continue => f.write_str("Continue"),
            Step::Yield(wait) => f.debug_tuple("Yield").field(wait).finish(),
            Step::Done(values) => f.debug_tuple("Done").field(values).finish(),
        }
    }
}

pub struct Wait {
    pub delay_ms: Millis,
    pub condition: Option<WaitCondition>,
}

impl Wait {
    /// Give up the rest of this tick.
    pub fn tick() -> Self {
        Self::millis(0)
    }

    pub fn millis(delay_ms: Millis) -> Self {
        Self {
            delay_ms,
            condition: None,
        }
    }

    /// Wait at least `delay_ms`, then until `condition` returns true.
    pub fn until(delay_ms: Millis, condition: impl FnMut() -> bool + 'static) -> Self {
        Self {
            delay_ms,
            condition: Some(Box::new(condition)),
        }
    }
}

impl fmt::Debug for Wait {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wait")
            .field("delay_ms", &self.delay_ms)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

/// Closure-backed script, mostly for embedding and tests.
pub struct FnScript<F>(pub F);

impl<F> Script for FnScript<F>
where
    F: FnMut(&mut ScriptContext<'_>) -> Result<Step, ScriptFault>,
{
    fn step(&mut self, cx: &mut ScriptContext<'_>) -> Result<Step, ScriptFault> {
        (self.0)(cx)
    }
}
