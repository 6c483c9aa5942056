// src/thread/state.rs

use std::fmt;
use std::mem;

use crate::thread::info::ThreadStatus;
use crate::types::Millis;

/// Resume condition attached to a delay. May read script-local state.
pub type WaitCondition = Box<dyn FnMut() -> bool>;

/// A pending wait: not before `until`, and only once `condition` holds.
pub struct Delay {
    pub until: Millis,
    pub condition: Option<WaitCondition>,
}

impl Delay {
    pub fn new(until: Millis, condition: Option<WaitCondition>) -> Self {
        Self { until, condition }
    }

    fn is_satisfied(&mut self, now: Millis) -> bool {
        if now < self.until {
            return false;
        }
        match self.condition.as_mut() {
            Some(cond) => cond(),
            None => true,
        }
    }
}

impl fmt::Debug for Delay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delay")
            .field("until", &self.until)
            .field("has_condition", &self.condition.is_some())
            .finish()
    }
}

/// Scheduling state owned by one script thread.
///
/// `Paused` keeps the wait that was active when the thread was paused, so
/// resuming a paused delay goes back to waiting rather than running early.
#[derive(Debug)]
pub enum ExecutionState {
    Running,
    Delayed(Delay),
    Paused(Option<Delay>),
}

impl Default for ExecutionState {
    fn default() -> Self {
        ExecutionState::Running
    }
}

impl ExecutionState {
    /// Whether the thread may run at `now`. A satisfied delay collapses to
    /// `Running`.
    pub fn poll_eligible(&mut self, now: Millis) -> bool {
        match self {
            ExecutionState::Running => true,
            ExecutionState::Paused(_) => false,
            ExecutionState::Delayed(delay) => {
                if delay.is_satisfied(now) {
                    *self = ExecutionState::Running;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Enter a wait of `delay_ms` from `now`.
    pub fn delay(&mut self, now: Millis, delay_ms: Millis, condition: Option<WaitCondition>) {
        *self = ExecutionState::Delayed(Delay::new(now.saturating_add(delay_ms), condition));
    }

    /// Drop any pending wait and run on the next tick. Paused stays paused.
    pub fn wake(&mut self) {
        match self {
            ExecutionState::Delayed(_) => *self = ExecutionState::Running,
            ExecutionState::Paused(saved) => *saved = None,
            ExecutionState::Running => {}
        }
    }

    pub fn pause(&mut self) -> bool {
        match mem::take(self) {
            ExecutionState::Running => {
                *self = ExecutionState::Paused(None);
                true
            }
            ExecutionState::Delayed(delay) => {
                *self = ExecutionState::Paused(Some(delay));
                true
            }
            paused @ ExecutionState::Paused(_) => {
                *self = paused;
                false
            }
        }
    }

    pub fn resume(&mut self) -> bool {
        match mem::take(self) {
            ExecutionState::Paused(Some(delay)) => {
                *self = ExecutionState::Delayed(delay);
                true
            }
            ExecutionState::Paused(None) => true,
            other => {
                *self = other;
                false
            }
        }
    }

    /// Flip between paused and unpaused. Returns `true` if now paused.
    pub fn toggle_pause(&mut self) -> bool {
        if self.is_paused() {
            self.resume();
            false
        } else {
            self.pause();
            true
        }
    }

    pub fn is_paused(&self) -> bool {
        matches!(self, ExecutionState::Paused(_))
    }

    pub fn is_delayed(&self) -> bool {
        matches!(self, ExecutionState::Delayed(_))
    }

    /// Steps this state may spend in one tick.
    pub fn budget(&self, turbo: u32) -> u32 {
        match self {
            ExecutionState::Paused(_) => 0,
            _ => turbo,
        }
    }

    pub fn status(&self) -> ThreadStatus {
        match self {
            ExecutionState::Paused(_) => ThreadStatus::Paused,
            _ => ThreadStatus::Running,
        }
    }
}
