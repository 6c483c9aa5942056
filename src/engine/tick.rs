// src/engine/tick.rs

use crate::types::{Millis, Pid};

/// What one call to `Scheduler::tick` did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Clock reading the tick ran at.
    pub now: Millis,
    /// Threads that were eligible and got resumed, in service order.
    pub resumed: Vec<Pid>,
    /// Threads removed from the live set (finished, faulted or stopped).
    pub reaped: Vec<Pid>,
    /// Process entries dropped by retention cleanup.
    pub collected: Vec<Pid>,
}

impl TickReport {
    pub fn new(now: Millis) -> Self {
        Self {
            now,
            ..Self::default()
        }
    }

    pub fn is_quiet(&self) -> bool {
        self.resumed.is_empty() && self.reaped.is_empty() && self.collected.is_empty()
    }
}
