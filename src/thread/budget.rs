// src/thread/budget.rs

/// Steps a thread has spent in the current tick against its allowance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepBudget {
    used: u32,
    limit: u32,
}

impl StepBudget {
    pub fn new(limit: u32) -> Self {
        Self { used: 0, limit }
    }

    pub fn reset(&mut self, limit: u32) {
        self.used = 0;
        self.limit = limit;
    }

    pub fn charge(&mut self, steps: u32) {
        self.used = self.used.saturating_add(steps);
    }

    pub fn exhausted(&self) -> bool {
        self.used >= self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.limit.saturating_sub(self.used)
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// No more steps this tick.
    pub fn force_zero(&mut self) {
        self.limit = 0;
    }
}
