// src/clock/mod.rs

//! Time source for the scheduler.
//!
//! Everything that compares deadlines (delays, GC retention) and every
//! timestamp in the process table reads time through [`Clock`], so tests can
//! drive it by hand with [`ManualClock`].

use std::fmt::Debug;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::types::Millis;

pub mod manual;

pub use manual::ManualClock;

pub trait Clock: Send + Sync + Debug {
    fn now_millis(&self) -> Millis;
}

/// Milliseconds since the unix epoch.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> Millis {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as Millis)
            .unwrap_or(0)
    }
}
