// src/thread/mod.rs

//! Script threads and their bookkeeping.
//!
//! - [`state`]: the Running / Delayed / Paused state machine.
//! - [`budget`]: per-tick step allowance.
//! - [`script_thread`]: one resumable script instance.
//! - [`info`] and [`table`]: the process table that outlives threads.

pub mod budget;
pub mod info;
pub mod script_thread;
pub mod state;
pub mod table;

pub use budget::StepBudget;
pub use info::{ThreadInfo, ThreadStatus};
pub use script_thread::{ResumeOutcome, ScriptThread, ThreadOutcome};
pub use state::{Delay, ExecutionState, WaitCondition};
pub use table::ProcessTable;
