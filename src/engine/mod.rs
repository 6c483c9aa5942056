// src/engine/mod.rs

//! Scheduling engine.
//!
//! The synchronous [`Scheduler`] holds all semantics: it owns the live
//! threads and the process table and is driven one tick at a time. The
//! async shell in [`runtime`] only ticks it on an interval and forwards
//! host events, so everything here can be tested without Tokio.

pub mod runtime;
pub mod scheduler;
pub mod status;
pub mod tick;

pub use runtime::{HostEvent, HostOptions, HostRuntime};
pub use scheduler::{PARSE_NAME, Scheduler, SchedulerOptions};
pub use status::{StatusEvent, StatusKind};
pub use tick::TickReport;
