// src/events/mod.rs

//! Text events: pattern compilation, per-thread matching, and the queue of
//! matches waiting to be handed to script callbacks.

pub mod patterns;
pub mod processor;
pub mod queue;

pub use patterns::{CapturedArgs, CompiledPattern, PatternMatcher};
pub use processor::{EventCallback, EventDefinition, EventProcessor, PendingEvent};
pub use queue::EventQueue;
