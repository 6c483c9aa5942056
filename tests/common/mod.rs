#![allow(dead_code)]

pub use scriptpulse_test_utils::builders;
pub use scriptpulse_test_utils::{init_tracing, with_timeout};

use std::cell::RefCell;
use std::rc::Rc;

/// Shared log a test script can push into and the test can read back.
#[derive(Clone, Default)]
pub struct Log(Rc<RefCell<Vec<String>>>);

impl Log {
    pub fn push(&self, entry: impl Into<String>) {
        self.0.borrow_mut().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.0.borrow().clone()
    }

    pub fn len(&self) -> usize {
        self.0.borrow().len()
    }
}

use scriptpulse::events::{CapturedArgs, EventCallback};
use scriptpulse::exec::ScriptContext;

pub fn noop_callback() -> EventCallback {
    Box::new(|_: &CapturedArgs, _: &mut ScriptContext<'_>| Ok(()))
}

/// Callback that records `"<event>:<v1>,<v2>.."` for each dispatch.
pub fn recording_callback(log: &Log, event: &str) -> EventCallback {
    let log = log.clone();
    let event = event.to_string();
    Box::new(move |args: &CapturedArgs, _: &mut ScriptContext<'_>| {
        log.push(format!("{event}:{}", args.values().join(",")));
        Ok(())
    })
}
