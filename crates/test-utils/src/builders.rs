#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;

use scriptpulse::clock::ManualClock;
use scriptpulse::config::{ConfigFile, RawConfigFile};
use scriptpulse::engine::{Scheduler, SchedulerOptions};
use scriptpulse::errors::ScriptFault;
use scriptpulse::exec::{FileScriptLoader, FnScript, Script, ScriptContext, Step};
use scriptpulse::fs::MockFileSystem;
use scriptpulse::types::{EventDispatch, Millis};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn turbo(mut self, turbo: u32) -> Self {
        self.config.scheduler.turbo = turbo;
        self
    }

    pub fn info_gc(mut self, value: &str) -> Self {
        self.config.scheduler.info_gc = value.to_string();
        self
    }

    pub fn event_dispatch(mut self, dispatch: EventDispatch) -> Self {
        self.config.scheduler.event_dispatch = dispatch;
        self
    }

    pub fn script_dir(mut self, dir: &str) -> Self {
        self.config.scripts.dir = PathBuf::from(dir);
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Scheduler over a `ManualClock` and a `MockFileSystem` rooted at
/// `/scripts`.
pub struct SchedulerBuilder {
    options: SchedulerOptions,
    start: Millis,
    fs: MockFileSystem,
    search_paths: Vec<PathBuf>,
    extension: String,
}

/// A scheduler plus handles to drive its clock and files.
pub struct Harness {
    pub scheduler: Scheduler,
    pub clock: ManualClock,
    pub fs: MockFileSystem,
}

impl Harness {
    /// Advance the clock by `ms`, then tick.
    pub fn tick_after(&mut self, ms: Millis) -> scriptpulse::engine::TickReport {
        self.clock.advance(ms);
        self.scheduler.tick()
    }
}

impl SchedulerBuilder {
    pub fn new() -> Self {
        Self {
            options: SchedulerOptions::default(),
            start: 1_000,
            fs: MockFileSystem::new(),
            search_paths: vec![PathBuf::from("/scripts")],
            extension: "step".to_string(),
        }
    }

    pub fn turbo(mut self, turbo: u32) -> Self {
        self.options.turbo = turbo;
        self
    }

    pub fn info_gc(mut self, retention: Option<Millis>) -> Self {
        self.options.info_gc = retention;
        self
    }

    pub fn dispatch(mut self, dispatch: EventDispatch) -> Self {
        self.options.dispatch = dispatch;
        self
    }

    pub fn queue_limit(mut self, limit: usize) -> Self {
        self.options.event_queue_limit = Some(limit);
        self
    }

    pub fn start_at(mut self, start: Millis) -> Self {
        self.start = start;
        self
    }

    pub fn search_path(mut self, dir: &str) -> Self {
        self.search_paths.push(PathBuf::from(dir));
        self
    }

    /// Add a script file under `/scripts`.
    pub fn script(self, name: &str, source: &str) -> Self {
        self.fs
            .add_file(format!("/scripts/{name}.{}", self.extension), source);
        self
    }

    pub fn file(self, path: &str, source: &str) -> Self {
        self.fs.add_file(path, source);
        self
    }

    pub fn build(self) -> Harness {
        let clock = ManualClock::new(self.start);
        let loader = FileScriptLoader::new(Arc::new(self.fs.clone()), self.extension);
        let scheduler = Scheduler::new(
            self.options,
            Arc::new(clock.clone()),
            Box::new(loader),
            self.search_paths,
        );
        Harness {
            scheduler,
            clock,
            fs: self.fs,
        }
    }
}

impl Default for SchedulerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Box a closure as a script.
pub fn script_fn<F>(f: F) -> Box<dyn Script>
where
    F: FnMut(&mut ScriptContext<'_>) -> Result<Step, ScriptFault> + 'static,
{
    Box::new(FnScript(f))
}

/// A script that yields forever without doing anything.
pub fn idle_script() -> Box<dyn Script> {
    script_fn(|_cx| Ok(Step::Yield(scriptpulse::exec::Wait::tick())))
}
