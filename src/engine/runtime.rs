// src/engine/runtime.rs

use std::fmt;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::engine::scheduler::Scheduler;
use crate::engine::status::StatusEvent;
use crate::errors::Result;
use crate::thread::{ThreadInfo, ThreadStatus};
use crate::types::Target;

/// Input from the embedding host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostEvent {
    /// A line of incoming text for event matching.
    TextLine(String),
    Run { script: String, args: Vec<String> },
    Parse(String),
    Stop(Target),
    Pause(Target),
    /// Print the process table; `None` lists running and paused entries.
    List(Option<Vec<ThreadStatus>>),
    Info(Target),
    /// Stop everything and exit after one more tick.
    Shutdown,
}

impl HostEvent {
    /// Interpret one input line. Lines starting with `/` are commands
    /// (`/run`, `/parse`, `/stop`, `/pause`, `/ps`, `/info`, `/quit`);
    /// anything else is text.
    pub fn from_line(line: &str) -> std::result::Result<HostEvent, String> {
        let Some(command) = line.strip_prefix('/') else {
            return Ok(HostEvent::TextLine(line.to_string()));
        };

        let (verb, rest) = match command.trim().split_once(char::is_whitespace) {
            Some((v, r)) => (v, r.trim()),
            None => (command.trim(), ""),
        };
        let target = || Target::from_optional((!rest.is_empty()).then_some(rest));

        match verb.to_lowercase().as_str() {
            "run" => {
                let mut words = rest.split_whitespace().map(str::to_string);
                let script = words.next().ok_or_else(|| "usage: /run <script> [args..]".to_string())?;
                Ok(HostEvent::Run {
                    script,
                    args: words.collect(),
                })
            }
            "parse" if !rest.is_empty() => Ok(HostEvent::Parse(rest.replace("\\n", "\n"))),
            "parse" => Err("usage: /parse <source>".to_string()),
            "stop" => Ok(HostEvent::Stop(target())),
            "pause" => Ok(HostEvent::Pause(target())),
            "ps" => {
                if rest.is_empty() {
                    return Ok(HostEvent::List(None));
                }
                let statuses = rest
                    .split_whitespace()
                    .map(str::parse::<ThreadStatus>)
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(HostEvent::List(Some(statuses)))
            }
            "info" => Ok(HostEvent::Info(target())),
            "quit" | "exit" => Ok(HostEvent::Shutdown),
            other => Err(format!("unknown command '/{other}'")),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HostOptions {
    pub pulse_interval: Duration,
    /// Hide start/stop/pause chatter.
    pub squelch_status: bool,
    /// Keep ticking after the last script ends, until input closes.
    pub keep_alive: bool,
}

/// Async shell around the [`Scheduler`]: ticks it on a fixed interval and
/// feeds it host events. All scheduling semantics live in the scheduler;
/// this only moves data in and out.
pub struct HostRuntime {
    scheduler: Scheduler,
    event_rx: mpsc::Receiver<HostEvent>,
    options: HostOptions,
    status_tx: Option<mpsc::UnboundedSender<StatusEvent>>,
}

impl fmt::Debug for HostRuntime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostRuntime")
            .field("scheduler", &self.scheduler)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl HostRuntime {
    pub fn new(
        scheduler: Scheduler,
        event_rx: mpsc::Receiver<HostEvent>,
        options: HostOptions,
    ) -> Self {
        Self {
            scheduler,
            event_rx,
            options,
            status_tx: None,
        }
    }

    /// Send status lines here instead of printing them.
    pub fn with_status_sink(mut self, tx: mpsc::UnboundedSender<StatusEvent>) -> Self {
        self.status_tx = Some(tx);
        self
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    /// Main loop. Returns the scheduler so callers can inspect final state.
    pub async fn run(mut self) -> Result<Scheduler> {
        info!(interval = ?self.options.pulse_interval, "host runtime started");

        let mut interval = tokio::time::interval(self.options.pulse_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut input_open = true;
        let mut shutting_down = false;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    self.scheduler.tick();
                    self.flush_status();

                    if shutting_down {
                        info!("shutdown complete");
                        break;
                    }
                    if self.scheduler.is_idle() && (!self.options.keep_alive || !input_open) {
                        info!("no scripts left; exiting");
                        break;
                    }
                }
                event = self.event_rx.recv(), if input_open => {
                    match event {
                        Some(event) => {
                            debug!(?event, "host event");
                            if self.handle_event(event) {
                                shutting_down = true;
                            }
                        }
                        None => {
                            debug!("host event channel closed");
                            input_open = false;
                        }
                    }
                    self.flush_status();
                }
            }
        }

        Ok(self.scheduler)
    }

    /// Apply one event. Returns `true` on shutdown.
    fn handle_event(&mut self, event: HostEvent) -> bool {
        let outcome = match event {
            HostEvent::TextLine(line) => {
                self.scheduler.on_text_line(&line);
                Ok(())
            }
            HostEvent::Run { script, args } => self.scheduler.run(&script, args).map(|_| ()),
            HostEvent::Parse(source) => self.scheduler.parse(&source).map(|_| ()),
            HostEvent::Stop(target) => self.scheduler.stop(&target).map(|_| ()),
            HostEvent::Pause(target) => self.scheduler.pause(&target).map(|_| ()),
            HostEvent::List(filter) => {
                let rows = self.scheduler.list(filter.as_deref());
                self.emit_lines(format_table(&rows));
                Ok(())
            }
            HostEvent::Info(target) => {
                let lines = match self.scheduler.info(&target) {
                    Some(info) => format_info(info),
                    None => vec![format!("No script matching {target}")],
                };
                self.emit_lines(lines);
                Ok(())
            }
            HostEvent::Shutdown => {
                self.scheduler.stop_all();
                return true;
            }
        };

        if let Err(e) = outcome {
            warn!(error = %e, "host request failed");
            self.emit(StatusEvent::notice(e.to_string()));
        }
        false
    }

    fn flush_status(&mut self) {
        for event in self.scheduler.drain_status() {
            if self.options.squelch_status && event.is_squelchable() {
                continue;
            }
            self.emit(event);
        }
    }

    fn emit_lines(&self, lines: Vec<String>) {
        for line in lines {
            self.emit(StatusEvent::notice(line));
        }
    }

    fn emit(&self, event: StatusEvent) {
        match &self.status_tx {
            Some(tx) => {
                let _ = tx.send(event);
            }
            None => println!("{event}"),
        }
    }
}

fn format_table(rows: &[ThreadInfo]) -> Vec<String> {
    let mut lines = vec![format!("{:>6} {:<20} {:<8}", "PID", "NAME", "STATUS")];
    lines.extend(
        rows.iter()
            .map(|r| format!("{:>6} {:<20} {:<8}", r.pid, r.name, r.status)),
    );
    lines
}

fn format_info(info: &ThreadInfo) -> Vec<String> {
    let mut lines = vec![
        format!("pid: {}", info.pid),
        format!("name: {}", info.name),
        format!("path: {}", info.path),
        format!("arguments: {}", info.argument_line()),
        format!("status: {}", info.status),
        format!("start time: {}", info.start_time),
    ];
    if let Some(end) = info.end_time {
        lines.push(format!("end time: {end}"));
    }
    if !info.return_values.is_empty() {
        lines.push(format!("return values: {}", info.return_values.join(", ")));
    }
    if let Some(err) = &info.error {
        lines.push(format!("error: {err}"));
    }
    lines
}
