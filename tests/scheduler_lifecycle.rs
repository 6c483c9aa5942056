// tests/scheduler_lifecycle.rs

mod common;
use crate::common::builders::{SchedulerBuilder, idle_script, script_fn};
use crate::common::{Log, init_tracing};

use std::error::Error;

use scriptpulse::engine::StatusKind;
use scriptpulse::errors::{PulseError, ScriptFault, StartError};
use scriptpulse::events::CapturedArgs;
use scriptpulse::exec::{ScriptContext, Step, Wait};
use scriptpulse::thread::ThreadStatus;
use scriptpulse::types::Target;

type TestResult = Result<(), Box<dyn Error>>;

#[test]
fn greeter_scenario_start_event_stop_collect() -> TestResult {
    init_tracing();
    let mut h = SchedulerBuilder::new().info_gc(Some(60_000)).build();
    let log = Log::default();

    let seen = log.clone();
    let mut registered = false;
    let pid = h.scheduler.start_script(
        "greeter",
        "greeter",
        script_fn(move |cx| {
            if !registered {
                let seen = seen.clone();
                cx.register_event(
                    "hello",
                    "hello {name}",
                    Box::new(move |args: &CapturedArgs, _: &mut ScriptContext<'_>| {
                        seen.push(args.get("name").unwrap_or_default());
                        Ok(())
                    }),
                )
                .map_err(|e| ScriptFault::new(e.to_string()))?;
                registered = true;
            }
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;

    assert_eq!(pid, 1);
    let info = h.scheduler.info(&Target::Pid(1)).ok_or("missing info")?;
    assert_eq!(info.status, ThreadStatus::Running);
    assert_eq!(info.end_time, None);

    h.scheduler.on_text_line("hello world");
    assert!(log.entries().is_empty(), "callbacks wait for the next tick");

    h.tick_after(10);
    assert_eq!(log.entries(), vec!["world".to_string()]);

    h.scheduler.stop(&Target::Pid(1))?;
    let report = h.tick_after(10);
    assert_eq!(report.reaped, vec![1]);
    assert!(h.scheduler.is_idle());

    let info = h.scheduler.info(&Target::Pid(1)).ok_or("missing info")?;
    assert_eq!(info.status, ThreadStatus::Exited);
    assert_eq!(info.end_time, Some(1_020));

    let report = h.tick_after(60_000);
    assert_eq!(report.collected, vec![1]);
    assert!(h.scheduler.info(&Target::Pid(1)).is_none());
    Ok(())
}

#[test]
fn pids_are_assigned_monotonically_and_never_reused() -> TestResult {
    let mut h = SchedulerBuilder::new().build();

    let a = h.scheduler.start_script("a", "a", idle_script(), vec![])?;
    let b = h.scheduler.start_script("b", "b", idle_script(), vec![])?;
    h.scheduler.stop(&Target::Pid(a))?;
    h.scheduler.tick();
    let c = h.scheduler.start_script("a", "a", idle_script(), vec![])?;

    assert_eq!((a, b, c), (1, 2, 3));
    assert_eq!(h.scheduler.live_pids(), vec![2, 3]);
    Ok(())
}

#[test]
fn first_resume_happens_during_start() -> TestResult {
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();
    let steps = log.clone();

    h.scheduler.start_script(
        "eager",
        "eager",
        script_fn(move |_cx| {
            steps.push("step");
            Ok(Step::Yield(Wait::millis(1_000)))
        }),
        vec![],
    )?;

    assert_eq!(log.len(), 1);
    Ok(())
}

#[test]
fn duplicate_live_path_is_rejected_and_existing_thread_untouched() -> TestResult {
    let mut h = SchedulerBuilder::new()
        .script("loop", ":top\nyield\ngoto top\n")
        .build();

    let pid = h.scheduler.run("loop", vec![])?;
    match h.scheduler.run("loop", vec![]) {
        Err(PulseError::Start(StartError::DuplicateRunning { name, pid: existing })) => {
            assert_eq!(name, "loop");
            assert_eq!(existing, pid);
        }
        other => panic!("expected DuplicateRunning, got {other:?}"),
    }
    assert_eq!(h.scheduler.live_pids(), vec![pid]);

    // Paused still counts as running.
    h.scheduler.pause(&Target::Pid(pid))?;
    assert!(h.scheduler.run("loop", vec![]).is_err());
    Ok(())
}

#[test]
fn restarting_a_finished_script_replaces_its_entry() -> TestResult {
    let mut h = SchedulerBuilder::new()
        .script("once", "return ok\n")
        .build();

    let first = h.scheduler.run("once", vec![])?;
    h.scheduler.tick();
    assert_eq!(
        h.scheduler.info(&Target::Pid(first)).map(|i| i.status),
        Some(ThreadStatus::Exited)
    );

    let second = h.scheduler.run("once", vec![])?;
    assert!(second > first);
    assert!(h.scheduler.info(&Target::Pid(first)).is_none());
    Ok(())
}

#[test]
fn failed_restart_keeps_the_finished_entry() -> TestResult {
    let mut h = SchedulerBuilder::new().build();

    let first = h.scheduler.parse("return 7")?;
    assert_eq!(
        h.scheduler.info(&Target::Pid(first)).map(|i| i.status),
        Some(ThreadStatus::Exited)
    );

    assert!(matches!(
        h.scheduler.parse("frobnicate the widgets"),
        Err(PulseError::Start(StartError::Load { .. }))
    ));
    let info = h.scheduler.info(&Target::Pid(first)).ok_or("entry was dropped")?;
    assert_eq!(info.status, ThreadStatus::Exited);
    assert_eq!(info.return_values, vec!["7".to_string()]);
    Ok(())
}

#[test]
fn missing_script_reports_search_paths() {
    let mut h = SchedulerBuilder::new().search_path("/shared").build();

    match h.scheduler.run("ghost", vec![]) {
        Err(PulseError::Start(StartError::ScriptNotFound { script, searched })) => {
            assert_eq!(script, "ghost");
            assert_eq!(searched.len(), 2);
        }
        other => panic!("expected ScriptNotFound, got {other:?}"),
    }
    assert!(h.scheduler.table().is_empty());
}

#[test]
fn unparsable_script_fails_to_load() {
    let mut h = SchedulerBuilder::new()
        .script("broken", "frobnicate the widgets\n")
        .build();

    match h.scheduler.run("broken", vec![]) {
        Err(PulseError::Start(StartError::Load { path, message })) => {
            assert!(path.ends_with("broken.step"));
            assert!(message.contains("unknown instruction"));
        }
        other => panic!("expected Load error, got {other:?}"),
    }
}

#[test]
fn scripts_resolve_from_later_search_paths_and_init_files() -> TestResult {
    let mut h = SchedulerBuilder::new()
        .search_path("/shared")
        .file("/shared/util.step", "return util\n")
        .file("/scripts/pkg/init.step", "return pkg\n")
        .build();

    let util = h.scheduler.run("util", vec![])?;
    let pkg = h.scheduler.run("pkg", vec![])?;

    assert_eq!(h.scheduler.info(&Target::Pid(util)).map(|i| i.path.as_str()), Some("/shared/util.step"));
    assert_eq!(h.scheduler.info(&Target::Pid(pkg)).map(|i| i.return_values.clone()), Some(vec!["pkg".to_string()]));
    Ok(())
}

#[test]
fn return_values_and_arguments_are_recorded() -> TestResult {
    let mut h = SchedulerBuilder::new()
        .script("echo", "return $2 $1\n")
        .build();

    let pid = h.scheduler.run("echo", vec!["a".into(), "b".into()])?;
    let info = h.scheduler.info(&Target::Pid(pid)).ok_or("missing info")?;
    assert_eq!(info.arguments, vec!["a", "b"]);
    assert_eq!(info.argument_line(), "a b");
    assert_eq!(info.return_values, vec!["b", "a"]);
    assert!(info.end_time.is_some());

    let events = h.scheduler.drain_status();
    let kinds: Vec<StatusKind> = events.iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![StatusKind::Started, StatusKind::Ended]);
    assert!(events[1].message.contains("b, a"));
    Ok(())
}

#[test]
fn fault_is_captured_and_other_threads_keep_running() -> TestResult {
    init_tracing();
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();

    let steady = log.clone();
    let ok = h.scheduler.start_script(
        "steady",
        "steady",
        script_fn(move |_cx| {
            steady.push("tick");
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;

    let mut calls = 0;
    let bad = h.scheduler.start_script(
        "faulty",
        "faulty",
        script_fn(move |_cx| {
            calls += 1;
            if calls > 1 {
                return Err(ScriptFault::new("boom").with_context("step 2"));
            }
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;

    let report = h.tick_after(10);
    assert_eq!(report.resumed, vec![ok, bad]);
    assert_eq!(report.reaped, vec![bad]);

    let info = h.scheduler.info(&Target::Pid(bad)).ok_or("missing info")?;
    assert_eq!(info.status, ThreadStatus::Errored);
    assert_eq!(info.error.as_deref(), Some("boom (step 2)"));
    assert!(info.end_time.is_some());

    h.tick_after(10);
    assert_eq!(log.len(), 3);
    assert_eq!(h.scheduler.live_pids(), vec![ok]);
    Ok(())
}

#[test]
fn panicking_script_becomes_a_fault() -> TestResult {
    let mut h = SchedulerBuilder::new().build();
    let pid = h.scheduler.start_script(
        "panicky",
        "panicky",
        script_fn(|_cx| panic!("kaboom")),
        vec![],
    )?;

    let info = h.scheduler.info(&Target::Pid(pid)).ok_or("missing info")?;
    assert_eq!(info.status, ThreadStatus::Errored);
    assert!(info.error.as_deref().unwrap_or_default().contains("kaboom"));
    assert!(
        h.scheduler
            .drain_status()
            .iter()
            .any(|e| e.kind == StatusKind::Errored)
    );
    Ok(())
}

#[test]
fn parse_allows_one_live_instance() -> TestResult {
    let mut h = SchedulerBuilder::new().build();

    let first = h.scheduler.parse(":top\nyield\ngoto top")?;
    assert!(matches!(
        h.scheduler.parse("return"),
        Err(PulseError::Start(StartError::DuplicateRunning { .. }))
    ));

    h.scheduler.stop(&Target::Name("parse".into()))?;
    h.scheduler.tick();

    let second = h.scheduler.parse("return 42")?;
    assert!(second > first);
    assert!(h.scheduler.info(&Target::Pid(first)).is_none());
    assert_eq!(
        h.scheduler.info(&Target::Name("parse".into())).map(|i| i.return_values.clone()),
        Some(vec!["42".to_string()])
    );
    Ok(())
}
