// tests/scheduler_events.rs

mod common;
use crate::common::builders::{SchedulerBuilder, script_fn};
use crate::common::{Log, init_tracing, recording_callback};

use std::error::Error;

use scriptpulse::engine::StatusKind;
use scriptpulse::errors::ScriptFault;
use scriptpulse::events::CapturedArgs;
use scriptpulse::exec::{ScriptContext, Step, Wait};
use scriptpulse::types::{EventDispatch, Target};

type TestResult = Result<(), Box<dyn Error>>;

fn fault(e: impl std::fmt::Display) -> ScriptFault {
    ScriptFault::new(e.to_string())
}

/// Registers the given `(name, pattern)` pairs on its first step, then
/// yields every tick.
fn listener(log: &Log, events: &[(&str, &str)]) -> Box<dyn scriptpulse::exec::Script> {
    let log = log.clone();
    let events: Vec<(String, String)> = events
        .iter()
        .map(|(n, p)| (n.to_string(), p.to_string()))
        .collect();
    let mut registered = false;
    script_fn(move |cx| {
        if !registered {
            for (name, pattern) in &events {
                cx.register_event(name, pattern, recording_callback(&log, name))
                    .map_err(fault)?;
            }
            registered = true;
        }
        Ok(Step::Yield(Wait::tick()))
    })
}

#[test]
fn simultaneous_matches_dispatch_in_registration_order() -> TestResult {
    init_tracing();
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();
    h.scheduler.start_script(
        "l",
        "l",
        listener(&log, &[("any", "#*#"), ("loot", "You loot #1# from #2#.")]),
        vec![],
    )?;

    h.scheduler.on_text_line("You loot a sword from the rat.");
    h.scheduler.on_text_line("unrelated");
    h.tick_after(10);

    assert_eq!(
        log.entries(),
        vec!["any:", "loot:a sword,the rat", "any:"]
    );
    Ok(())
}

#[test]
fn each_match_invokes_its_callback_once() -> TestResult {
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();
    h.scheduler
        .start_script("l", "l", listener(&log, &[("n", "n #1#")]), vec![])?;

    for i in 0..3 {
        h.scheduler.on_text_line(&format!("n {i}"));
    }
    h.tick_after(10);
    h.tick_after(10);

    assert_eq!(log.entries(), vec!["n:0", "n:1", "n:2"]);
    Ok(())
}

#[test]
fn paused_threads_do_not_receive_lines() -> TestResult {
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();
    let pid = h
        .scheduler
        .start_script("l", "l", listener(&log, &[("x", "x")]), vec![])?;

    h.scheduler.pause(&Target::Pid(pid))?;
    assert_eq!(h.scheduler.on_text_line("x"), 0);
    h.scheduler.pause(&Target::Pid(pid))?;
    h.tick_after(10);
    assert!(log.entries().is_empty());

    assert_eq!(h.scheduler.on_text_line("x"), 1);
    h.tick_after(10);
    assert_eq!(log.entries(), vec!["x:"]);
    Ok(())
}

#[test]
fn delayed_threads_buffer_lines_until_they_run() -> TestResult {
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();

    let cb_log = log.clone();
    let mut registered = false;
    h.scheduler.start_script(
        "sleepy",
        "sleepy",
        script_fn(move |cx| {
            if !registered {
                cx.register_event("x", "x", recording_callback(&cb_log, "x"))
                    .map_err(fault)?;
                registered = true;
            }
            Ok(Step::Yield(Wait::millis(1_000)))
        }),
        vec![],
    )?;

    assert_eq!(h.scheduler.on_text_line("x"), 1);
    let report = h.tick_after(10);
    // Callbacks run even though the body is still waiting.
    assert!(report.resumed.is_empty());
    assert_eq!(log.entries(), vec!["x:"]);
    Ok(())
}

#[test]
fn explicit_dispatch_waits_for_do_events() -> TestResult {
    let mut h = SchedulerBuilder::new()
        .dispatch(EventDispatch::Explicit)
        .build();
    let log = Log::default();

    let cb_log = log.clone();
    let mut step = 0;
    h.scheduler.start_script(
        "manual",
        "manual",
        script_fn(move |cx| {
            step += 1;
            match step {
                1 => {
                    cx.register_event("x", "x", recording_callback(&cb_log, "x"))
                        .map_err(fault)?;
                }
                3 => {
                    assert_eq!(cx.pending_events(), 1);
                    assert_eq!(cx.do_events(), 1);
                }
                _ => {}
            }
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;

    h.scheduler.on_text_line("x");
    h.tick_after(10); // step 2
    assert!(log.entries().is_empty());
    h.tick_after(10); // step 3 drains
    assert_eq!(log.entries(), vec!["x:"]);
    Ok(())
}

#[test]
fn failing_callback_is_reported_and_draining_continues() -> TestResult {
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();

    let cb_log = log.clone();
    let mut registered = false;
    let pid = h.scheduler.start_script(
        "flaky",
        "flaky",
        script_fn(move |cx| {
            if !registered {
                cx.register_event(
                    "bad",
                    "#*#",
                    Box::new(
                        |_: &CapturedArgs, _: &mut ScriptContext<'_>| -> anyhow::Result<()> {
                            anyhow::bail!("callback exploded")
                        },
                    ),
                )
                .map_err(fault)?;
                cx.register_event("good", "#*#", recording_callback(&cb_log, "good"))
                    .map_err(fault)?;
                registered = true;
            }
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;
    h.scheduler.drain_status();

    h.scheduler.on_text_line("anything");
    h.tick_after(10);

    assert_eq!(log.entries(), vec!["good:"]);
    let errors: Vec<_> = h
        .scheduler
        .drain_status()
        .into_iter()
        .filter(|e| e.kind == StatusKind::Errored)
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("callback exploded"));
    // The thread itself is unaffected.
    assert_eq!(h.scheduler.live_pids(), vec![pid]);
    Ok(())
}

#[test]
fn callbacks_are_charged_against_the_budget() -> TestResult {
    let mut h = SchedulerBuilder::new().turbo(3).build();
    let log = Log::default();

    let steps = Log::default();
    let step_log = steps.clone();
    let cb_log = log.clone();
    let mut registered = false;
    h.scheduler.start_script(
        "busy",
        "busy",
        script_fn(move |cx| {
            if !registered {
                cx.register_event("e", "e", recording_callback(&cb_log, "e"))
                    .map_err(fault)?;
                registered = true;
                return Ok(Step::Yield(Wait::tick()));
            }
            step_log.push("step");
            Ok(Step::Continue)
        }),
        vec![],
    )?;

    h.scheduler.on_text_line("e");
    h.scheduler.on_text_line("e");
    h.tick_after(10);

    // Two callbacks plus one step fill a budget of three.
    assert_eq!(log.len(), 2);
    assert_eq!(steps.len(), 1);
    Ok(())
}

#[test]
fn unregister_inside_script_discards_queued_matches() -> TestResult {
    let mut h = SchedulerBuilder::new()
        .dispatch(EventDispatch::Explicit)
        .build();
    let log = Log::default();

    let cb_log = log.clone();
    let mut step = 0;
    h.scheduler.start_script(
        "fickle",
        "fickle",
        script_fn(move |cx| {
            step += 1;
            if step == 1 {
                cx.register_event("x", "x", recording_callback(&cb_log, "x"))
                    .map_err(fault)?;
            } else if step == 2 {
                assert!(cx.unregister_event("x"));
                assert_eq!(cx.do_events(), 0);
            }
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;

    h.scheduler.on_text_line("x");
    h.tick_after(10);
    assert!(log.entries().is_empty());
    Ok(())
}

#[test]
fn panicking_callback_is_a_callback_fault_and_later_matches_dispatch() -> TestResult {
    init_tracing();
    let mut h = SchedulerBuilder::new().build();
    let log = Log::default();

    let cb_log = log.clone();
    let mut registered = false;
    let pid = h.scheduler.start_script(
        "fragile",
        "fragile",
        script_fn(move |cx| {
            if !registered {
                cx.register_event(
                    "boom",
                    "#*#",
                    Box::new(
                        |_: &CapturedArgs, _: &mut ScriptContext<'_>| -> anyhow::Result<()> {
                            panic!("callback blew up")
                        },
                    ),
                )
                .map_err(fault)?;
                cx.register_event("seen", "#*#", recording_callback(&cb_log, "seen"))
                    .map_err(fault)?;
                registered = true;
            }
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;
    let bystander = h.scheduler.start_script("calm", "calm", listener(&log, &[]), vec![])?;
    h.scheduler.drain_status();

    h.scheduler.on_text_line("first");
    h.tick_after(10);
    h.scheduler.on_text_line("second");
    h.tick_after(10);

    assert_eq!(log.entries(), vec!["seen:", "seen:"]);
    let errors: Vec<_> = h
        .scheduler
        .drain_status()
        .into_iter()
        .filter(|e| e.kind == StatusKind::Errored)
        .collect();
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.message.contains("callback panicked: callback blew up")));
    assert_eq!(h.scheduler.live_pids(), vec![pid, bystander]);
    Ok(())
}

#[test]
fn panicking_callback_inside_a_step_does_not_end_the_thread() -> TestResult {
    init_tracing();
    let mut h = SchedulerBuilder::new().dispatch(EventDispatch::Explicit).build();
    let log = Log::default();

    let step_log = log.clone();
    let mut registered = false;
    let pid = h.scheduler.start_script(
        "drainer",
        "drainer",
        script_fn(move |cx| {
            if !registered {
                cx.register_event(
                    "boom",
                    "#*#",
                    Box::new(
                        |_: &CapturedArgs, _: &mut ScriptContext<'_>| -> anyhow::Result<()> {
                            panic!("callback blew up")
                        },
                    ),
                )
                .map_err(fault)?;
                registered = true;
            }
            let dispatched = cx.do_events();
            step_log.push(format!("drained {dispatched}"));
            Ok(Step::Yield(Wait::tick()))
        }),
        vec![],
    )?;

    h.scheduler.on_text_line("anything");
    h.tick_after(10);

    assert_eq!(log.entries(), vec!["drained 0", "drained 1"]);
    assert_eq!(h.scheduler.live_pids(), vec![pid]);
    Ok(())
}
