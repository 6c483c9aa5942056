// tests/host_runtime.rs

mod common;
use crate::common::builders::{SchedulerBuilder, idle_script};
use crate::common::{init_tracing, with_timeout};

use std::time::Duration;

use tokio::sync::mpsc;

use scriptpulse::engine::{HostEvent, HostOptions, HostRuntime, StatusEvent, StatusKind};
use scriptpulse::thread::ThreadStatus;
use scriptpulse::types::Target;

fn options(keep_alive: bool) -> HostOptions {
    HostOptions {
        pulse_interval: Duration::from_millis(5),
        squelch_status: false,
        keep_alive,
    }
}

fn collect(rx: &mut mpsc::UnboundedReceiver<StatusEvent>) -> Vec<StatusEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        out.push(event);
    }
    out
}

#[tokio::test]
async fn exits_once_the_last_script_finishes() {
    init_tracing();
    let mut h = SchedulerBuilder::new().script("quick", "return done").build();
    h.scheduler.run("quick", vec![]).unwrap();

    let (_tx, rx) = mpsc::channel(8);
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    let runtime = HostRuntime::new(h.scheduler, rx, options(false)).with_status_sink(status_tx);

    let scheduler = with_timeout(runtime.run()).await.unwrap();
    assert!(scheduler.is_idle());

    let kinds: Vec<_> = collect(&mut status_rx).into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![StatusKind::Started, StatusKind::Ended]);
}

#[tokio::test]
async fn host_events_drive_the_scheduler() {
    init_tracing();
    let h = SchedulerBuilder::new()
        .script(
            "echo",
            "event say say {what}\n:top\nifset what out\nyield\ngoto top\n:out\nprint heard $what\nreturn\n",
        )
        .build();

    let (tx, rx) = mpsc::channel(8);
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    tx.send(HostEvent::from_line("/run echo").unwrap()).await.unwrap();
    tx.send(HostEvent::from_line("say hi").unwrap()).await.unwrap();
    drop(tx);

    let runtime = HostRuntime::new(h.scheduler, rx, options(true)).with_status_sink(status_tx);
    let scheduler = with_timeout(runtime.run()).await.unwrap();

    let info = scheduler.info(&Target::Name("echo".into())).expect("echo ran");
    assert_eq!(info.status, ThreadStatus::Exited);

    let output: Vec<_> = collect(&mut status_rx)
        .into_iter()
        .filter(|e| e.kind == StatusKind::Output)
        .map(|e| e.to_string())
        .collect();
    assert_eq!(output, vec![format!("[echo:{}] heard hi", info.pid)]);
}

#[tokio::test]
async fn shutdown_stops_everything() {
    init_tracing();
    let mut h = SchedulerBuilder::new().build();
    let pid = h
        .scheduler
        .start_script("idle", "idle", idle_script(), vec![])
        .unwrap();

    let (tx, rx) = mpsc::channel(8);
    let (status_tx, _status_rx) = mpsc::unbounded_channel();
    tx.send(HostEvent::Shutdown).await.unwrap();

    let runtime = HostRuntime::new(h.scheduler, rx, options(true)).with_status_sink(status_tx);
    let scheduler = with_timeout(runtime.run()).await.unwrap();
    drop(tx);

    assert!(scheduler.is_idle());
    assert_eq!(
        scheduler.info(&Target::Pid(pid)).map(|i| i.status),
        Some(ThreadStatus::Exited)
    );
}

#[tokio::test]
async fn squelch_hides_lifecycle_but_not_notices() {
    init_tracing();
    let h = SchedulerBuilder::new()
        .script("chatty", "print hello\nreturn\n")
        .build();

    let (tx, rx) = mpsc::channel(8);
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    tx.send(HostEvent::from_line("/run chatty").unwrap()).await.unwrap();
    tx.send(HostEvent::from_line("/run nowhere").unwrap()).await.unwrap();
    drop(tx);

    let options = HostOptions {
        squelch_status: true,
        ..options(true)
    };
    let runtime = HostRuntime::new(h.scheduler, rx, options).with_status_sink(status_tx);
    with_timeout(runtime.run()).await.unwrap();

    let kinds: Vec<_> = collect(&mut status_rx).into_iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![StatusKind::Output, StatusKind::Notice]);
}

#[tokio::test]
async fn ps_and_info_are_reported_as_notices() {
    init_tracing();
    let mut h = SchedulerBuilder::new().build();
    h.scheduler
        .start_script("idle", "idle", idle_script(), vec!["a".into(), "b".into()])
        .unwrap();
    h.scheduler.drain_status();

    let (tx, rx) = mpsc::channel(8);
    let (status_tx, mut status_rx) = mpsc::unbounded_channel();
    tx.send(HostEvent::from_line("/ps").unwrap()).await.unwrap();
    tx.send(HostEvent::from_line("/info idle").unwrap()).await.unwrap();
    tx.send(HostEvent::from_line("/quit").unwrap()).await.unwrap();

    let runtime = HostRuntime::new(h.scheduler, rx, options(true)).with_status_sink(status_tx);
    with_timeout(runtime.run()).await.unwrap();
    drop(tx);

    let lines: Vec<_> = collect(&mut status_rx)
        .into_iter()
        .filter(|e| e.kind == StatusKind::Notice)
        .map(|e| e.message)
        .collect();
    assert!(lines[0].contains("PID") && lines[0].contains("STATUS"));
    assert!(lines[1].contains("idle") && lines[1].contains("RUNNING"));
    assert!(lines.contains(&"arguments: a b".to_string()));
}

#[test]
fn command_lines_parse_into_host_events() {
    assert_eq!(
        HostEvent::from_line("hello there"),
        Ok(HostEvent::TextLine("hello there".into()))
    );
    assert_eq!(
        HostEvent::from_line("/run greet bob 2"),
        Ok(HostEvent::Run {
            script: "greet".into(),
            args: vec!["bob".into(), "2".into()],
        })
    );
    assert_eq!(
        HostEvent::from_line("/parse print a\\nreturn"),
        Ok(HostEvent::Parse("print a\nreturn".into()))
    );
    assert_eq!(HostEvent::from_line("/stop"), Ok(HostEvent::Stop(Target::All)));
    assert_eq!(HostEvent::from_line("/stop 3"), Ok(HostEvent::Stop(Target::Pid(3))));
    assert_eq!(HostEvent::from_line("/stop all"), Ok(HostEvent::Stop(Target::All)));
    assert_eq!(HostEvent::from_line("/pause ALL"), Ok(HostEvent::Pause(Target::All)));
    assert_eq!(
        HostEvent::from_line("/pause greet"),
        Ok(HostEvent::Pause(Target::Name("greet".into())))
    );
    assert_eq!(HostEvent::from_line("/ps"), Ok(HostEvent::List(None)));
    assert_eq!(
        HostEvent::from_line("/ps exited errored"),
        Ok(HostEvent::List(Some(vec![
            ThreadStatus::Exited,
            ThreadStatus::Errored
        ])))
    );
    assert_eq!(HostEvent::from_line("/info"), Ok(HostEvent::Info(Target::All)));
    assert_eq!(HostEvent::from_line("/QUIT"), Ok(HostEvent::Shutdown));

    assert!(HostEvent::from_line("/run").is_err());
    assert!(HostEvent::from_line("/parse").is_err());
    assert!(HostEvent::from_line("/ps asleep").is_err());
    assert!(HostEvent::from_line("/fly").is_err());
}
