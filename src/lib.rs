// src/lib.rs

pub mod cli;
pub mod clock;
pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod thread;
pub mod types;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::clock::SystemClock;
use crate::config::{ConfigFile, default_config_path, load_and_validate, load_or_default};
use crate::engine::{HostEvent, HostOptions, HostRuntime, Scheduler, SchedulerOptions};
use crate::exec::FileScriptLoader;
use crate::fs::RealFileSystem;

/// High-level entry point used by `main.rs`.
///
/// Wires together config loading, the scheduler, the stdin reader that
/// turns lines into host events, Ctrl-C handling, and the host runtime.
pub async fn run(args: CliArgs) -> Result<()> {
    let mut cfg = match &args.config {
        Some(path) => load_and_validate(path)
            .with_context(|| format!("loading config {}", path.display()))?,
        None => load_or_default(default_config_path())?,
    };
    apply_overrides(&mut cfg, &args);

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    let mut scheduler = build_scheduler(&cfg);

    if let Some(source) = &args.parse {
        scheduler.parse(source)?;
    } else if let Some(script) = &args.script {
        scheduler.run(script, args.args.clone())?;
    } else if !args.keep_alive {
        warn!("nothing to run; pass a script, --parse, or --keep-alive");
        return Ok(());
    }

    let (tx, rx) = mpsc::channel::<HostEvent>(64);
    spawn_stdin_reader(tx.clone());

    // Ctrl-C → graceful shutdown.
    {
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            let _ = tx.send(HostEvent::Shutdown).await;
        });
    }
    drop(tx);

    let options = HostOptions {
        pulse_interval: cfg.host.pulse_interval,
        squelch_status: cfg.host.squelch_status,
        keep_alive: args.keep_alive,
    };

    let runtime = HostRuntime::new(scheduler, rx, options);
    runtime.run().await?;
    Ok(())
}

/// Scheduler over the real filesystem and system clock.
pub fn build_scheduler(cfg: &ConfigFile) -> Scheduler {
    let loader = FileScriptLoader::new(Arc::new(RealFileSystem), cfg.scripts.extension.clone());
    Scheduler::new(
        SchedulerOptions::from_config(cfg),
        Arc::new(SystemClock),
        Box::new(loader),
        cfg.scripts.all_search_paths(),
    )
}

fn apply_overrides(cfg: &mut ConfigFile, args: &CliArgs) {
    if let Some(turbo) = args.turbo {
        cfg.scheduler.turbo = turbo.max(1);
    }
    if let Some(dir) = &args.script_dir {
        cfg.scripts.dir = dir.clone();
    }
}

/// Every stdin line becomes a host event; `/`-prefixed lines are commands.
fn spawn_stdin_reader(tx: mpsc::Sender<HostEvent>) {
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => match HostEvent::from_line(&line) {
                    Ok(event) => {
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Err(msg) => eprintln!("{msg}"),
                },
                Ok(None) => {
                    debug!("stdin closed");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "failed reading stdin");
                    break;
                }
            }
        }
    });
}

fn print_dry_run(cfg: &ConfigFile) {
    println!("scriptpulse dry-run");
    println!("  scheduler.turbo = {}", cfg.scheduler.turbo);
    match cfg.scheduler.info_gc {
        Some(d) => println!("  scheduler.info_gc = {d:?}"),
        None => println!("  scheduler.info_gc = disabled"),
    }
    println!("  scheduler.event_dispatch = {:?}", cfg.scheduler.event_dispatch);
    if let Some(limit) = cfg.scheduler.event_queue_limit {
        println!("  scheduler.event_queue_limit = {limit}");
    }
    println!("  scripts.extension = {}", cfg.scripts.extension);
    println!("  search paths:");
    for path in cfg.scripts.all_search_paths() {
        println!("    - {}", path.display());
    }
    println!("  host.pulse_interval = {:?}", cfg.host.pulse_interval);
    println!("  host.squelch_status = {}", cfg.host.squelch_status);

    info!("dry-run complete (no scripts run)");
}
