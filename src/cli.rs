// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `scriptpulse`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scriptpulse",
    version,
    about = "Run step scripts cooperatively on a fixed heartbeat.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// If omitted, `Scriptpulse.toml` is used when present, otherwise the
    /// built-in defaults.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRIPTPULSE_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Override `[scheduler].turbo`.
    #[arg(long, value_name = "STEPS")]
    pub turbo: Option<u32>,

    /// Override `[scripts].dir`.
    #[arg(long, value_name = "DIR")]
    pub script_dir: Option<PathBuf>,

    /// Run this source string instead of a script file.
    #[arg(long, value_name = "SOURCE", conflicts_with = "script")]
    pub parse: Option<String>,

    /// Keep running after all scripts end, until stdin closes.
    #[arg(long)]
    pub keep_alive: bool,

    /// Load and validate config, print it, and exit.
    #[arg(long)]
    pub dry_run: bool,

    /// Script to run.
    #[arg(value_name = "SCRIPT")]
    pub script: Option<String>,

    /// Arguments passed to the script.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
