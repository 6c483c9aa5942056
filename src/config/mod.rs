// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - `model.rs`: the TOML-backed raw model and the validated [`ConfigFile`].
//! - `loader.rs`: reading a file from disk.
//! - `validate.rs`: `RawConfigFile -> ConfigFile` plus duration parsing.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path, load_or_default};
pub use model::{ConfigFile, HostSection, RawConfigFile, SchedulerSection, ScriptsSection};
pub use validate::parse_duration;
