// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::Result;

pub const CONFIG_ENV: &str = "SCRIPTPULSE_CONFIG";

/// Load a configuration file and return the raw, unvalidated form.
///
/// Only TOML deserialization happens here. Use [`load_and_validate`] to get a
/// [`ConfigFile`].
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load, apply defaults, and validate.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let raw_config = load_from_path(&path)?;
    let config = ConfigFile::try_from(raw_config)?;
    Ok(config)
}

/// Like [`load_and_validate`], but a missing file yields the defaults.
pub fn load_or_default(path: impl AsRef<Path>) -> Result<ConfigFile> {
    let path = path.as_ref();
    if !path.exists() {
        return ConfigFile::try_from(RawConfigFile::default());
    }
    load_and_validate(path)
}

/// `SCRIPTPULSE_CONFIG` if set, otherwise `Scriptpulse.toml` in the working
/// directory.
pub fn default_config_path() -> PathBuf {
    std::env::var_os(CONFIG_ENV)
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("Scriptpulse.toml"))
}
