// src/exec/backend.rs

//! Pluggable script loading.
//!
//! The scheduler asks a [`ScriptLoader`] to turn a script identity into a
//! canonical path and then into a runnable [`Script`]. Production uses
//! [`FileScriptLoader`] over the real filesystem; tests hand it a
//! `MockFileSystem` instead.

use std::fmt::Debug;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::errors::StartError;
use crate::exec::Script;
use crate::exec::text;
use crate::fs::FileSystem;

pub trait ScriptLoader: Debug {
    /// Find the file `identity` names under one of `search_paths`.
    fn resolve(&self, identity: &str, search_paths: &[PathBuf]) -> Result<PathBuf, StartError>;

    fn load(&self, path: &Path) -> Result<Box<dyn Script>, StartError>;

    /// Build a script from inline source (the `parse` command).
    fn load_source(&self, label: &str, source: &str) -> Result<Box<dyn Script>, StartError>;
}

/// Loads step scripts from a [`FileSystem`].
///
/// Resolution order for identity `foo` in each search directory:
/// `<dir>/foo.<ext>`, then `<dir>/foo/init.<ext>`. An identity that already
/// has an extension is looked up as given.
#[derive(Debug, Clone)]
pub struct FileScriptLoader {
    fs: Arc<dyn FileSystem>,
    extension: String,
}

impl FileScriptLoader {
    pub fn new(fs: Arc<dyn FileSystem>, extension: impl Into<String>) -> Self {
        let extension = extension.into();
        Self {
            fs,
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    fn candidates(&self, identity: &str, dir: &Path) -> Vec<PathBuf> {
        let base = dir.join(identity);
        if Path::new(identity).extension().is_some() {
            return vec![base];
        }
        vec![
            dir.join(format!("{identity}.{}", self.extension)),
            base.join(format!("init.{}", self.extension)),
        ]
    }
}

impl ScriptLoader for FileScriptLoader {
    fn resolve(&self, identity: &str, search_paths: &[PathBuf]) -> Result<PathBuf, StartError> {
        let not_found = || StartError::ScriptNotFound {
            script: identity.to_string(),
            searched: search_paths.to_vec(),
        };

        let identity = identity.trim();
        if identity.is_empty() {
            return Err(not_found());
        }

        let direct = Path::new(identity);
        let dirs: Vec<PathBuf> = if direct.is_absolute() {
            vec![PathBuf::new()]
        } else {
            search_paths.to_vec()
        };

        for dir in dirs.iter() {
            for candidate in self.candidates(identity, dir) {
                if self.fs.is_file(&candidate) {
                    debug!(script = %identity, path = ?candidate, "resolved script");
                    return self.fs.canonicalize(&candidate).map_err(|e| StartError::Load {
                        path: candidate.clone(),
                        message: format!("{e:#}"),
                    });
                }
            }
        }

        Err(not_found())
    }

    fn load(&self, path: &Path) -> Result<Box<dyn Script>, StartError> {
        let source = self.fs.read_to_string(path).map_err(|e| StartError::Load {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        })?;
        self.load_source(&path.display().to_string(), &source)
            .map_err(|e| match e {
                StartError::Load { message, .. } => StartError::Load {
                    path: path.to_path_buf(),
                    message,
                },
                other => other,
            })
    }

    fn load_source(&self, label: &str, source: &str) -> Result<Box<dyn Script>, StartError> {
        let script = text::compile(source).map_err(|e| StartError::Load {
            path: PathBuf::from(label),
            message: e.to_string(),
        })?;
        Ok(Box::new(script))
    }
}
