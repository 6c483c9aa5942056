// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory script tree. Clones share contents, so a test can keep a handle
/// and add scripts after the loader has taken its copy.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, String>>>,
    dirs: Arc<Mutex<HashSet<PathBuf>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file; parent directories come into existence implicitly.
    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<String>) {
        let path = path.as_ref().to_path_buf();
        {
            let mut dirs = lock(&self.dirs);
            let mut parent = path.parent();
            while let Some(dir) = parent {
                if dir.as_os_str().is_empty() {
                    break;
                }
                dirs.insert(dir.to_path_buf());
                parent = dir.parent();
            }
        }
        lock(&self.files).insert(path, content.into());
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) -> bool {
        lock(&self.files).remove(path.as_ref()).is_some()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl FileSystem for MockFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        match lock(&self.files).get(path) {
            Some(content) => Ok(content.clone()),
            None if self.is_dir(path) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        lock(&self.files).contains_key(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        lock(&self.dirs).contains(path)
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        // Paths are taken as already canonical.
        if self.exists(path) {
            Ok(path.to_path_buf())
        } else {
            Err(anyhow!("File not found: {:?}", path))
        }
    }
}
