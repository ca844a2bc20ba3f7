//! Scratch directories for program artifacts
//!
//! `WorkDir` is created once at startup and handed to the supervisor. Every
//! invocation (or submission session) gets its own randomly named `Scratch`
//! below it, removed on `close()` or, failing that, on drop.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;
use tracing::warn;

/// Root under which all scratch directories live
#[derive(Debug, Clone)]
pub struct WorkDir {
    root: PathBuf,
}

impl WorkDir {
    /// Use `root`, creating it if needed
    pub fn create(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create work directory {:?}", root))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// New uniquely named directory for one invocation
    pub fn scratch(&self, label: &str) -> Result<Scratch> {
        let dir = tempfile::Builder::new()
            .prefix(&format!("{}-", label))
            .tempdir_in(&self.root)
            .with_context(|| format!("Failed to create scratch directory in {:?}", self.root))?;
        Ok(Scratch { dir: Some(dir) })
    }
}

/// A scratch directory owned by one invocation
#[derive(Debug)]
pub struct Scratch {
    dir: Option<TempDir>,
}

impl Scratch {
    pub fn path(&self) -> &Path {
        self.dir
            .as_ref()
            .map(TempDir::path)
            .unwrap_or_else(|| Path::new(""))
    }

    /// Write a file into the directory and return its path
    pub async fn write_file(&self, name: &str, contents: &str) -> Result<PathBuf> {
        let path = self.path().join(name);
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {:?}", path))?;
        Ok(path)
    }

    /// Remove the directory now. Failures are logged, never returned.
    pub fn close(mut self) {
        if let Some(dir) = self.dir.take() {
            let path = dir.path().to_path_buf();
            if let Err(e) = dir.close() {
                warn!("Failed to remove scratch directory {:?}: {}", path, e);
            }
        }
    }
}
