//! Runner module - Execution abstraction layer
//!
//! This module provides a unified interface for running programs. The
//! supervisor only sees the `Runner` trait; `ProcessRunner` is the real
//! implementation and tests plug in scripted runners.
//!
//! The runner module does NOT:
//! - Compare outputs or determine verdicts
//! - Cache compiled binaries
//! - Know about languages or harnesses

pub mod process;

use anyhow::Result;
use async_trait::async_trait;
use std::path::Path;

/// Command specification for execution
#[derive(Debug, Clone, PartialEq)]
pub struct CommandSpec {
    /// Program path or name
    pub program: String,
    /// Arguments to the program
    pub args: Vec<String>,
    /// Environment variables (key=value)
    pub env: Vec<String>,
    /// Working directory
    pub work_dir: Option<std::path::PathBuf>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            work_dir: None,
        }
    }

    pub fn with_args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args = args.into_iter().map(|a| a.into()).collect();
        self
    }

    pub fn with_env(mut self, env: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.env = env.into_iter().map(|e| e.into()).collect();
        self
    }

    pub fn with_work_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.work_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Create from a command vector (first element is program, rest are args)
    pub fn from_vec(cmd: &[String]) -> Self {
        let mut iter = cmd.iter();
        let program = iter.next().cloned().unwrap_or_default();
        Self::new(program).with_args(iter.cloned())
    }

    /// Convert to a vector of strings (program + args)
    pub fn to_vec(&self) -> Vec<String> {
        let mut v = vec![self.program.clone()];
        v.extend(self.args.iter().cloned());
        v
    }
}

/// Resource limits for execution
#[derive(Debug, Clone, PartialEq)]
pub struct RunLimits {
    /// Wall-clock limit in milliseconds
    pub time_ms: u64,
    /// Address-space limit in MB (None = unlimited)
    pub memory_mb: Option<u32>,
    /// Cap on captured stdout and stderr, each
    pub output_limit_bytes: usize,
}

impl RunLimits {
    pub fn new(time_ms: u64) -> Self {
        Self {
            time_ms,
            ..Self::default()
        }
    }

    pub fn with_memory_mb(mut self, memory_mb: Option<u32>) -> Self {
        self.memory_mb = memory_mb;
        self
    }

    pub fn with_output_limit(mut self, bytes: usize) -> Self {
        self.output_limit_bytes = bytes;
        self
    }
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            time_ms: 1000,
            memory_mb: None,
            output_limit_bytes: 1 << 20,
        }
    }
}

/// Execution status (raw, no verdict interpretation)
#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    /// Program exited normally with given exit code
    Exited(i32),
    /// Still running when the wall-clock limit expired; the process group was killed
    TimeLimitExceeded,
    /// Killed by signal
    Signaled(i32),
    /// Wrote more than the output cap
    OutputLimitExceeded,
}

impl RunStatus {
    /// Check if execution was successful (exited with code 0)
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Exited(0))
    }
}

/// Outcome of running a program
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Exit code (-1 if not applicable)
    pub exit_code: i32,
    /// Wall-clock time in milliseconds
    pub time_ms: f64,
    /// Stdout content
    pub stdout: String,
    /// Stderr content
    pub stderr: String,
    /// Execution status
    pub status: RunStatus,
}

impl RunOutcome {
    /// Check if execution was successful
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Runner trait for executing programs
#[async_trait]
pub trait Runner: Send + Sync {
    /// Run a command with the given limits and optional stdin
    async fn run(
        &self,
        cmd: &CommandSpec,
        limits: &RunLimits,
        stdin: Option<&str>,
    ) -> Result<RunOutcome>;
}

// Re-exports
pub use process::ProcessRunner;
