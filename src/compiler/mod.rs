//! Compiler module - Source code compilation
//!
//! Runs a language's compile command and keeps, per submission, the outcome
//! for each distinct generated source. Cases that render the same source
//! reuse the first compilation, successful or not.
//!
//! This module does NOT:
//! - Decide compile budgets (the supervisor passes them in)
//! - Delete build directories (the owning session does)

use std::collections::HashMap;
use std::future::Future;

use anyhow::Result;
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tracing::debug;

use crate::runner::{CommandSpec, RunLimits, RunStatus, Runner};
use crate::runtime::ProgramLayout;

/// Result of a compilation attempt
#[derive(Debug)]
pub struct CompileResult {
    pub success: bool,
    pub message: Option<String>,
}

/// Run a compile command within `time_limit_ms`
pub async fn compile_program(
    runner: &dyn Runner,
    compile_cmd: &CommandSpec,
    time_limit_ms: u64,
    output_limit_bytes: usize,
) -> Result<CompileResult> {
    debug!(
        "Compiling with {:?} (budget {}ms)",
        compile_cmd.to_vec(),
        time_limit_ms
    );

    let limits = RunLimits::new(time_limit_ms).with_output_limit(output_limit_bytes);
    let result = runner.run(compile_cmd, &limits, None).await?;

    if result.is_success() {
        return Ok(CompileResult {
            success: true,
            message: None,
        });
    }

    let error_msg = match result.status {
        RunStatus::TimeLimitExceeded => {
            format!("compilation exceeded its {}ms budget", time_limit_ms)
        }
        _ if !result.stderr.trim().is_empty() => result.stderr.trim().to_string(),
        _ if !result.stdout.trim().is_empty() => result.stdout.trim().to_string(),
        RunStatus::Signaled(signal) => format!("Compiler killed by signal {}", signal),
        RunStatus::OutputLimitExceeded => "Compiler output exceeded the limit".to_string(),
        RunStatus::Exited(code) => format!("Compilation failed with exit code {}", code),
    };

    Ok(CompileResult {
        success: false,
        message: Some(error_msg),
    })
}

/// Outcome of building one generated source
#[derive(Debug, Clone)]
pub enum Build {
    Ready(ProgramLayout),
    /// Compiler rejected the source
    Failed(String),
    /// The build could not be attempted (I/O, spawn failure)
    Unavailable(String),
}

/// Builds of one submission, keyed by SHA-256 of the generated source
#[derive(Debug, Default)]
pub struct CompileCache {
    builds: Mutex<HashMap<String, Build>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached build for `source`, or the result of `build` stored for next time.
    ///
    /// The lock is held while building, so concurrent cases wait for the first
    /// compilation instead of starting their own.
    pub async fn get_or_build<F, Fut>(&self, source: &str, build: F) -> Build
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Build>,
    {
        let key = source_key(source);
        let mut builds = self.builds.lock().await;
        if let Some(existing) = builds.get(&key) {
            debug!("Reusing build {}", &key[..12]);
            return existing.clone();
        }

        let built = build().await;
        builds.insert(key, built.clone());
        built
    }
}

pub fn source_key(source: &str) -> String {
    format!("{:x}", Sha256::digest(source.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::RunOutcome;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedRunner {
        status: RunStatus,
        stderr: &'static str,
        stdout: &'static str,
    }

    #[async_trait]
    impl Runner for FixedRunner {
        async fn run(
            &self,
            _cmd: &CommandSpec,
            _limits: &RunLimits,
            _stdin: Option<&str>,
        ) -> Result<RunOutcome> {
            Ok(RunOutcome {
                exit_code: 0,
                time_ms: 1.0,
                stdout: self.stdout.to_string(),
                stderr: self.stderr.to_string(),
                status: self.status.clone(),
            })
        }
    }

    fn layout() -> ProgramLayout {
        ProgramLayout {
            dir: PathBuf::from("/w"),
            source_path: PathBuf::from("/w/main.cpp"),
            binary_path: PathBuf::from("/w/prog"),
            class_name: String::new(),
        }
    }

    #[tokio::test]
    async fn test_compile_success() {
        let runner = FixedRunner {
            status: RunStatus::Exited(0),
            stderr: "warning: unused variable",
            stdout: "",
        };
        let result = compile_program(&runner, &CommandSpec::new("g++"), 1000, 1024)
            .await
            .unwrap();
        assert!(result.success);
        assert!(result.message.is_none());
    }

    #[tokio::test]
    async fn test_compile_error_prefers_stderr() {
        let runner = FixedRunner {
            status: RunStatus::Exited(1),
            stderr: "main.cpp:1: error: expected ';'\n",
            stdout: "ignored",
        };
        let result = compile_program(&runner, &CommandSpec::new("g++"), 1000, 1024)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.message.as_deref(), Some("main.cpp:1: error: expected ';'"));
    }

    #[tokio::test]
    async fn test_compile_timeout_message() {
        let runner = FixedRunner {
            status: RunStatus::TimeLimitExceeded,
            stderr: "",
            stdout: "",
        };
        let result = compile_program(&runner, &CommandSpec::new("javac"), 750, 1024)
            .await
            .unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("compilation exceeded its 750ms budget")
        );
    }

    #[tokio::test]
    async fn test_silent_failure_uses_exit_code() {
        let runner = FixedRunner {
            status: RunStatus::Exited(4),
            stderr: "",
            stdout: "",
        };
        let result = compile_program(&runner, &CommandSpec::new("g++"), 1000, 1024)
            .await
            .unwrap();
        assert_eq!(
            result.message.as_deref(),
            Some("Compilation failed with exit code 4")
        );
    }

    #[tokio::test]
    async fn test_cache_builds_each_source_once() {
        let cache = Arc::new(CompileCache::new());
        let builds = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..4 {
            let cache = Arc::clone(&cache);
            let builds = Arc::clone(&builds);
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_build("int main() {}", || async {
                        builds.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
                        Build::Ready(layout())
                    })
                    .await
            }));
        }
        for handle in handles {
            assert!(matches!(handle.await.unwrap(), Build::Ready(_)));
        }

        assert_eq!(builds.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_cache_remembers_failures() {
        let cache = CompileCache::new();
        let first = cache
            .get_or_build("bad", || async { Build::Failed("boom".into()) })
            .await;
        let second = cache
            .get_or_build("bad", || async { Build::Ready(layout()) })
            .await;
        assert!(matches!(first, Build::Failed(ref m) if m == "boom"));
        assert!(matches!(second, Build::Failed(ref m) if m == "boom"));
    }

    #[test]
    fn test_source_key_is_stable() {
        assert_eq!(source_key("a"), source_key("a"));
        assert_ne!(source_key("a"), source_key("b"));
        assert_eq!(source_key("").len(), 64);
    }
}
