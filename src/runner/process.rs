//! Process runner
//!
//! Runs a command as an ordinary child process. No isolation beyond:
//! - its own process group, killed as a whole on timeout and after exit
//! - an optional RLIMIT_AS applied between fork and exec
//! - capped stdout/stderr capture

use std::os::unix::process::ExitStatusExt;
use std::process::Stdio;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use nix::errno::Errno;
use nix::sys::resource::{setrlimit, Resource};
use nix::sys::signal::{killpg, Signal};
use nix::unistd::Pid;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CommandSpec, RunLimits, RunOutcome, RunStatus, Runner};

/// How long pipe readers may lag behind the exit of the child
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Runner that spawns programs directly on the host
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }

    /// Run a program to completion or until the wall-clock limit expires
    pub async fn execute(
        &self,
        cmd: &CommandSpec,
        limits: &RunLimits,
        stdin: Option<&str>,
    ) -> Result<RunOutcome> {
        debug!("Running {:?} (limit {}ms)", cmd.to_vec(), limits.time_ms);

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .process_group(0);

        for pair in &cmd.env {
            if let Some((key, value)) = pair.split_once('=') {
                command.env(key, value);
            }
        }
        if let Some(dir) = &cmd.work_dir {
            command.current_dir(dir);
        }
        if let Some(memory_mb) = limits.memory_mb {
            let bytes = u64::from(memory_mb) * 1024 * 1024;
            // SAFETY: the closure only calls setrlimit, which is async-signal-safe.
            unsafe {
                command.pre_exec(move || {
                    setrlimit(Resource::RLIMIT_AS, bytes, bytes).map_err(std::io::Error::from)
                });
            }
        }

        let started = Instant::now();
        let mut child = command
            .spawn()
            .with_context(|| format!("Failed to spawn {}", cmd.program))?;
        let group = child.id().map(|id| Pid::from_raw(id as i32));

        let stdout = child.stdout.take().context("Child stdout was not captured")?;
        let stderr = child.stderr.take().context("Child stderr was not captured")?;
        let stdout_reader = tokio::spawn(read_capped(stdout, limits.output_limit_bytes));
        let stderr_reader = tokio::spawn(read_capped(stderr, limits.output_limit_bytes));

        if let (Some(mut pipe), Some(input)) = (child.stdin.take(), stdin) {
            let input = input.to_owned();
            tokio::spawn(async move {
                // the program may exit without reading its input
                let _ = pipe.write_all(input.as_bytes()).await;
            });
        }

        let waited =
            tokio::time::timeout(Duration::from_millis(limits.time_ms), child.wait()).await;
        let elapsed = started.elapsed();

        // also reaps anything the program left running in its group
        if let Some(group) = group {
            kill_group(group);
        }

        let exit_status = match waited {
            Ok(status) => Some(status.context("Failed to wait for child process")?),
            Err(_) => {
                debug!(
                    "{} exceeded {}ms, process group killed",
                    cmd.program, limits.time_ms
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to reap timed out process {}: {}", cmd.program, e);
                }
                None
            }
        };

        let (stdout, stdout_truncated) = drain(stdout_reader).await;
        let (stderr, stderr_truncated) = drain(stderr_reader).await;

        let status = match exit_status {
            None => RunStatus::TimeLimitExceeded,
            Some(_) if stdout_truncated || stderr_truncated => RunStatus::OutputLimitExceeded,
            Some(status) => match status.code() {
                Some(code) => RunStatus::Exited(code),
                None => RunStatus::Signaled(status.signal().unwrap_or(0)),
            },
        };

        Ok(RunOutcome {
            exit_code: exit_status.and_then(|s| s.code()).unwrap_or(-1),
            time_ms: elapsed.as_secs_f64() * 1000.0,
            stdout,
            stderr,
            status,
        })
    }
}

#[async_trait]
impl Runner for ProcessRunner {
    async fn run(
        &self,
        cmd: &CommandSpec,
        limits: &RunLimits,
        stdin: Option<&str>,
    ) -> Result<RunOutcome> {
        self.execute(cmd, limits, stdin).await
    }
}

fn kill_group(group: Pid) {
    match killpg(group, Signal::SIGKILL) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to kill process group {}: {}", group, e),
    }
}

/// Read at most `cap` bytes; the flag reports whether the stream had more.
/// Dropping the pipe early makes further writes fail in the child.
async fn read_capped<R: AsyncRead + Unpin>(reader: R, cap: usize) -> std::io::Result<(Vec<u8>, bool)> {
    let mut buf = Vec::new();
    reader.take(cap as u64 + 1).read_to_end(&mut buf).await?;
    let truncated = buf.len() > cap;
    buf.truncate(cap);
    Ok((buf, truncated))
}

async fn drain(mut reader: JoinHandle<std::io::Result<(Vec<u8>, bool)>>) -> (String, bool) {
    match tokio::time::timeout(DRAIN_TIMEOUT, &mut reader).await {
        Ok(Ok(Ok((bytes, truncated)))) => (String::from_utf8_lossy(&bytes).into_owned(), truncated),
        Ok(Ok(Err(e))) => {
            warn!("Failed to read program output: {}", e);
            (String::new(), false)
        }
        Ok(Err(e)) => {
            warn!("Output reader task failed: {}", e);
            (String::new(), false)
        }
        Err(_) => {
            reader.abort();
            warn!("Output pipe still open {:?} after exit", DRAIN_TIMEOUT);
            (String::new(), false)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").with_args(["-c", script])
    }

    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let runner = ProcessRunner::new();
        let outcome = assert_ok!(runner.run(&sh("cat"), &RunLimits::new(5000), Some("hello\n")).await);
        assert_eq!(outcome.status, RunStatus::Exited(0));
        assert_eq!(outcome.stdout, "hello\n");
        assert!(outcome.time_ms > 0.0);
    }

    #[tokio::test]
    async fn test_exit_code_and_stderr() {
        let runner = ProcessRunner::new();
        let outcome = runner
            .run(&sh("echo oops >&2; exit 3"), &RunLimits::new(5000), None)
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::Exited(3));
        assert_eq!(outcome.exit_code, 3);
        assert_eq!(outcome.stderr, "oops\n");
    }

    #[tokio::test]
    async fn test_env_is_applied() {
        let runner = ProcessRunner::new();
        let cmd = sh("echo $JUDGE_TEST_VALUE").with_env(["JUDGE_TEST_VALUE=bar"]);
        let outcome = runner.run(&cmd, &RunLimits::new(5000), None).await.unwrap();
        assert_eq!(outcome.stdout, "bar\n");
    }

    #[tokio::test]
    async fn test_timeout_kills_process_group() {
        let runner = ProcessRunner::new();
        let started = Instant::now();
        // the background sleep holds the pipes open unless the whole group dies
        let outcome = runner
            .run(&sh("sleep 10 & sleep 10"), &RunLimits::new(200), None)
            .await
            .unwrap();
        assert_eq!(outcome.status, RunStatus::TimeLimitExceeded);
        assert_eq!(outcome.exit_code, -1);
        assert!(started.elapsed() < Duration::from_secs(3));
    }

    #[tokio::test]
    async fn test_output_cap() {
        let runner = ProcessRunner::new();
        let limits = RunLimits::new(5000).with_output_limit(1024);
        let outcome = runner.run(&sh("yes"), &limits, None).await.unwrap();
        assert_eq!(outcome.status, RunStatus::OutputLimitExceeded);
        assert_eq!(outcome.stdout.len(), 1024);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_an_error() {
        let runner = ProcessRunner::new();
        let cmd = CommandSpec::new("/nonexistent/codejudge-binary");
        assert_err!(runner.run(&cmd, &RunLimits::default(), None).await);
    }
}
