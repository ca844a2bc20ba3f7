//! Execution supervisor
//!
//! Drives each test case through its lifecycle:
//!
//! ```text
//! Pending -> [Compiling] -> Running -> Passed | Failed | TimedOut | RuntimeErrored
//!                 \-> CompileErrored
//! ```
//!
//! Compiled languages get half of the case budget for compilation (never less
//! than the configured floor) and the other half for running. A `Session`
//! holds everything shared by the cases of one submission: the program
//! identity, the compile cache and the build directories.
//!
//! Every failure ends up in the returned `ExecutionOutcome`; nothing here
//! returns an error for a single case.

use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde_json::Value;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::comparator;
use crate::compiler::{compile_program, Build, CompileCache};
use crate::core::{CaseState, ExecutionError, ExecutionOutcome, ExecutionRequest, JudgeError};
use crate::detector::{resolve_mode, ProgramMode};
use crate::harness::{extract_captured, parse_function_result};
use crate::languages::Language;
use crate::runner::{RunLimits, RunStatus, Runner};
use crate::runtime::{
    LanguageRuntime, ProgramIdentity, ProgramLayout, RenderRequest, RenderedProgram,
    RuntimeRegistry,
};
use crate::workdir::{Scratch, WorkDir};

/// Limits applied by the supervisor.
///
/// Compilation normally gets half of a case's time limit. With the default
/// `compile_budget_floor_ms` of 10s, a compiler may run past that half when
/// the limit is below 20s; only the run half stays strict. Set the floor to 0
/// to fail compilation exactly at half the limit.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Stdout/stderr cap per process
    pub output_limit_bytes: usize,
    /// Lower bound for the compile half of the budget, which may exceed half the limit
    pub compile_budget_floor_ms: u64,
    /// Processes allowed to run at once across all submissions
    pub max_concurrent_executions: usize,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            output_limit_bytes: 1 << 20,
            compile_budget_floor_ms: 10_000,
            max_concurrent_executions: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4),
        }
    }
}

/// Compile budget for a case budget of `time_limit_ms`
pub fn compile_budget(time_limit_ms: u64, floor_ms: u64) -> u64 {
    (time_limit_ms / 2).max(floor_ms)
}

/// Run budget left for compiled languages
pub fn run_budget(time_limit_ms: u64) -> u64 {
    time_limit_ms - time_limit_ms / 2
}

pub struct ExecutionSupervisor {
    registry: Arc<RuntimeRegistry>,
    runner: Arc<dyn Runner>,
    work_dir: WorkDir,
    config: SupervisorConfig,
    permits: Semaphore,
}

impl ExecutionSupervisor {
    pub fn new(
        registry: Arc<RuntimeRegistry>,
        runner: Arc<dyn Runner>,
        work_dir: WorkDir,
        config: SupervisorConfig,
    ) -> Self {
        let permits = Semaphore::new(config.max_concurrent_executions.max(1));
        Self {
            registry,
            runner,
            work_dir,
            config,
            permits,
        }
    }

    pub fn registry(&self) -> &RuntimeRegistry {
        &self.registry
    }

    /// Open a session for one submission
    pub fn session(
        &self,
        language: Language,
        code: &str,
        is_full_program: Option<bool>,
        memory_limit_mb: u32,
    ) -> Result<Session<'_>, JudgeError> {
        let runtime = self
            .registry
            .get(language)
            .ok_or_else(|| JudgeError::UnsupportedLanguage(language.to_string()))?;
        let mode = resolve_mode(code, language, is_full_program);
        let memory_limit_mb = runtime.config().calculate_memory_limit(memory_limit_mb);
        let identity = ProgramIdentity::generate();

        debug!(
            "Session {} opened: language={}, mode={:?}, memory={}MB",
            identity.id, language, mode, memory_limit_mb
        );

        Ok(Session {
            supervisor: self,
            runtime,
            code: code.to_string(),
            mode,
            memory_limit_mb,
            identity,
            builds: CompileCache::new(),
            build_dirs: Mutex::new(Vec::new()),
        })
    }

    /// Execute a single request in its own session
    pub async fn execute(&self, request: &ExecutionRequest) -> ExecutionOutcome {
        let memory_limit_mb = request.memory_limit_mb.unwrap_or(256);
        let session = match self.session(
            request.language,
            &request.code,
            request.is_full_program,
            memory_limit_mb,
        ) {
            Ok(session) => session,
            Err(e) => {
                let error = ExecutionError::Infrastructure(e.to_string());
                return ExecutionOutcome::from_error(&error, None, &request.expected_output, 0.0);
            }
        };

        let outcome = session
            .run_case(
                0,
                &request.input,
                &request.expected_output,
                request.time_limit_ms,
            )
            .await;
        session.close();
        outcome
    }
}

/// Failure of one case with whatever was known when it failed
struct CaseFailure {
    error: ExecutionError,
    output: Option<Value>,
    time_ms: f64,
}

impl From<ExecutionError> for CaseFailure {
    fn from(error: ExecutionError) -> Self {
        Self {
            error,
            output: None,
            time_ms: 0.0,
        }
    }
}

impl From<anyhow::Error> for CaseFailure {
    fn from(err: anyhow::Error) -> Self {
        ExecutionError::from(err).into()
    }
}

/// Logs each state change of one case
struct Transitions<'a> {
    session: &'a str,
    case: usize,
    state: CaseState,
}

impl Transitions<'_> {
    fn enter(&mut self, next: CaseState) {
        debug!(
            "[{}] case {}: {} -> {}",
            self.session, self.case, self.state, next
        );
        self.state = next;
    }
}

/// State shared by the cases of one submission
pub struct Session<'a> {
    supervisor: &'a ExecutionSupervisor,
    runtime: Arc<dyn LanguageRuntime>,
    code: String,
    mode: ProgramMode,
    memory_limit_mb: u32,
    identity: ProgramIdentity,
    builds: CompileCache,
    build_dirs: Mutex<Vec<Scratch>>,
}

impl Session<'_> {
    pub fn mode(&self) -> ProgramMode {
        self.mode
    }

    /// Execute one case. Always yields an outcome in a terminal state.
    pub async fn run_case(
        &self,
        index: usize,
        input: &Value,
        expected: &Value,
        time_limit_ms: u64,
    ) -> ExecutionOutcome {
        let mut transitions = Transitions {
            session: &self.identity.id,
            case: index,
            state: CaseState::Pending,
        };

        let outcome = match self
            .try_run_case(&mut transitions, input, expected, time_limit_ms)
            .await
        {
            Ok(outcome) => outcome,
            Err(failure) => ExecutionOutcome::from_error(
                &failure.error,
                failure.output,
                expected,
                failure.time_ms,
            ),
        };

        transitions.enter(outcome.status);
        outcome
    }

    async fn try_run_case(
        &self,
        transitions: &mut Transitions<'_>,
        input: &Value,
        expected: &Value,
        time_limit_ms: u64,
    ) -> Result<ExecutionOutcome, CaseFailure> {
        let _permit = self
            .supervisor
            .permits
            .acquire()
            .await
            .map_err(|_| ExecutionError::Infrastructure("execution pool is closed".into()))?;

        let program = self.runtime.render(&RenderRequest {
            code: &self.code,
            mode: self.mode,
            input,
            identity: &self.identity,
        });

        if self.runtime.requires_compilation() {
            transitions.enter(CaseState::Compiling);
            let budget = compile_budget(
                time_limit_ms,
                self.supervisor.config.compile_budget_floor_ms,
            );
            let build = self
                .builds
                .get_or_build(&program.source, || self.build(&program.source, budget))
                .await;
            let layout = match build {
                Build::Ready(layout) => layout,
                Build::Failed(message) => return Err(ExecutionError::Compilation(message).into()),
                Build::Unavailable(message) => {
                    return Err(ExecutionError::Infrastructure(message).into())
                }
            };

            transitions.enter(CaseState::Running);
            self.execute(&layout, &program, run_budget(time_limit_ms), expected)
                .await
        } else {
            let scratch = self.supervisor.work_dir.scratch("run")?;
            let layout = self.runtime.layout(scratch.path(), &self.identity);
            scratch
                .write_file(&layout.source_file_name(), &program.source)
                .await?;

            transitions.enter(CaseState::Running);
            let result = self.execute(&layout, &program, time_limit_ms, expected).await;
            scratch.close();
            result
        }
    }

    async fn build(&self, source: &str, budget_ms: u64) -> Build {
        match self.try_build(source, budget_ms).await {
            Ok(build) => build,
            Err(e) => Build::Unavailable(format!("{:#}", e)),
        }
    }

    async fn try_build(&self, source: &str, budget_ms: u64) -> anyhow::Result<Build> {
        let scratch = self.supervisor.work_dir.scratch("build")?;
        let layout = self.runtime.layout(scratch.path(), &self.identity);
        self.build_dirs
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(scratch);

        tokio::fs::write(&layout.source_path, source)
            .await
            .with_context(|| format!("Failed to write {:?}", layout.source_path))?;
        let cmd = self
            .runtime
            .compile_command(&layout)
            .context("Language has no compile command")?;

        info!(
            "[{}] Compiling {} program (budget {}ms)",
            self.identity.id,
            self.runtime.language(),
            budget_ms
        );
        let result = compile_program(
            self.supervisor.runner.as_ref(),
            &cmd,
            budget_ms,
            self.supervisor.config.output_limit_bytes,
        )
        .await?;

        Ok(if result.success {
            Build::Ready(layout)
        } else {
            Build::Failed(result.message.unwrap_or_default())
        })
    }

    async fn execute(
        &self,
        layout: &ProgramLayout,
        program: &RenderedProgram,
        budget_ms: u64,
        expected: &Value,
    ) -> Result<ExecutionOutcome, CaseFailure> {
        let memory_mb = self
            .runtime
            .limits_address_space()
            .then_some(self.memory_limit_mb);
        let limits = RunLimits::new(budget_ms)
            .with_memory_mb(memory_mb)
            .with_output_limit(self.supervisor.config.output_limit_bytes);
        let cmd = self.runtime.run_command(layout, self.memory_limit_mb);

        let run = self
            .supervisor
            .runner
            .run(&cmd, &limits, program.stdin.as_deref())
            .await?;
        let time_ms = run.time_ms;
        let fail = |error: ExecutionError, output: Option<Value>| CaseFailure {
            error,
            output,
            time_ms,
        };

        match run.status {
            RunStatus::TimeLimitExceeded => Err(fail(ExecutionError::TimeLimitExceeded, None)),
            RunStatus::OutputLimitExceeded => Err(fail(
                ExecutionError::Runtime("Output Limit Exceeded".to_string()),
                None,
            )),
            RunStatus::Signaled(signal) => Err(fail(
                runtime_error(&run.stderr, || format!("Process killed by signal {}", signal)),
                None,
            )),
            RunStatus::Exited(code) if code != 0 => Err(fail(
                runtime_error(&run.stderr, || format!("Process exited with code {}", code)),
                None,
            )),
            RunStatus::Exited(_) => {
                let captured =
                    extract_captured(&run.stdout, &program.sentinel).map_err(|e| fail(e, None))?;

                match self.mode {
                    ProgramMode::Function => {
                        let actual = parse_function_result(captured).map_err(|e| {
                            fail(e, Some(Value::String(captured.trim().to_string())))
                        })?;
                        let passed = comparator::compare(&actual, expected);
                        Ok(ExecutionOutcome::compared(passed, actual, expected, time_ms))
                    }
                    ProgramMode::FullProgram => {
                        let comparison = comparator::compare_raw(captured, expected);
                        Ok(ExecutionOutcome::compared(
                            comparison.passed,
                            comparison.actual,
                            expected,
                            time_ms,
                        ))
                    }
                }
            }
        }
    }

    /// Remove build directories. Per-case directories are already gone.
    pub fn close(self) {
        let dirs = self
            .build_dirs
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        for dir in dirs {
            dir.close();
        }
        debug!("Session {} closed", self.identity.id);
    }
}

fn runtime_error(stderr: &str, fallback: impl FnOnce() -> String) -> ExecutionError {
    let stderr = stderr.trim();
    if stderr.is_empty() {
        ExecutionError::Runtime(fallback())
    } else {
        ExecutionError::Runtime(stderr.to_string())
    }
}
