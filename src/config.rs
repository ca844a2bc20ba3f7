//! Worker configuration from environment variables
//!
//! `.env` is loaded by the binary before `JudgeConfig::from_env` runs.
//! Every variable is optional; malformed values are errors.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

use crate::supervisor::SupervisorConfig;

#[derive(Debug, Clone)]
pub struct JudgeConfig {
    /// Root for scratch directories (JUDGE_WORK_DIR)
    pub work_dir: PathBuf,
    /// Worker pool size across submissions (JUDGE_MAX_CONCURRENCY)
    pub max_concurrent_executions: usize,
    /// Cases of one submission in flight at once (JUDGE_PARALLEL_CASES)
    pub max_parallel_cases: usize,
    /// JUDGE_OUTPUT_LIMIT_BYTES
    pub output_limit_bytes: usize,
    /// JUDGE_COMPILE_FLOOR_MS
    pub compile_budget_floor_ms: u64,
    /// Override for the embedded language table (LANGUAGES_CONFIG)
    pub languages_config: Option<PathBuf>,
    pub redis_url: String,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        let supervisor = SupervisorConfig::default();
        Self {
            work_dir: std::env::temp_dir().join("codejudge-work"),
            max_concurrent_executions: supervisor.max_concurrent_executions,
            max_parallel_cases: 4,
            output_limit_bytes: supervisor.output_limit_bytes,
            compile_budget_floor_ms: supervisor.compile_budget_floor_ms,
            languages_config: None,
            redis_url: "redis://localhost:6379".into(),
        }
    }
}

impl JudgeConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            work_dir: lookup("JUDGE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            max_concurrent_executions: parse_var(
                &lookup,
                "JUDGE_MAX_CONCURRENCY",
                defaults.max_concurrent_executions,
            )?,
            max_parallel_cases: parse_var(
                &lookup,
                "JUDGE_PARALLEL_CASES",
                defaults.max_parallel_cases,
            )?,
            output_limit_bytes: parse_var(
                &lookup,
                "JUDGE_OUTPUT_LIMIT_BYTES",
                defaults.output_limit_bytes,
            )?,
            compile_budget_floor_ms: parse_var(
                &lookup,
                "JUDGE_COMPILE_FLOOR_MS",
                defaults.compile_budget_floor_ms,
            )?,
            languages_config: lookup("LANGUAGES_CONFIG").map(PathBuf::from),
            redis_url: lookup("REDIS_URL").unwrap_or(defaults.redis_url),
        })
    }

    pub fn supervisor(&self) -> SupervisorConfig {
        SupervisorConfig {
            output_limit_bytes: self.output_limit_bytes,
            compile_budget_floor_ms: self.compile_budget_floor_ms,
            max_concurrent_executions: self.max_concurrent_executions,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid value for {}: {:?}", key, raw)),
        None => Ok(default),
    }
}
