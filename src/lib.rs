//! Codejudge - multi-language execution and judging engine
//!
//! User code in JavaScript, Python, Java or C++ is wrapped in a harness,
//! run as a supervised child process, and its result compared against the
//! expected value of each test case.

pub mod comparator;
pub mod compiler;
pub mod config;
pub mod core;
pub mod detector;
pub mod harness;
pub mod jobs;
pub mod judger;
pub mod languages;
pub mod redis_manager;
pub mod runner;
pub mod runtime;
pub mod stats;
pub mod supervisor;
pub mod workdir;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::core::{
    CaseResult, CaseState, ExecutionError, ExecutionOutcome, ExecutionRequest, JudgeError,
    Problem, Submission, SubmissionResult, TestCase, Verdict, Viewer,
};
pub use crate::judger::{Judge, JudgeOptions};
pub use crate::languages::Language;
pub use crate::supervisor::{ExecutionSupervisor, SupervisorConfig};
