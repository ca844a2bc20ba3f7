//! Records consumed and produced by the judging engine
//!
//! Problems and submissions arrive as plain records from the persistence
//! layer; results are handed back the same way. This module does NOT:
//! - Load or store records
//! - Decide who is allowed to see hidden cases (the caller passes a `Viewer`)

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ExecutionError;
use super::verdict::{CaseState, Verdict};
use crate::languages::Language;

fn default_memory_limit_mb() -> u32 {
    256
}

/// One test case of a problem
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestCase {
    pub input: Value,
    pub expected: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub explanation: Option<String>,
    #[serde(default)]
    pub is_hidden: bool,
}

/// Problem record as far as judging is concerned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub test_cases: Vec<TestCase>,
    /// Per-case budget, compile step included for compiled languages
    pub time_limit_ms: u64,
    #[serde(default = "default_memory_limit_mb")]
    pub memory_limit_mb: u32,
}

/// User submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub code: String,
    pub language: String,
    /// None lets the engine detect the mode from the code
    #[serde(default)]
    pub is_full_program: Option<bool>,
}

/// A single execution request against one input
#[derive(Debug, Clone)]
pub struct ExecutionRequest {
    pub code: String,
    pub language: Language,
    pub input: Value,
    pub expected_output: Value,
    pub time_limit_ms: u64,
    pub is_full_program: Option<bool>,
    pub memory_limit_mb: Option<u32>,
}

/// Result of executing one test case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionOutcome {
    pub passed: bool,
    pub status: CaseState,
    pub output: Option<Value>,
    pub expected_output: Value,
    pub execution_time_ms: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionOutcome {
    /// Outcome of a program that exited normally and was compared
    pub fn compared(passed: bool, output: Value, expected: &Value, time_ms: f64) -> Self {
        Self {
            passed,
            status: if passed {
                CaseState::Passed
            } else {
                CaseState::Failed
            },
            output: Some(output),
            expected_output: expected.clone(),
            execution_time_ms: time_ms,
            error: None,
        }
    }

    /// Outcome of a failed execution. `output` carries raw text when the
    /// program exited normally but its output was unusable.
    pub fn from_error(
        err: &ExecutionError,
        output: Option<Value>,
        expected: &Value,
        time_ms: f64,
    ) -> Self {
        Self {
            passed: false,
            status: err.case_state(),
            output,
            expected_output: expected.clone(),
            execution_time_ms: time_ms,
            error: Some(err.to_string()),
        }
    }
}

/// Outcome tagged with its position in the problem's case list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    pub index: usize,
    pub is_hidden: bool,
    #[serde(flatten)]
    pub outcome: ExecutionOutcome,
}

/// Who is reading a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    User,
    Admin,
}

/// Aggregated result of a submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionResult {
    pub test_results: Vec<CaseResult>,
    pub passed_count: usize,
    pub total_count: usize,
    pub total_execution_time_ms: f64,
    pub verdict: Verdict,
}

impl SubmissionResult {
    /// Aggregate case results, which must already be in case order
    pub fn from_results(test_results: Vec<CaseResult>) -> Self {
        let states: Vec<CaseState> = test_results.iter().map(|r| r.outcome.status).collect();
        let passed_count = test_results.iter().filter(|r| r.outcome.passed).count();
        let total_execution_time_ms = test_results
            .iter()
            .map(|r| r.outcome.execution_time_ms)
            .sum();

        Self {
            passed_count,
            total_count: test_results.len(),
            total_execution_time_ms,
            verdict: Verdict::from_states(&states),
            test_results,
        }
    }

    /// Placeholder stored while judging is in progress
    pub fn processing(total_count: usize) -> Self {
        Self {
            test_results: Vec::new(),
            passed_count: 0,
            total_count,
            total_execution_time_ms: 0.0,
            verdict: Verdict::Processing,
        }
    }

    /// Copy of this result filtered for `viewer`. Counts and verdict are kept.
    pub fn visible_to(&self, viewer: Viewer) -> SubmissionResult {
        let test_results = match viewer {
            Viewer::Admin => self.test_results.clone(),
            Viewer::User => self
                .test_results
                .iter()
                .filter(|r| !r.is_hidden)
                .cloned()
                .collect(),
        };

        SubmissionResult {
            test_results,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn case(index: usize, is_hidden: bool, status: CaseState) -> CaseResult {
        CaseResult {
            index,
            is_hidden,
            outcome: ExecutionOutcome {
                passed: status == CaseState::Passed,
                status,
                output: Some(json!(1)),
                expected_output: json!(1),
                execution_time_ms: 10.0,
                error: None,
            },
        }
    }

    #[test]
    fn test_aggregate_counts_and_time() {
        let result = SubmissionResult::from_results(vec![
            case(0, false, CaseState::Passed),
            case(1, false, CaseState::Failed),
            case(2, true, CaseState::Passed),
        ]);

        assert_eq!(result.passed_count, 2);
        assert_eq!(result.total_count, 3);
        assert_eq!(result.total_execution_time_ms, 30.0);
        assert_eq!(result.verdict, Verdict::WrongAnswer);
    }

    #[test]
    fn test_redaction_per_viewer() {
        let result = SubmissionResult::from_results(vec![
            case(0, false, CaseState::Passed),
            case(1, false, CaseState::Passed),
            case(2, false, CaseState::Passed),
            case(3, true, CaseState::Passed),
            case(4, true, CaseState::Passed),
        ]);

        let user_view = result.visible_to(Viewer::User);
        assert_eq!(user_view.test_results.len(), 3);
        assert!(user_view.test_results.iter().all(|r| !r.is_hidden));
        assert_eq!(user_view.total_count, 5);

        let admin_view = result.visible_to(Viewer::Admin);
        assert_eq!(admin_view.test_results.len(), 5);

        // stored record untouched
        assert_eq!(result.test_results.len(), 5);
    }

    #[test]
    fn test_from_error_outcome() {
        let outcome = ExecutionOutcome::from_error(
            &ExecutionError::TimeLimitExceeded,
            None,
            &json!([0, 1]),
            500.0,
        );
        assert!(!outcome.passed);
        assert_eq!(outcome.status, CaseState::TimedOut);
        assert_eq!(outcome.error.as_deref(), Some("Time Limit Exceeded"));
        assert_eq!(outcome.output, None);
    }

    #[test]
    fn test_case_result_serializes_flat() {
        let value = serde_json::to_value(case(0, true, CaseState::Passed)).unwrap();
        assert_eq!(value["index"], json!(0));
        assert_eq!(value["is_hidden"], json!(true));
        assert_eq!(value["status"], json!("passed"));
        assert!(value.get("error").is_none());
    }

    #[test]
    fn test_problem_defaults() {
        let problem: Problem = serde_json::from_value(json!({
            "id": "two-sum",
            "test_cases": [{"input": {"nums": [2, 7], "target": 9}, "expected": [0, 1]}],
            "time_limit_ms": 2000
        }))
        .unwrap();

        assert_eq!(problem.memory_limit_mb, 256);
        assert!(!problem.test_cases[0].is_hidden);
        assert!(problem.test_cases[0].explanation.is_none());
    }
}
