use serde::{Deserialize, Serialize};
use std::fmt;

/// Verdict of a whole submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    WrongAnswer,
    TimeLimitExceeded,
    RuntimeError,
    CompilationError,
    /// Placeholder while the submission is still being judged
    Processing,
}

impl Verdict {
    /// Derive the submission verdict from per-case states.
    ///
    /// Processing while any case is unfinished. Accepted iff every case passed.
    /// Otherwise the first matching rule wins: compile failure, then non-timeout
    /// runtime error, then timeout, then wrong answer.
    pub fn from_states(states: &[CaseState]) -> Self {
        if !states.iter().all(CaseState::is_terminal) {
            return Verdict::Processing;
        }
        if states.iter().all(|s| *s == CaseState::Passed) {
            return Verdict::Accepted;
        }
        if states.contains(&CaseState::CompileErrored) {
            Verdict::CompilationError
        } else if states.contains(&CaseState::RuntimeErrored) {
            Verdict::RuntimeError
        } else if states.contains(&CaseState::TimedOut) {
            Verdict::TimeLimitExceeded
        } else {
            Verdict::WrongAnswer
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Verdict::Accepted => "accepted",
            Verdict::WrongAnswer => "wrong_answer",
            Verdict::TimeLimitExceeded => "time_limit_exceeded",
            Verdict::RuntimeError => "runtime_error",
            Verdict::CompilationError => "compilation_error",
            Verdict::Processing => "processing",
        };
        write!(f, "{}", s)
    }
}

/// Lifecycle of a single test-case execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseState {
    Pending,
    Compiling,
    Running,
    Passed,
    Failed,
    TimedOut,
    RuntimeErrored,
    CompileErrored,
}

impl CaseState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CaseState::Passed
                | CaseState::Failed
                | CaseState::TimedOut
                | CaseState::RuntimeErrored
                | CaseState::CompileErrored
        )
    }
}

impl fmt::Display for CaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CaseState::Pending => "pending",
            CaseState::Compiling => "compiling",
            CaseState::Running => "running",
            CaseState::Passed => "passed",
            CaseState::Failed => "failed",
            CaseState::TimedOut => "timed_out",
            CaseState::RuntimeErrored => "runtime_errored",
            CaseState::CompileErrored => "compile_errored",
        };
        write!(f, "{}", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_passed_is_accepted() {
        let states = [CaseState::Passed, CaseState::Passed];
        assert_eq!(Verdict::from_states(&states), Verdict::Accepted);
    }

    #[test]
    fn test_empty_selection_is_accepted() {
        assert_eq!(Verdict::from_states(&[]), Verdict::Accepted);
    }

    #[test]
    fn test_compile_error_takes_precedence() {
        let states = [
            CaseState::TimedOut,
            CaseState::CompileErrored,
            CaseState::RuntimeErrored,
        ];
        assert_eq!(Verdict::from_states(&states), Verdict::CompilationError);
    }

    #[test]
    fn test_runtime_error_before_timeout() {
        let states = [CaseState::Passed, CaseState::TimedOut, CaseState::RuntimeErrored];
        assert_eq!(Verdict::from_states(&states), Verdict::RuntimeError);
    }

    #[test]
    fn test_timeout_before_wrong_answer() {
        let states = [CaseState::Failed, CaseState::TimedOut];
        assert_eq!(Verdict::from_states(&states), Verdict::TimeLimitExceeded);
    }

    #[test]
    fn test_unfinished_cases_are_processing() {
        let states = [CaseState::Passed, CaseState::Running];
        assert_eq!(Verdict::from_states(&states), Verdict::Processing);
        let states = [CaseState::CompileErrored, CaseState::Pending];
        assert_eq!(Verdict::from_states(&states), Verdict::Processing);
    }

    #[test]
    fn test_wrong_answer() {
        let states = [CaseState::Passed, CaseState::Failed];
        assert_eq!(Verdict::from_states(&states), Verdict::WrongAnswer);
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&Verdict::TimeLimitExceeded).unwrap(),
            "\"time_limit_exceeded\""
        );
        assert_eq!(
            serde_json::to_string(&CaseState::RuntimeErrored).unwrap(),
            "\"runtime_errored\""
        );
        assert_eq!(Verdict::CompilationError.to_string(), "compilation_error");
    }

    #[test]
    fn test_terminal_states() {
        assert!(!CaseState::Pending.is_terminal());
        assert!(!CaseState::Compiling.is_terminal());
        assert!(!CaseState::Running.is_terminal());
        assert!(CaseState::CompileErrored.is_terminal());
        assert!(CaseState::Passed.is_terminal());
    }
}
