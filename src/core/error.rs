use thiserror::Error;

use super::verdict::CaseState;

/// Failure of a single execution. Never escapes the supervisor; each
/// variant is folded into the case outcome.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Compilation Error: {0}")]
    Compilation(String),

    #[error("Time Limit Exceeded")]
    TimeLimitExceeded,

    #[error("{0}")]
    Runtime(String),

    #[error("Output Format Error: {0}")]
    OutputFormat(String),

    #[error("Infrastructure Error: {0}")]
    Infrastructure(String),
}

impl ExecutionError {
    /// Terminal case state this failure maps to
    pub fn case_state(&self) -> CaseState {
        match self {
            ExecutionError::Compilation(_) => CaseState::CompileErrored,
            ExecutionError::TimeLimitExceeded => CaseState::TimedOut,
            ExecutionError::Runtime(_) | ExecutionError::Infrastructure(_) => {
                CaseState::RuntimeErrored
            }
            ExecutionError::OutputFormat(_) => CaseState::Failed,
        }
    }
}

impl From<anyhow::Error> for ExecutionError {
    fn from(err: anyhow::Error) -> Self {
        ExecutionError::Infrastructure(format!("{:#}", err))
    }
}

/// Request-level rejection, returned before anything is executed
#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("Unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}
