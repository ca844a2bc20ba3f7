pub mod error;
pub mod model;
pub mod verdict;

pub use error::{ExecutionError, JudgeError};
pub use model::{
    CaseResult, ExecutionOutcome, ExecutionRequest, Problem, Submission, SubmissionResult,
    TestCase, Viewer,
};
pub use verdict::{CaseState, Verdict};
