//! Jobs the worker pops from the queue

use serde::{Deserialize, Serialize};

use crate::core::{Problem, Submission};

/// Worker job enum - represents different types of jobs the worker can process
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "job_type")]
pub enum WorkerJob {
    /// Run the visible cases only
    #[serde(rename = "run_tests")]
    RunTests(JudgeJob),
    /// Run every case and record statistics
    #[serde(rename = "submit")]
    Submit(JudgeJob),
}

impl WorkerJob {
    pub fn judge_job(&self) -> &JudgeJob {
        match self {
            WorkerJob::RunTests(job) | WorkerJob::Submit(job) => job,
        }
    }

    /// Cases this job will run; `run_tests` skips hidden ones
    pub fn case_count(&self) -> usize {
        match self {
            WorkerJob::RunTests(job) => job
                .problem
                .test_cases
                .iter()
                .filter(|case| !case.is_hidden)
                .count(),
            WorkerJob::Submit(job) => job.problem.test_cases.len(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JudgeJob {
    pub submission_id: i64,
    pub user_id: String,
    pub problem: Problem,
    pub submission: Submission,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_submit_job() {
        let raw = r#"{
            "job_type": "submit",
            "submission_id": 7,
            "user_id": "u1",
            "problem": {
                "id": "two-sum",
                "time_limit_ms": 2000,
                "test_cases": [
                    {"input": {"nums": [2, 7], "target": 9}, "expected": [0, 1]},
                    {"input": {"nums": [3, 3], "target": 6}, "expected": [0, 1], "is_hidden": true}
                ]
            },
            "submission": {"code": "output = [0, 1]", "language": "py"}
        }"#;

        let job: WorkerJob = serde_json::from_str(raw).unwrap();
        assert!(matches!(job, WorkerJob::Submit(_)));
        let judge_job = job.judge_job();
        assert_eq!(judge_job.submission_id, 7);
        assert_eq!(judge_job.problem.memory_limit_mb, 256);
        assert!(judge_job.problem.test_cases[1].is_hidden);
        assert_eq!(judge_job.submission.is_full_program, None);
    }

    #[test]
    fn test_case_count_skips_hidden_for_run_tests() {
        let raw = |job_type: &str| {
            format!(
                r#"{{
                    "job_type": "{}",
                    "submission_id": 1,
                    "user_id": "u1",
                    "problem": {{
                        "id": "p",
                        "time_limit_ms": 1000,
                        "test_cases": [
                            {{"input": 1, "expected": 1}},
                            {{"input": 2, "expected": 2}},
                            {{"input": 3, "expected": 3, "is_hidden": true}}
                        ]
                    }},
                    "submission": {{"code": "output = input", "language": "python"}}
                }}"#,
                job_type
            )
        };

        let run: WorkerJob = serde_json::from_str(&raw("run_tests")).unwrap();
        assert_eq!(run.case_count(), 2);
        let submit: WorkerJob = serde_json::from_str(&raw("submit")).unwrap();
        assert_eq!(submit.case_count(), 3);
    }

    #[test]
    fn test_unknown_job_type_is_rejected() {
        let raw = r#"{"job_type": "validate", "problem_id": 1}"#;
        assert!(serde_json::from_str::<WorkerJob>(raw).is_err());
    }
}
