//! Judger module for processing submissions
//!
//! Validates a submission, runs the selected test cases through one
//! supervisor session with bounded, order-preserving concurrency, and
//! aggregates the outcomes into a `SubmissionResult`.
//!
//! This module does NOT:
//! - Spawn processes (the supervisor does)
//! - Redact hidden cases (callers use `SubmissionResult::visible_to`)

use std::sync::Arc;

use futures_util::stream::{self, StreamExt};
use tracing::{info, warn};

use crate::core::{CaseResult, JudgeError, Problem, Submission, SubmissionResult, TestCase, Verdict};
use crate::stats::{InMemoryStatistics, StatisticsStore, SubmissionEvent, SubmissionListener};
use crate::supervisor::ExecutionSupervisor;

#[derive(Debug, Clone, Copy, Default)]
pub struct JudgeOptions {
    /// Run hidden cases too
    pub include_hidden: bool,
}

pub struct Judge {
    supervisor: Arc<ExecutionSupervisor>,
    max_parallel_cases: usize,
    statistics: Arc<dyn StatisticsStore>,
    listeners: Vec<Arc<dyn SubmissionListener>>,
}

impl Judge {
    pub fn new(supervisor: Arc<ExecutionSupervisor>, max_parallel_cases: usize) -> Self {
        Self {
            supervisor,
            max_parallel_cases: max_parallel_cases.max(1),
            statistics: Arc::new(InMemoryStatistics::new()),
            listeners: Vec::new(),
        }
    }

    pub fn with_statistics(mut self, statistics: Arc<dyn StatisticsStore>) -> Self {
        self.statistics = statistics;
        self
    }

    pub fn with_listener(mut self, listener: Arc<dyn SubmissionListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Judge `submission` against the selected cases of `problem`
    pub async fn judge(
        &self,
        problem: &Problem,
        submission: &Submission,
        options: JudgeOptions,
    ) -> Result<SubmissionResult, JudgeError> {
        let language = self.supervisor.registry().resolve(&submission.language)?;
        if submission.code.trim().is_empty() {
            return Err(JudgeError::InvalidRequest("code is empty".into()));
        }
        if problem.time_limit_ms == 0 {
            return Err(JudgeError::InvalidRequest(
                "time limit must be positive".into(),
            ));
        }
        if problem.test_cases.is_empty() {
            return Err(JudgeError::InvalidRequest(format!(
                "problem {} has no test cases",
                problem.id
            )));
        }

        let selected: Vec<(usize, &TestCase)> = problem
            .test_cases
            .iter()
            .enumerate()
            .filter(|(_, case)| options.include_hidden || !case.is_hidden)
            .collect();

        let session = self.supervisor.session(
            language,
            &submission.code,
            submission.is_full_program,
            problem.memory_limit_mb,
        )?;
        info!(
            "Judging problem {} in {} ({:?}): {} case(s)",
            problem.id,
            language,
            session.mode(),
            selected.len()
        );

        let test_results: Vec<CaseResult> = stream::iter(selected)
            .map(|(index, case)| {
                let session = &session;
                async move {
                    let outcome = session
                        .run_case(index, &case.input, &case.expected, problem.time_limit_ms)
                        .await;
                    CaseResult {
                        index,
                        is_hidden: case.is_hidden,
                        outcome,
                    }
                }
            })
            .buffered(self.max_parallel_cases)
            .collect()
            .await;
        session.close();

        let result = SubmissionResult::from_results(test_results);
        info!(
            "Problem {}: {} ({}/{} passed, {:.1}ms)",
            problem.id,
            result.verdict,
            result.passed_count,
            result.total_count,
            result.total_execution_time_ms
        );
        Ok(result)
    }

    /// Run the visible cases only. Statistics are untouched.
    pub async fn run_tests(
        &self,
        problem: &Problem,
        submission: &Submission,
    ) -> Result<SubmissionResult, JudgeError> {
        self.judge(
            problem,
            submission,
            JudgeOptions {
                include_hidden: false,
            },
        )
        .await
    }

    /// Run every case, record statistics and notify listeners.
    ///
    /// The returned result still contains hidden cases.
    pub async fn submit(
        &self,
        user_id: &str,
        problem: &Problem,
        submission: &Submission,
    ) -> Result<SubmissionResult, JudgeError> {
        let result = self
            .judge(
                problem,
                submission,
                JudgeOptions {
                    include_hidden: true,
                },
            )
            .await?;

        let accepted = result.verdict == Verdict::Accepted;
        if let Err(e) = self
            .statistics
            .record_submission(user_id, &problem.id, accepted)
            .await
        {
            warn!(
                "Failed to record submission of {} for {}: {:#}",
                user_id, problem.id, e
            );
        }

        self.notify(SubmissionEvent {
            user_id: user_id.to_string(),
            problem_id: problem.id.clone(),
            language: self.supervisor.registry().resolve(&submission.language)?,
            code: submission.code.clone(),
            verdict: result.verdict,
            passed_count: result.passed_count,
            total_count: result.total_count,
        });

        Ok(result)
    }

    fn notify(&self, event: SubmissionEvent) {
        for listener in &self.listeners {
            let listener = Arc::clone(listener);
            let event = event.clone();
            tokio::spawn(async move {
                if let Err(e) = listener.on_judged(event).await {
                    warn!("Submission listener failed: {:#}", e);
                }
            });
        }
    }
}
