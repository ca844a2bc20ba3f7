//! Submission statistics and post-submission listeners
//!
//! Only `submit` touches statistics; `run_tests` never does.
//!
//! This module does NOT:
//! - Persist anything (the in-memory store is per process)
//! - Decide verdicts (it is told whether a submission was accepted)

use std::collections::{BTreeSet, HashMap};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::Verdict;
use crate::languages::Language;

/// Per-problem counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProblemStats {
    pub attempts: u64,
    pub accepted_submissions: u64,
    /// Distinct users with at least one accepted submission
    pub solved_by: u64,
}

impl ProblemStats {
    /// Accepted submissions over attempts, 0.0 before any attempt
    pub fn success_rate(&self) -> f64 {
        if self.attempts == 0 {
            0.0
        } else {
            self.accepted_submissions as f64 / self.attempts as f64
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserStats {
    pub attempted: BTreeSet<String>,
    pub solved: BTreeSet<String>,
}

#[async_trait]
pub trait StatisticsStore: Send + Sync {
    /// Record one submission. Called exactly once per `submit`.
    async fn record_submission(&self, user_id: &str, problem_id: &str, accepted: bool)
        -> Result<()>;
}

#[derive(Debug, Default)]
struct StatsTables {
    problems: HashMap<String, ProblemStats>,
    users: HashMap<String, UserStats>,
}

/// Statistics kept in process memory
#[derive(Debug, Default)]
pub struct InMemoryStatistics {
    tables: Mutex<StatsTables>,
}

impl InMemoryStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn problem(&self, problem_id: &str) -> ProblemStats {
        self.lock().problems.get(problem_id).cloned().unwrap_or_default()
    }

    pub fn user(&self, user_id: &str) -> UserStats {
        self.lock().users.get(user_id).cloned().unwrap_or_default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, StatsTables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl StatisticsStore for InMemoryStatistics {
    async fn record_submission(
        &self,
        user_id: &str,
        problem_id: &str,
        accepted: bool,
    ) -> Result<()> {
        let mut tables = self.lock();
        let StatsTables { problems, users } = &mut *tables;

        let user = users.entry(user_id.to_string()).or_default();
        user.attempted.insert(problem_id.to_string());
        let newly_solved = accepted && user.solved.insert(problem_id.to_string());

        let problem = problems.entry(problem_id.to_string()).or_default();
        problem.attempts += 1;
        if accepted {
            problem.accepted_submissions += 1;
        }
        if newly_solved {
            problem.solved_by += 1;
        }
        Ok(())
    }
}

/// Published after a submission has been judged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionEvent {
    pub user_id: String,
    pub problem_id: String,
    pub language: Language,
    pub code: String,
    pub verdict: Verdict,
    pub passed_count: usize,
    pub total_count: usize,
}

/// Fire-and-forget hook run after `submit`, such as triggering code analysis
#[async_trait]
pub trait SubmissionListener: Send + Sync {
    async fn on_judged(&self, event: SubmissionEvent) -> Result<()>;
}
