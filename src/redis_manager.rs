//! Redis Manager - Centralized Redis connection and operations
//!
//! This module handles all Redis-related operations including:
//! - Job queue operations (BLPOP)
//! - Result storage and publishing
//! - Publishing post-submission analysis events

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use serde::Serialize;
use tracing::{info, warn};

use crate::core::{JudgeError, SubmissionResult};
use crate::jobs::WorkerJob;
use crate::stats::{SubmissionEvent, SubmissionListener};

/// Redis key constants
pub mod keys {
    /// Judge job queue key
    pub const JUDGE_QUEUE: &str = "judge:queue";

    /// Judge result key prefix (for polling)
    pub const JUDGE_RESULT_PREFIX: &str = "judge:result:";

    /// Judge result channel (for pub/sub)
    pub const JUDGE_RESULT_CHANNEL: &str = "judge:results";

    /// Post-submission analysis channel (for pub/sub)
    pub const ANALYSIS_CHANNEL: &str = "judge:analysis";
}

const RESULT_EXPIRY_SECS: u64 = 3600; // 1 hour

/// Result stored under `judge:result:<submission_id>`
#[derive(Debug, Serialize)]
struct StoredResult<'a> {
    submission_id: i64,
    #[serde(flatten)]
    result: &'a SubmissionResult,
}

/// Centralized Redis manager for all Redis operations
pub struct RedisManager {
    client: redis::Client,
    conn: MultiplexedConnection,
}

impl RedisManager {
    /// Connect to Redis, retrying until it is reachable
    pub async fn with_url(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = get_connection_with_retry(&client).await?;
        info!("Connected to Redis at {}", redis_url);

        Ok(Self { client, conn })
    }

    /// Block and wait for the next job from the queue.
    ///
    /// This uses BLPOP to efficiently wait for jobs without polling.
    /// Automatically reconnects on connection failure.
    pub async fn pop_job(&mut self) -> Result<WorkerJob> {
        loop {
            let result: Option<(String, String)> =
                match self.conn.blpop(keys::JUDGE_QUEUE, 0.0).await {
                    Ok(res) => res,
                    Err(e) => {
                        warn!("Redis BLPOP failed: {}. Reconnecting...", e);
                        self.reconnect().await?;
                        continue;
                    }
                };

            if let Some((_, job_data)) = result {
                match serde_json::from_str::<WorkerJob>(&job_data) {
                    Ok(job) => return Ok(job),
                    Err(e) => {
                        warn!("Failed to parse job data: {}. Data: {}", e, job_data);
                        continue;
                    }
                }
            }
        }
    }

    /// Store a submission result in Redis.
    ///
    /// The result is stored with a 1-hour expiration and also published
    /// to a channel for real-time subscribers.
    pub async fn store_submission_result(
        &mut self,
        submission_id: i64,
        result: &SubmissionResult,
    ) -> Result<()> {
        self.store_result(
            &format!("{}{}", keys::JUDGE_RESULT_PREFIX, submission_id),
            Some(keys::JUDGE_RESULT_CHANNEL),
            &StoredResult {
                submission_id,
                result,
            },
        )
        .await
    }

    /// Store the reason a submission was rejected before execution
    pub async fn store_rejection(&mut self, submission_id: i64, error: &JudgeError) -> Result<()> {
        let rejection = serde_json::json!({
            "submission_id": submission_id,
            "error": error.to_string(),
        });
        self.store_result(
            &format!("{}{}", keys::JUDGE_RESULT_PREFIX, submission_id),
            Some(keys::JUDGE_RESULT_CHANNEL),
            &rejection,
        )
        .await
    }

    /// Publisher sharing this manager's connection
    pub fn analysis_publisher(&self) -> RedisAnalysisPublisher {
        RedisAnalysisPublisher {
            conn: self.conn.clone(),
        }
    }

    /// Internal helper to store and publish a result
    async fn store_result<T: Serialize>(
        &mut self,
        key: &str,
        channel: Option<&str>,
        result: &T,
    ) -> Result<()> {
        let json = serde_json::to_string(result)?;

        // Try to store, reconnect on failure
        if let Err(e) = self
            .conn
            .set_ex::<_, _, ()>(key, &json, RESULT_EXPIRY_SECS)
            .await
        {
            warn!("Failed to store result: {}. Reconnecting...", e);
            self.reconnect().await?;
            self.conn
                .set_ex::<_, _, ()>(key, &json, RESULT_EXPIRY_SECS)
                .await?;
        }

        // Publish to channel (ignore errors as there may be no subscribers)
        if let Some(chan) = channel {
            let _ = self.conn.publish::<_, _, ()>(chan, &json).await;
        }

        Ok(())
    }

    /// Reconnect to Redis
    async fn reconnect(&mut self) -> Result<()> {
        self.conn = get_connection_with_retry(&self.client).await?;
        Ok(())
    }
}

/// Publishes every judged submission on `judge:analysis`
pub struct RedisAnalysisPublisher {
    conn: MultiplexedConnection,
}

#[async_trait]
impl SubmissionListener for RedisAnalysisPublisher {
    async fn on_judged(&self, event: SubmissionEvent) -> Result<()> {
        let json = serde_json::to_string(&event)?;
        let mut conn = self.conn.clone();
        conn.publish::<_, _, ()>(keys::ANALYSIS_CHANNEL, &json)
            .await
            .context("Failed to publish analysis event")?;
        Ok(())
    }
}

/// Get a Redis connection with retry logic
async fn get_connection_with_retry(client: &redis::Client) -> Result<MultiplexedConnection> {
    loop {
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => return Ok(conn),
            Err(e) => {
                warn!(
                    "Failed to connect to Redis: {}. Retrying in 3 seconds...",
                    e
                );
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Verdict;

    #[test]
    fn test_stored_result_is_flat() {
        let result = SubmissionResult::processing(3);
        let json = serde_json::to_value(StoredResult {
            submission_id: 12,
            result: &result,
        })
        .unwrap();

        assert_eq!(json["submission_id"], 12);
        assert_eq!(json["total_count"], 3);
        assert_eq!(json["verdict"], serde_json::to_value(Verdict::Processing).unwrap());
        assert!(json["test_results"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_result_keys() {
        assert_eq!(
            format!("{}{}", keys::JUDGE_RESULT_PREFIX, 42),
            "judge:result:42"
        );
    }
}
