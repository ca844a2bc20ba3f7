use std::sync::Arc;

use anyhow::Result;
use tracing::{error, info, warn};

use codejudge::config::JudgeConfig;
use codejudge::jobs::WorkerJob;
use codejudge::languages::LanguageRegistry;
use codejudge::redis_manager::RedisManager;
use codejudge::runner::ProcessRunner;
use codejudge::runtime::RuntimeRegistry;
use codejudge::workdir::WorkDir;
use codejudge::{ExecutionSupervisor, Judge, SubmissionResult};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("codejudge=info".parse()?)
                .add_directive("judge_worker=info".parse()?),
        )
        .init();

    dotenvy::dotenv().ok();
    let config = JudgeConfig::from_env()?;

    let languages = LanguageRegistry::load(config.languages_config.as_deref())?;
    match &config.languages_config {
        Some(path) => info!("Loaded language configurations from {:?}", path),
        None => info!("Using built-in language configurations"),
    }
    info!("Supported languages: {}", languages.supported_names().join(", "));

    let work_dir = WorkDir::create(&config.work_dir)?;
    info!("Work directory: {:?}", work_dir.root());

    let supervisor = Arc::new(ExecutionSupervisor::new(
        Arc::new(RuntimeRegistry::new(languages)?),
        Arc::new(ProcessRunner::default()),
        work_dir,
        config.supervisor(),
    ));
    info!(
        "Execution pool: {} process(es), {} case(s) per submission",
        config.max_concurrent_executions, config.max_parallel_cases
    );

    info!("Starting Judge Worker...");
    let mut redis = RedisManager::with_url(&config.redis_url).await?;
    let judge = Judge::new(supervisor, config.max_parallel_cases)
        .with_listener(Arc::new(redis.analysis_publisher()));

    info!("Waiting for jobs...");

    loop {
        let job = tokio::select! {
            job = redis.pop_job() => job?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutdown requested, exiting");
                return Ok(());
            }
        };

        process_job(&judge, &mut redis, job).await;
    }
}

async fn process_job(judge: &Judge, redis: &mut RedisManager, job: WorkerJob) {
    let judge_job = job.judge_job();
    let submission_id = judge_job.submission_id;
    info!(
        "Processing submission {} for problem {} ({})",
        submission_id, judge_job.problem.id, judge_job.submission.language
    );

    let placeholder = SubmissionResult::processing(job.case_count());
    if let Err(e) = redis.store_submission_result(submission_id, &placeholder).await {
        warn!("Failed to store placeholder for {}: {:#}", submission_id, e);
    }

    let result = match &job {
        WorkerJob::RunTests(job) => judge.run_tests(&job.problem, &job.submission).await,
        WorkerJob::Submit(job) => {
            judge
                .submit(&job.user_id, &job.problem, &job.submission)
                .await
        }
    };

    match result {
        Ok(result) => {
            info!(
                "Submission {} finished: {} ({}/{})",
                submission_id, result.verdict, result.passed_count, result.total_count
            );
            if let Err(e) = redis.store_submission_result(submission_id, &result).await {
                error!("Failed to store result for {}: {:#}", submission_id, e);
            }
        }
        Err(e) => {
            warn!("Submission {} rejected: {}", submission_id, e);
            if let Err(store_err) = redis.store_rejection(submission_id, &e).await {
                error!("Failed to store rejection for {}: {:#}", submission_id, store_err);
            }
        }
    }
}
