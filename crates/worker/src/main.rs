//! `backdrop-worker` -- one-shot batch runner.
//!
//! Submits every image in `INPUT_DIR` as a job, generates the shared
//! backdrop once, composites each input onto it through the generation
//! service, writes outputs to `OUTPUT_DIR` and exits once every job has
//! settled. Ctrl-C stops the worker after the current round.
//!
//! See [`backdrop_worker::config::WorkerConfig`] for the environment
//! variables.

use std::sync::Arc;

use anyhow::Context;
use backdrop_core::job::JobStatus;
use backdrop_worker::app::{self, Worker};
use backdrop_worker::config::{LogFormat, WorkerConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_LOG_FILTER: &str = "backdrop_worker=info,backdrop_pipeline=info,backdrop_genai=info";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing(LogFormat::from_env());

    let config = WorkerConfig::from_env().context("Failed to load configuration")?;
    tracing::info!(
        input_dir = %config.input_dir.display(),
        output_dir = %config.output_dir.display(),
        model = %config.model,
        mode = %config.mode,
        "Starting backdrop-worker",
    );

    let worker = Worker::from_config(&config);
    let _event_logger = app::spawn_event_logger(worker.registry.events());

    let inputs = app::discover_inputs(&config.input_dir, config.mode)
        .await
        .with_context(|| format!("Failed to list {}", config.input_dir.display()))?;
    if inputs.is_empty() {
        tracing::warn!(input_dir = %config.input_dir.display(), "No input images found");
        return Ok(());
    }
    let submitted = worker
        .registry
        .submit_many(inputs)
        .await
        .context("Failed to submit jobs")?;
    tracing::info!(count = submitted.len(), "Jobs submitted");

    let cancel = CancellationToken::new();
    let runner = {
        let orchestrator = Arc::clone(&worker.orchestrator);
        let cancel = cancel.clone();
        tokio::spawn(async move { orchestrator.run(cancel).await })
    };

    tokio::select! {
        _ = worker.registry.wait_until_settled() => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested, finishing current round");
        }
    }
    cancel.cancel();
    runner.await.context("Orchestrator task failed")?;

    let jobs = worker.registry.snapshot().await;
    for job in &jobs {
        match job.status {
            JobStatus::Done => tracing::info!(
                job = %job.name,
                output = job.output.as_ref().map(|o| o.as_str()).unwrap_or_default(),
                "Done",
            ),
            JobStatus::Error => tracing::warn!(
                job = %job.name,
                error = job.error.as_deref().unwrap_or_default(),
                "Failed",
            ),
            status => tracing::info!(job = %job.name, status = status.as_str(), "Not finished"),
        }
    }

    let counts = worker.registry.counts().await;
    tracing::info!(
        done = counts.done,
        error = counts.error,
        unfinished = counts.pending + counts.processing,
        "Worker finished",
    );
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}
