//! Startup wiring for the worker binary.

use std::io;
use std::path::Path;
use std::sync::Arc;

use backdrop_core::asset::CanonicalMode;
use backdrop_core::job::NewJob;
use backdrop_events::EventBus;
use backdrop_genai::{GenerationApi, GenerationService};
use backdrop_pipeline::{JobProcessor, JobRegistry, Orchestrator, SharedResourceCache};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::canonicalize::FsCanonicalizer;
use crate::config::WorkerConfig;
use crate::storage::FsAssetStore;

/// File extensions picked up from the input directory.
const INPUT_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// Everything the binary needs to run a batch.
pub struct Worker {
    pub registry: Arc<JobRegistry>,
    pub orchestrator: Arc<Orchestrator>,
}

impl Worker {
    /// Wire the pipeline against the configured HTTP generation service.
    pub fn from_config(config: &WorkerConfig) -> Self {
        let service: Arc<dyn GenerationService> = Arc::new(GenerationApi::new(
            config.api_url.clone(),
            config.api_key.clone(),
            config.model.clone(),
        ));
        Self::with_service(config, service)
    }

    /// Wire the pipeline against any generation service.
    pub fn with_service(config: &WorkerConfig, service: Arc<dyn GenerationService>) -> Self {
        let registry = Arc::new(JobRegistry::new(Arc::new(EventBus::default())));
        let cache = Arc::new(SharedResourceCache::new(
            Arc::clone(&service),
            config.pipeline.backdrop_instructions.clone(),
        ));
        let processor = JobProcessor::new(
            service,
            Arc::new(FsCanonicalizer::default()),
            Arc::new(FsAssetStore::new(config.output_dir.clone())),
            config.pipeline.job_instructions.clone(),
        );
        let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&registry), cache, processor));

        Self {
            registry,
            orchestrator,
        }
    }
}

/// List image files in `dir` as job requests, sorted by file name.
pub async fn discover_inputs(dir: &Path, mode: CanonicalMode) -> io::Result<Vec<NewJob>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut paths = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let path = entry.path();
        let is_image = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| INPUT_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)));
        if is_image {
            paths.push(path);
        }
    }
    paths.sort();

    Ok(paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            NewJob::new(name, path.to_string_lossy().into_owned()).with_mode(mode)
        })
        .collect())
}

/// Forward pipeline events to the log at debug level until the bus closes.
pub fn spawn_event_logger(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => tracing::debug!(
                    event_type = event.event_type(),
                    timestamp = %event.timestamp,
                    "Pipeline event",
                ),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger fell behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
