//! Filesystem host tests: input discovery, header sniffing, output
//! storage and a full round against a scripted generation service.

use std::path::Path;
use std::sync::Arc;

use assert_matches::assert_matches;
use async_trait::async_trait;
use backdrop_core::asset::{AssetRef, CanonicalAsset, CanonicalMode, GeneratedAsset};
use backdrop_core::job::{Job, JobStatus, NewJob};
use backdrop_genai::{GenerationResponse, GenerationService, ServiceError};
use backdrop_pipeline::{AssetStore, Canonicalizer};
use backdrop_worker::app::{discover_inputs, Worker};
use backdrop_worker::canonicalize::FsCanonicalizer;
use backdrop_worker::config::WorkerConfig;
use backdrop_worker::storage::FsAssetStore;
use uuid::Uuid;

fn write_png(path: &Path, width: u32, height: u32) {
    image::RgbImage::new(width, height).save(path).unwrap();
}

/// Answers every call with a fixed PNG payload.
struct StaticService;

#[async_trait]
impl GenerationService for StaticService {
    async fn generate(
        &self,
        _inputs: &[CanonicalAsset],
        _instructions: &str,
    ) -> Result<GenerationResponse, ServiceError> {
        Ok(GenerationResponse::image("image/png", b"generated"))
    }
}

#[tokio::test]
async fn discovery_lists_images_sorted_by_name() {
    let dir = tempfile::tempdir().unwrap();
    write_png(&dir.path().join("b.png"), 2, 2);
    write_png(&dir.path().join("a.PNG"), 2, 2);
    std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();
    std::fs::create_dir(dir.path().join("nested.png")).unwrap();

    let jobs = discover_inputs(dir.path(), CanonicalMode::Preserve)
        .await
        .unwrap();

    let names: Vec<_> = jobs.iter().map(|j| j.name.as_str()).collect();
    assert_eq!(names, ["a.PNG", "b.png"]);
    assert!(jobs.iter().all(|j| j.mode == CanonicalMode::Preserve));
    assert!(jobs[0].input.as_str().ends_with("a.PNG"));
}

#[tokio::test]
async fn canonicalizer_reports_png_mime_type() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cat.png");
    write_png(&path, 8, 8);

    let asset = FsCanonicalizer::default()
        .canonicalize(&AssetRef::from(path.to_string_lossy().as_ref()), CanonicalMode::Square)
        .await
        .unwrap();

    assert_eq!(asset.mime_type, "image/png");
    assert_eq!(asset.data, std::fs::read(&path).unwrap());
}

#[tokio::test]
async fn canonicalizer_enforces_square_mode() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("wide.png");
    write_png(&path, 8, 4);
    let input = AssetRef::from(path.to_string_lossy().as_ref());
    let canonicalizer = FsCanonicalizer::default();

    let err = canonicalizer
        .canonicalize(&input, CanonicalMode::Square)
        .await
        .unwrap_err();
    assert_eq!(err.0, "square mode expects a square image, got 8x4");

    assert!(canonicalizer
        .canonicalize(&input, CanonicalMode::Preserve)
        .await
        .is_ok());
}

#[tokio::test]
async fn canonicalizer_reports_missing_files() {
    let err = FsCanonicalizer::default()
        .canonicalize(&AssetRef::from("/no/such/input.png"), CanonicalMode::Square)
        .await
        .unwrap_err();

    assert!(err.0.starts_with("cannot read /no/such/input.png"));
}

#[tokio::test]
async fn store_names_outputs_after_input_and_job_id() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let store = FsAssetStore::new(&out);
    let id = Uuid::parse_str("0192f0c4-1b2a-7c3d-8e4f-5a6b7c8d9e0f").unwrap();
    let job = Job::pending(id, NewJob::new("portrait.jpg", "in/portrait.jpg"));
    let asset = GeneratedAsset::new("image/webp", b"webp-bytes".to_vec());

    let reference = store.store(&job, &asset).await.unwrap();

    let expected = out.join("portrait-0192f0c41b2a7c3d8e4f5a6b7c8d9e0f.webp");
    assert_eq!(reference.as_str(), expected.to_string_lossy());
    assert_eq!(std::fs::read(expected).unwrap(), b"webp-bytes");
}

#[tokio::test]
async fn inputs_sharing_a_stem_get_separate_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let store = FsAssetStore::new(dir.path());
    let png = Job::pending(Uuid::now_v7(), NewJob::new("cat.png", "in/cat.png"));
    let jpg = Job::pending(Uuid::now_v7(), NewJob::new("cat.jpg", "in/cat.jpg"));

    let a = store
        .store(&png, &GeneratedAsset::new("image/png", b"A".to_vec()))
        .await
        .unwrap();
    let b = store
        .store(&jpg, &GeneratedAsset::new("image/png", b"B".to_vec()))
        .await
        .unwrap();

    assert_ne!(a, b);
    assert_eq!(std::fs::read(a.as_str()).unwrap(), b"A");
    assert_eq!(std::fs::read(b.as_str()).unwrap(), b"B");
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[tokio::test]
async fn worker_round_writes_outputs_and_isolates_bad_inputs() {
    let input = tempfile::tempdir().unwrap();
    let output = tempfile::tempdir().unwrap();
    write_png(&input.path().join("good.png"), 16, 16);
    write_png(&input.path().join("wide.png"), 16, 8);

    let config = WorkerConfig::from_lookup(|key| match key {
        "GENAI_API_KEY" => Some("test".into()),
        "INPUT_DIR" => Some(input.path().to_string_lossy().into_owned()),
        "OUTPUT_DIR" => Some(output.path().to_string_lossy().into_owned()),
        _ => None,
    })
    .unwrap();
    let worker = Worker::with_service(&config, Arc::new(StaticService));

    let requests = discover_inputs(&config.input_dir, config.mode).await.unwrap();
    worker.registry.submit_many(requests).await.unwrap();

    let summary = worker.orchestrator.run_once().await.unwrap();
    assert_eq!((summary.done, summary.failed), (1, 1));

    let jobs = worker.registry.snapshot().await;
    assert_eq!(jobs[0].name, "good.png");
    assert_eq!(jobs[0].status, JobStatus::Done);
    let written = jobs[0].output.as_ref().unwrap();
    assert_eq!(std::fs::read(written.as_str()).unwrap(), b"generated");

    assert_eq!(jobs[1].name, "wide.png");
    assert_matches!(
        jobs[1].error.as_deref(),
        Some(e) if e.starts_with("Could not prepare input: square mode")
    );
}
