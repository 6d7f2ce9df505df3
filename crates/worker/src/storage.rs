//! Filesystem output store.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use backdrop_core::asset::{AssetRef, GeneratedAsset};
use backdrop_core::job::Job;
use backdrop_pipeline::collaborators::{AssetStore, StoreError};

/// Writes each output to `<dir>/<name stem>-<job id>.<ext>`.
///
/// The full id is kept in the name: registry ids are UUID v7, whose
/// leading hex digits are a timestamp shared by jobs submitted together.
pub struct FsAssetStore {
    dir: PathBuf,
}

impl FsAssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn output_path(&self, job: &Job, asset: &GeneratedAsset) -> PathBuf {
        let stem = Path::new(&job.name)
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("output");
        self.dir
            .join(format!("{stem}-{}.{}", job.id.simple(), asset.extension()))
    }
}

#[async_trait]
impl AssetStore for FsAssetStore {
    async fn store(&self, job: &Job, asset: &GeneratedAsset) -> Result<AssetRef, StoreError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError(format!("cannot create {}: {e}", self.dir.display())))?;

        let path = self.output_path(job, asset);
        tokio::fs::write(&path, &asset.data)
            .await
            .map_err(|e| StoreError(format!("cannot write {}: {e}", path.display())))?;

        tracing::debug!(job_id = %job.id, path = %path.display(), "Output written");
        Ok(AssetRef::new(path.to_string_lossy().into_owned()))
    }
}
