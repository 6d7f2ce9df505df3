//! Host-provided collaborators.
//!
//! The pipeline never decodes or writes image files itself. A host
//! supplies a [`Canonicalizer`] that turns an input reference into a
//! submittable image, and an [`AssetStore`] that keeps generated outputs
//! and hands back a reference to them.

use std::collections::HashMap;

use async_trait::async_trait;
use backdrop_core::asset::{AssetRef, CanonicalAsset, CanonicalMode, GeneratedAsset};
use backdrop_core::job::Job;
use tokio::sync::RwLock;

/// The raw input could not be turned into a canonical image.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ConversionError(pub String);

/// A generated image could not be persisted.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(pub String);

/// Produces the fixed-format image submitted for a job.
#[async_trait]
pub trait Canonicalizer: Send + Sync {
    async fn canonicalize(
        &self,
        input: &AssetRef,
        mode: CanonicalMode,
    ) -> Result<CanonicalAsset, ConversionError>;
}

/// Keeps a finished job's output and returns its handle.
#[async_trait]
pub trait AssetStore: Send + Sync {
    async fn store(&self, job: &Job, asset: &GeneratedAsset) -> Result<AssetRef, StoreError>;
}

// ---------------------------------------------------------------------------
// MemoryAssetStore
// ---------------------------------------------------------------------------

/// Keeps outputs in memory under `memory://<job id>.<ext>` references.
#[derive(Default)]
pub struct MemoryAssetStore {
    assets: RwLock<HashMap<AssetRef, GeneratedAsset>>,
}

impl MemoryAssetStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, reference: &AssetRef) -> Option<GeneratedAsset> {
        self.assets.read().await.get(reference).cloned()
    }

    pub async fn len(&self) -> usize {
        self.assets.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.assets.read().await.is_empty()
    }
}

#[async_trait]
impl AssetStore for MemoryAssetStore {
    async fn store(&self, job: &Job, asset: &GeneratedAsset) -> Result<AssetRef, StoreError> {
        let reference = AssetRef::new(format!("memory://{}.{}", job.id, asset.extension()));
        self.assets
            .write()
            .await
            .insert(reference.clone(), asset.clone());
        Ok(reference)
    }
}
