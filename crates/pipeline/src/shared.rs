//! Once-only generation of the shared backdrop.
//!
//! Every job composites its subject onto the same generated backdrop.
//! [`SharedResourceCache::ensure`] creates it through one retried
//! generation call the first time it is needed and returns the cached
//! copy afterwards. A failed creation leaves the cache empty so the next
//! batch tries again.

use std::sync::Arc;

use backdrop_core::asset::GeneratedAsset;
use backdrop_genai::{with_retry, GenerationError, GenerationService};
use tokio::sync::Mutex;

/// Operation name used in retry logs and the exhausted-retries message.
const BACKDROP_OPERATION: &str = "Backdrop generation";

pub struct SharedResourceCache {
    service: Arc<dyn GenerationService>,
    instructions: String,
    // Held across the creation call so concurrent callers never create twice.
    slot: Mutex<Option<Arc<GeneratedAsset>>>,
}

impl SharedResourceCache {
    pub fn new(service: Arc<dyn GenerationService>, instructions: impl Into<String>) -> Self {
        Self {
            service,
            instructions: instructions.into(),
            slot: Mutex::new(None),
        }
    }

    /// Return the backdrop, generating it if it does not exist yet.
    pub async fn ensure(&self) -> Result<Arc<GeneratedAsset>, GenerationError> {
        let mut slot = self.slot.lock().await;
        if let Some(asset) = slot.as_ref() {
            return Ok(Arc::clone(asset));
        }

        tracing::info!("Generating shared backdrop");
        let asset = with_retry(BACKDROP_OPERATION, || {
            self.service.generate(&[], &self.instructions)
        })
        .await?;

        tracing::info!(
            mime_type = %asset.mime_type,
            bytes = asset.data.len(),
            "Shared backdrop ready",
        );
        let asset = Arc::new(asset);
        *slot = Some(Arc::clone(&asset));
        Ok(asset)
    }

    /// The cached backdrop, if one has been generated.
    pub async fn cached(&self) -> Option<Arc<GeneratedAsset>> {
        self.slot.lock().await.clone()
    }

    /// Drop the cached backdrop so the next batch regenerates it.
    ///
    /// Returns whether anything was cached.
    pub async fn invalidate(&self) -> bool {
        let dropped = self.slot.lock().await.take().is_some();
        if dropped {
            tracing::info!("Shared backdrop invalidated");
        }
        dropped
    }
}
