use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use crate::error::{AnalysisError, AnalysisResult};
use crate::inventory::{ResourceFilter, Snapshot};
use crate::storage::ResourceStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// The first fetch of a call is reused by every analyzer in that call.
    PerCall,
    /// Every `get` goes to storage.
    Disabled,
}

/// Snapshot cache scoped to a single orchestrator call.
///
/// Reads take the shared lock; a miss upgrades to the exclusive lock and
/// re-checks, so concurrent misses still produce one storage round-trip.
pub struct SnapshotCache {
    store: Arc<dyn ResourceStore>,
    policy: CachePolicy,
    snapshot: RwLock<Option<Snapshot>>,
    fetches: AtomicUsize,
}

impl SnapshotCache {
    pub fn new(store: Arc<dyn ResourceStore>, policy: CachePolicy) -> Self {
        SnapshotCache {
            store,
            policy,
            snapshot: RwLock::new(None),
            fetches: AtomicUsize::new(0),
        }
    }

    pub async fn get(&self) -> AnalysisResult<Snapshot> {
        if self.policy == CachePolicy::Disabled {
            return self.fetch().await;
        }

        if let Some(snapshot) = self.snapshot.read().await.as_ref() {
            debug!("Snapshot cache hit ({} resources)", snapshot.len());
            return Ok(snapshot.clone());
        }

        let mut slot = self.snapshot.write().await;
        if let Some(snapshot) = slot.as_ref() {
            return Ok(snapshot.clone());
        }
        let snapshot = self.fetch().await?;
        *slot = Some(snapshot.clone());
        Ok(snapshot)
    }

    /// Number of storage round-trips made through this cache.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }

    async fn fetch(&self) -> AnalysisResult<Snapshot> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let store = self.store.clone();

        let resources = tokio::task::spawn_blocking(move || store.find_resources(&ResourceFilter::all()))
            .await
            .map_err(|e| AnalysisError::SnapshotFetch(e.to_string()))?
            .map_err(AnalysisError::snapshot)?;

        info!("Fetched resource snapshot: {} resource(s)", resources.len());
        Ok(Arc::new(resources))
    }
}
