use chrono::Utc;
use log::{error, info, warn};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use uuid::Uuid;
use crate::analysis::{DependencyAnalyzer, DependencyGraph};
use crate::config::AnalysisConfig;
use crate::cost::{CostAnalyzer, CostReport};
use crate::engine::{CancellationFlag, SnapshotCache};
use crate::error::AnalysisResult;
use crate::inventory::Snapshot;
use crate::security::{SecurityAnalyzer, SecurityReport};
use crate::storage::ResourceStore;

pub mod insights;
pub mod report;

pub use insights::derive_insights;
pub use report::{AnalysisReport, AnalysisSummary, Section};

/// Runs the three analyzers over one inventory snapshot.
pub struct AnalysisOrchestrator {
    store: Arc<dyn ResourceStore>,
    config: AnalysisConfig,
    dependency_analyzer: DependencyAnalyzer,
    security_analyzer: SecurityAnalyzer,
    cost_analyzer: CostAnalyzer,
}

impl AnalysisOrchestrator {
    pub fn new(store: Arc<dyn ResourceStore>, config: AnalysisConfig) -> Self {
        AnalysisOrchestrator {
            store,
            config,
            dependency_analyzer: DependencyAnalyzer::new(config),
            security_analyzer: SecurityAnalyzer::new(config),
            cost_analyzer: CostAnalyzer::new(config),
        }
    }

    pub fn config(&self) -> AnalysisConfig {
        self.config
    }

    pub async fn analyze_all(&self) -> AnalysisResult<AnalysisReport> {
        self.analyze_all_with_cancel(&CancellationFlag::new()).await
    }

    /// Full analysis. Fails only when the initial snapshot cannot be
    /// fetched; analyzer failures leave their section empty and are listed in
    /// `degraded_sections`.
    pub async fn analyze_all_with_cancel(&self, cancel: &CancellationFlag) -> AnalysisResult<AnalysisReport> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let started = Instant::now();
        info!("Starting analysis run {}", run_id);

        let cache = Arc::new(SnapshotCache::new(self.store.clone(), self.config.cache));
        let snapshot = cache.get().await.map_err(|e| {
            error!("Analysis run {} aborted: {}", run_id, e);
            e
        })?;

        let dependencies = {
            let analyzer = self.dependency_analyzer.clone();
            spawn_section(cache.clone(), cancel.clone(), move |snapshot, cancel| async move {
                analyzer.analyze(snapshot, &cancel).await
            })
        };
        let security = {
            let analyzer = self.security_analyzer.clone();
            spawn_section(cache.clone(), cancel.clone(), move |snapshot, cancel| async move {
                analyzer.analyze(snapshot, &cancel).await
            })
        };
        let cost = {
            let analyzer = self.cost_analyzer.clone();
            spawn_section(cache.clone(), cancel.clone(), move |snapshot, cancel| async move {
                analyzer.analyze(snapshot, &cancel).await
            })
        };

        // Wait for all three regardless of how each one ends.
        let (dependencies, security, cost) = tokio::join!(dependencies, security, cost);

        let mut degraded_sections = Vec::new();
        let dependencies: DependencyGraph = settle(Section::Dependencies, dependencies, &mut degraded_sections);
        let security: SecurityReport = settle(Section::Security, security, &mut degraded_sections);
        let cost: CostReport = settle(Section::Cost, cost, &mut degraded_sections);

        let summary = AnalysisSummary::derive(count_by_provider(&snapshot), &dependencies, &security, &cost);
        let duration = started.elapsed();
        let cancelled = cancel.is_cancelled();

        info!(
            "Analysis run {} finished in {:?}: {} resources, {} dependencies, {} findings, ${:.2}/month{}",
            run_id,
            duration,
            summary.total_resources,
            summary.total_dependencies,
            summary.total_findings,
            summary.total_monthly_cost,
            if cancelled { " (cancelled)" } else { "" }
        );

        Ok(AnalysisReport {
            run_id,
            started_at,
            completed_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
            dependencies,
            security,
            cost,
            summary,
            degraded_sections,
            cancelled,
        })
    }

    pub async fn analyze_dependencies(&self) -> AnalysisResult<DependencyGraph> {
        let snapshot = self.fetch_snapshot().await?;
        Ok(self.dependency_analyzer.analyze(snapshot, &CancellationFlag::new()).await)
    }

    pub async fn analyze_security(&self) -> AnalysisResult<SecurityReport> {
        let snapshot = self.fetch_snapshot().await?;
        Ok(self.security_analyzer.analyze(snapshot, &CancellationFlag::new()).await)
    }

    pub async fn analyze_cost(&self) -> AnalysisResult<CostReport> {
        let snapshot = self.fetch_snapshot().await?;
        Ok(self.cost_analyzer.analyze(snapshot, &CancellationFlag::new()).await)
    }

    /// Runs a fresh full analysis and describes it.
    pub async fn get_analysis_insights(&self) -> AnalysisResult<Vec<String>> {
        let report = self.analyze_all().await?;
        Ok(derive_insights(&report))
    }

    async fn fetch_snapshot(&self) -> AnalysisResult<Snapshot> {
        SnapshotCache::new(self.store.clone(), self.config.cache).get().await
    }
}

/// Run one analyzer on its own task. With caching disabled the task fetches
/// its own snapshot, and that fetch can fail.
fn spawn_section<T, F, Fut>(
    cache: Arc<SnapshotCache>,
    cancel: CancellationFlag,
    run: F,
) -> JoinHandle<AnalysisResult<T>>
where
    T: Send + 'static,
    F: FnOnce(Snapshot, CancellationFlag) -> Fut + Send + 'static,
    Fut: Future<Output = T> + Send + 'static,
{
    tokio::spawn(async move {
        let snapshot = cache.get().await?;
        Ok(run(snapshot, cancel).await)
    })
}

fn settle<T: Default>(
    section: Section,
    joined: Result<AnalysisResult<T>, tokio::task::JoinError>,
    degraded: &mut Vec<Section>,
) -> T {
    match joined {
        Ok(Ok(value)) => value,
        Ok(Err(e)) => {
            warn!("{} analysis failed: {}", section, e);
            degraded.push(section);
            T::default()
        }
        Err(e) => {
            warn!("{} analysis aborted: {}", section, e);
            degraded.push(section);
            T::default()
        }
    }
}

fn count_by_provider(snapshot: &Snapshot) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for resource in snapshot.iter() {
        *counts.entry(resource.provider.to_string()).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::CachePolicy;
    use crate::inventory::{Provider, Resource, ResourceFilter};
    use crate::storage::InMemoryResourceStore;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Succeeds for the first `allowed` calls, then fails.
    struct FlakyStore {
        inner: InMemoryResourceStore,
        allowed: usize,
        calls: AtomicUsize,
    }

    impl ResourceStore for FlakyStore {
        fn find_resources(&self, filter: &ResourceFilter) -> anyhow::Result<Vec<Resource>> {
            if self.calls.fetch_add(1, Ordering::SeqCst) >= self.allowed {
                anyhow::bail!("inventory database unavailable");
            }
            self.inner.find_resources(filter)
        }
    }

    fn resources() -> Vec<Resource> {
        vec![
            Resource::new("i-1", Provider::Aws, "ec2", "instance")
                .with_public_access(true)
                .with_monthly_cost(150.0),
            Resource::new("bucket-1", Provider::Aws, "s3", "bucket").with_public_access(true),
            Resource::new("vm-1", Provider::Gcp, "compute", "instance"),
        ]
    }

    fn flaky(allowed: usize) -> Arc<FlakyStore> {
        Arc::new(FlakyStore {
            inner: InMemoryResourceStore::new(resources()),
            allowed,
            calls: AtomicUsize::new(0),
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_analyze_all_shares_one_snapshot() {
        let store = flaky(1);
        let orchestrator = AnalysisOrchestrator::new(store.clone(), AnalysisConfig::pooled(2, 10));
        let report = orchestrator.analyze_all().await.unwrap();

        assert!(report.is_complete());
        assert_eq!(store.calls.load(Ordering::SeqCst), 1);
        assert_eq!(report.summary.total_resources, 3);
        assert_eq!(report.summary.resources_by_provider.get("aws"), Some(&2));
        assert!(report.summary.critical_findings >= 1);
        assert!(report.cost.optimizations.iter().any(|o| o.resource_id == "i-1"));
    }

    #[tokio::test]
    async fn test_snapshot_failure_is_fatal() {
        let orchestrator = AnalysisOrchestrator::new(flaky(0), AnalysisConfig::sequential());
        assert!(orchestrator.analyze_all().await.is_err());
        assert!(orchestrator.analyze_security().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_disabled_cache_degrades_sections_whose_fetch_fails() {
        // First fetch succeeds, every per-analyzer re-fetch fails.
        let config = AnalysisConfig::new(crate::engine::ExecutionStrategy::Sequential, CachePolicy::Disabled);
        let orchestrator = AnalysisOrchestrator::new(flaky(1), config);
        let report = orchestrator.analyze_all().await.unwrap();

        let mut degraded = report.degraded_sections.clone();
        degraded.sort();
        assert_eq!(degraded, vec![Section::Dependencies, Section::Security, Section::Cost]);
        assert!(report.security.findings.is_empty());
        assert_eq!(report.security.compliance_score, 100.0);
        assert_eq!(report.summary.total_resources, 3);
    }

    #[tokio::test]
    async fn test_cancelled_run_is_flagged() {
        let orchestrator = AnalysisOrchestrator::new(flaky(1), AnalysisConfig::sequential());
        let cancel = CancellationFlag::new();
        cancel.cancel();

        let report = orchestrator.analyze_all_with_cancel(&cancel).await.unwrap();
        assert!(report.cancelled);
        assert!(report.degraded_sections.is_empty());
        assert!(report.cost.estimates.is_empty());
    }

    #[tokio::test]
    async fn test_insights_mention_findings_and_cost() {
        let store = Arc::new(InMemoryResourceStore::new(resources()));
        let orchestrator = AnalysisOrchestrator::new(store, AnalysisConfig::sequential());
        let insights = orchestrator.get_analysis_insights().await.unwrap();

        assert!(insights.iter().any(|i| i.contains("critical security finding")));
        assert!(insights.iter().any(|i| i.starts_with("Total monthly cost $")));
    }
}
