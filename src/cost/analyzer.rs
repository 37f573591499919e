use anyhow::{anyhow, Result};
use log::{info, warn};
use std::time::Instant;
use crate::config::AnalysisConfig;
use crate::cost::estimator;
use crate::cost::optimizer;
use crate::cost::types::{CostEstimate, CostReport, CostSummary, CURRENCY, DAYS_PER_MONTH, HOURS_PER_MONTH};
use crate::engine::{partition_by_provider, Accumulator, CancellationFlag, WorkUnit, WorkerPool};
use crate::inventory::{Resource, Snapshot};

/// Per-resource result of a cost partition.
#[derive(Debug)]
enum Priced {
    Estimated(CostEstimate),
    Excluded(String),
}

/// Estimates monthly spend and derives savings recommendations.
#[derive(Debug, Clone)]
pub struct CostAnalyzer {
    config: AnalysisConfig,
}

impl CostAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        CostAnalyzer { config }
    }

    pub async fn analyze(&self, snapshot: Snapshot, cancel: &CancellationFlag) -> CostReport {
        let started = Instant::now();
        let accumulator: Accumulator<Priced> = Accumulator::new();

        let units: Vec<WorkUnit<Vec<usize>>> = partition_by_provider(&snapshot)
            .into_iter()
            .map(|p| WorkUnit::new(p.provider.to_string(), p.members))
            .collect();

        let pool = WorkerPool::new(self.config.strategy, cancel.clone());
        let partition_snapshot = snapshot.clone();
        let outcome = pool
            .run("cost", units, &accumulator, move |members: Vec<usize>| {
                price_partition(&partition_snapshot, &members)
            })
            .await;

        let mut estimates = Vec::new();
        let mut excluded_resources = Vec::new();
        for priced in accumulator.take() {
            match priced {
                Priced::Estimated(estimate) => estimates.push(estimate),
                Priced::Excluded(id) => excluded_resources.push(id),
            }
        }
        estimates.sort_by(|a, b| a.resource_id.cmp(&b.resource_id));
        excluded_resources.sort();

        let report = build_report(estimates, excluded_resources);
        info!(
            "Cost analysis: {} estimate(s), ${:.2}/month, ${:.2} potential savings, {} excluded, {} failed unit(s) in {:?}",
            report.estimates.len(),
            report.total_monthly_cost,
            report.potential_savings,
            report.excluded_resources.len(),
            outcome.failed.len(),
            started.elapsed()
        );
        report
    }
}

fn price_partition(resources: &[Resource], members: &[usize]) -> Result<Vec<Priced>> {
    let mut priced = Vec::with_capacity(members.len());
    for &idx in members {
        let resource = resources
            .get(idx)
            .ok_or_else(|| anyhow!("resource index {} outside snapshot of {}", idx, resources.len()))?;

        match estimator::estimate(resource) {
            Ok(estimate) => priced.push(Priced::Estimated(estimate)),
            Err(e) => {
                warn!("{}", e);
                priced.push(Priced::Excluded(resource.id.clone()));
            }
        }
    }
    Ok(priced)
}

/// Assemble a report from estimates sorted by resource id.
pub fn build_report(estimates: Vec<CostEstimate>, excluded_resources: Vec<String>) -> CostReport {
    let summary = CostSummary::from_estimates(&estimates);

    let mut optimizations: Vec<_> = estimates
        .iter()
        .flat_map(optimizer::resource_optimizations)
        .collect();
    optimizations.extend(optimizer::provider_optimizations(&summary.cost_by_provider));

    let total = summary.total_monthly_cost;
    let potential_savings = optimizations.iter().map(|o| o.potential_savings).sum();

    CostReport {
        total_monthly_cost: total,
        total_daily_cost: total / DAYS_PER_MONTH,
        total_hourly_cost: total / HOURS_PER_MONTH,
        currency: CURRENCY.to_string(),
        estimates,
        optimizations,
        summary,
        potential_savings,
        excluded_resources,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::types::OptimizationCategory;
    use crate::inventory::Provider;
    use std::sync::Arc;

    fn analyzer() -> CostAnalyzer {
        CostAnalyzer::new(AnalysisConfig::pooled(2, 10))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_summary_breakdown() {
        let snapshot: Snapshot = Arc::new(vec![
            Resource::new("a", Provider::Aws, "s3", "bucket").with_monthly_cost(50.0),
            Resource::new("b", Provider::Aws, "lambda", "function").with_monthly_cost(10.0),
            Resource::new("c", Provider::Azure, "storage", "account").with_monthly_cost(30.0),
        ]);
        let report = analyzer().analyze(snapshot, &CancellationFlag::new()).await;

        assert_eq!(report.summary.average_monthly_cost, 30.0);
        assert_eq!(report.summary.cost_by_provider.get("aws"), Some(&60.0));
        assert_eq!(report.summary.cost_by_provider.get("azure"), Some(&30.0));
        assert_eq!(report.summary.resource_count_by_provider.get("aws"), Some(&2));
        assert_eq!(report.summary.highest_cost_resource.as_deref(), Some("a"));
        assert_eq!(report.summary.lowest_cost_resource.as_deref(), Some("b"));
        assert_eq!(report.total_monthly_cost, 90.0);
        assert!((report.total_daily_cost - 3.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_ties_pick_smallest_id() {
        let snapshot: Snapshot = Arc::new(vec![
            Resource::new("z", Provider::Aws, "s3", "bucket").with_monthly_cost(20.0),
            Resource::new("m", Provider::Aws, "s3", "bucket").with_monthly_cost(20.0),
        ]);
        let report = CostAnalyzer::new(AnalysisConfig::sequential())
            .analyze(snapshot, &CancellationFlag::new())
            .await;

        assert_eq!(report.summary.highest_cost_resource.as_deref(), Some("m"));
        assert_eq!(report.summary.lowest_cost_resource.as_deref(), Some("m"));
        assert_eq!(report.estimates[0].resource_id, "m");
    }

    #[tokio::test]
    async fn test_unknown_provider_is_excluded() {
        let snapshot: Snapshot = Arc::new(vec![
            Resource::new("ok", Provider::Aws, "s3", "bucket"),
            Resource::new("odd", Provider::Other("oracle".to_string()), "compute", "vm"),
        ]);
        let report = analyzer().analyze(snapshot, &CancellationFlag::new()).await;

        assert_eq!(report.estimates.len(), 1);
        assert_eq!(report.excluded_resources, vec!["odd".to_string()]);
    }

    #[tokio::test]
    async fn test_ec2_reserved_savings() {
        let snapshot: Snapshot = Arc::new(vec![
            Resource::new("i-1", Provider::Aws, "ec2", "instance").with_monthly_cost(150.0),
        ]);
        let report = analyzer().analyze(snapshot, &CancellationFlag::new()).await;

        let reserved = report
            .optimizations
            .iter()
            .find(|o| o.category == OptimizationCategory::Reserved)
            .unwrap();
        assert!((reserved.potential_savings - 60.0).abs() < 1e-9);
        assert!((report.potential_savings - 105.0).abs() < 1e-9);
    }
}
