use cloudscope::analysis::DependencyAnalyzer;
use cloudscope::config::AnalysisConfig;
use cloudscope::cost::{CostAnalyzer, OptimizationCategory};
use cloudscope::engine::CancellationFlag;
use cloudscope::inventory::{Provider, Resource, Snapshot};
use cloudscope::security::{FindingCategory, SecurityAnalyzer, Severity};
use std::sync::Arc;

fn config() -> AnalysisConfig {
    AnalysisConfig::pooled(4, 2)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_public_instance_and_public_bucket() {
    let snapshot: Snapshot = Arc::new(vec![
        Resource::new("i-0abc", Provider::Aws, "ec2", "instance")
            .with_public_access(true)
            .with_encrypted(true),
        Resource::new("media", Provider::Aws, "s3", "bucket")
            .with_public_access(true)
            .with_encrypted(false),
    ]);
    let report = SecurityAnalyzer::new(config())
        .analyze(snapshot, &CancellationFlag::new())
        .await;

    assert!(report.findings.len() >= 2);
    assert!(report.findings.iter().any(|f| {
        f.resource_id == "i-0abc" && f.category == FindingCategory::PublicAccess && f.severity == Severity::High
    }));
    assert!(report.findings.iter().any(|f| {
        f.resource_id == "media" && f.category == FindingCategory::PublicAccess && f.severity == Severity::Critical
    }));
    assert!(report.findings.iter().any(|f| {
        f.resource_id == "i-0abc" && f.category == FindingCategory::Encryption && f.severity == Severity::Medium
    }));
    assert!(report.compliance_score < 100.0);
    assert!(report.risk_score > 0.0);
    assert!((0.0..=100.0).contains(&report.compliance_score));
    assert!((0.0..=100.0).contains(&report.risk_score));
}

#[tokio::test]
async fn test_single_ec2_instance_reserved_recommendation() {
    let snapshot: Snapshot = Arc::new(vec![
        Resource::new("i-0abc", Provider::Aws, "ec2", "instance").with_monthly_cost(150.0),
    ]);
    let report = CostAnalyzer::new(config())
        .analyze(snapshot, &CancellationFlag::new())
        .await;

    let reserved = report
        .optimizations
        .iter()
        .find(|o| o.category == OptimizationCategory::Reserved)
        .unwrap();
    assert_eq!(reserved.category.as_str(), "reserved");
    assert!((reserved.potential_savings - 60.0).abs() < 1e-9);
    assert!((reserved.savings_percent - 40.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_cost_breakdown_by_provider() {
    let snapshot: Snapshot = Arc::new(vec![
        Resource::new("a", Provider::Aws, "ec2", "instance").with_monthly_cost(50.0),
        Resource::new("b", Provider::Aws, "s3", "bucket").with_monthly_cost(10.0),
        Resource::new("c", Provider::Azure, "compute", "virtual_machine").with_monthly_cost(30.0),
    ]);
    let report = CostAnalyzer::new(config())
        .analyze(snapshot, &CancellationFlag::new())
        .await;

    assert_eq!(report.summary.average_monthly_cost, 30.0);
    assert_eq!(report.summary.cost_by_provider["aws"], 60.0);
    assert_eq!(report.summary.cost_by_provider["azure"], 30.0);
    for estimate in &report.estimates {
        assert_eq!(estimate.confidence, 0.8);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_unrelated_resources_are_all_islands() {
    let snapshot: Snapshot = Arc::new(vec![
        Resource::new("bucket", Provider::Aws, "s3", "bucket"),
        Resource::new("vm", Provider::Azure, "compute", "virtual_machine"),
        Resource::new("db", Provider::Gcp, "sql", "instance"),
    ]);
    let graph = DependencyAnalyzer::new(config())
        .analyze(snapshot, &CancellationFlag::new())
        .await;

    assert_eq!(graph.stats.total_dependencies, 0);
    assert_eq!(graph.stats.islands, graph.stats.total_resources);
    assert_eq!(graph.stats.cycles, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_mutual_cross_provider_references_form_a_cycle() {
    let snapshot: Snapshot = Arc::new(vec![
        Resource::new("queue", Provider::Aws, "sqs", "queue")
            .with_configuration(r#"{"subscriber": "topic"}"#),
        Resource::new("topic", Provider::Gcp, "pubsub", "topic")
            .with_configuration(r#"{"deadLetter": "queue"}"#),
    ]);
    let graph = DependencyAnalyzer::new(config())
        .analyze(snapshot, &CancellationFlag::new())
        .await;

    assert_eq!(graph.stats.total_dependencies, 2);
    assert_eq!(graph.stats.cycles, 1);
    assert_eq!(graph.stats.islands, 0);
    assert_eq!(graph.stats.max_depth, 2);
}
