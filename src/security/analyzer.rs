use anyhow::{anyhow, Result};
use log::info;
use std::collections::BTreeMap;
use std::time::Instant;
use crate::config::AnalysisConfig;
use crate::engine::{partition_by_provider, Accumulator, CancellationFlag, WorkUnit, WorkerPool};
use crate::inventory::{GroupKey, Resource, Snapshot};
use crate::security::rules;
use crate::security::templates;
use crate::security::types::{FindingCategory, FindingMetadata, SecurityFinding, SecurityReport, Severity};

pub const INCONSISTENT_ENCRYPTION: &str = "inconsistent_encryption";

/// Evaluates the rule catalog over a snapshot.
#[derive(Debug, Clone)]
pub struct SecurityAnalyzer {
    config: AnalysisConfig,
}

impl SecurityAnalyzer {
    pub fn new(config: AnalysisConfig) -> Self {
        SecurityAnalyzer { config }
    }

    pub async fn analyze(&self, snapshot: Snapshot, cancel: &CancellationFlag) -> SecurityReport {
        let started = Instant::now();
        let accumulator: Accumulator<SecurityFinding> = Accumulator::new();

        let units: Vec<WorkUnit<Vec<usize>>> = partition_by_provider(&snapshot)
            .into_iter()
            .map(|p| WorkUnit::new(p.provider.to_string(), p.members))
            .collect();

        let pool = WorkerPool::new(self.config.strategy, cancel.clone());
        let partition_snapshot = snapshot.clone();
        let outcome = pool
            .run("security", units, &accumulator, move |members: Vec<usize>| {
                evaluate_partition(&partition_snapshot, &members)
            })
            .await;

        let mut findings = accumulator.take();
        if !cancel.is_cancelled() {
            findings.extend(consistency_findings(&snapshot));
        }
        findings.sort_by(|a, b| (&a.resource_id, &a.rule_id).cmp(&(&b.resource_id, &b.rule_id)));

        let report = SecurityReport::from_findings(findings);
        info!(
            "Security analysis: {} finding(s) ({} critical, {} high), compliance {:.1}, risk {:.1}, {} failed unit(s) in {:?}",
            report.summary.total_findings,
            report.summary.critical,
            report.summary.high,
            report.compliance_score,
            report.risk_score,
            outcome.failed.len(),
            started.elapsed()
        );
        report
    }
}

fn evaluate_partition(resources: &[Resource], members: &[usize]) -> Result<Vec<SecurityFinding>> {
    let mut findings = Vec::new();
    for &idx in members {
        let resource = resources
            .get(idx)
            .ok_or_else(|| anyhow!("resource index {} outside snapshot of {}", idx, resources.len()))?;
        findings.extend(rules::evaluate(resource));
    }
    Ok(findings)
}

/// Unencrypted members of groups where some, but not all, members are
/// encrypted.
pub fn consistency_findings(resources: &[Resource]) -> Vec<SecurityFinding> {
    let mut groups: BTreeMap<GroupKey, Vec<&Resource>> = BTreeMap::new();
    for resource in resources {
        groups.entry(resource.group_key()).or_insert_with(Vec::new).push(resource);
    }

    let mut findings = Vec::new();
    for (key, members) in groups {
        let encrypted = members.iter().filter(|r| r.encrypted).count();
        if encrypted == 0 || encrypted == members.len() {
            continue;
        }

        let group = key.to_string();
        for resource in members.iter().filter(|r| !r.encrypted) {
            findings.push(SecurityFinding {
                id: format!("{}:{}", resource.id, INCONSISTENT_ENCRYPTION),
                rule_id: INCONSISTENT_ENCRYPTION.to_string(),
                resource_id: resource.id.clone(),
                resource_address: resource.address.clone(),
                provider: resource.provider.to_string(),
                service: resource.service.clone(),
                resource_type: resource.resource_type.clone(),
                severity: Severity::Medium,
                category: FindingCategory::Encryption,
                title: templates::TITLE_INCONSISTENT_ENCRYPTION.to_string(),
                description: templates::DESC_INCONSISTENT_ENCRYPTION.to_string(),
                recommendation: templates::REC_INCONSISTENT_ENCRYPTION.to_string(),
                compliance: Vec::new(),
                metadata: FindingMetadata {
                    region: (!resource.region.is_empty()).then(|| resource.region.clone()),
                    evidence: Some(format!("{}/{} encrypted", encrypted, members.len())),
                    group: Some(group.clone()),
                },
                created_at: chrono::Utc::now(),
            });
        }
    }
    findings
}
