use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;
use crate::analysis::DependencyGraph;
use crate::cost::CostReport;
use crate::security::SecurityReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Dependencies,
    Security,
    Cost,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Section::Dependencies => write!(f, "dependencies"),
            Section::Security => write!(f, "security"),
            Section::Cost => write!(f, "cost"),
        }
    }
}

/// Cross-cutting figures pulled from the three sections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_resources: usize,
    pub resources_by_provider: BTreeMap<String, usize>,
    pub total_dependencies: usize,
    pub islands: usize,
    pub max_depth: usize,
    pub cycles: usize,
    pub total_findings: usize,
    pub critical_findings: usize,
    pub high_findings: usize,
    pub compliance_score: f64,
    pub risk_score: f64,
    pub total_monthly_cost: f64,
    pub potential_savings: f64,
    pub optimization_count: usize,
}

impl AnalysisSummary {
    pub fn derive(
        resources_by_provider: BTreeMap<String, usize>,
        dependencies: &DependencyGraph,
        security: &SecurityReport,
        cost: &CostReport,
    ) -> Self {
        AnalysisSummary {
            total_resources: resources_by_provider.values().sum(),
            resources_by_provider,
            total_dependencies: dependencies.stats.total_dependencies,
            islands: dependencies.stats.islands,
            max_depth: dependencies.stats.max_depth,
            cycles: dependencies.stats.cycles,
            total_findings: security.summary.total_findings,
            critical_findings: security.summary.critical,
            high_findings: security.summary.high,
            compliance_score: security.compliance_score,
            risk_score: security.risk_score,
            total_monthly_cost: cost.total_monthly_cost,
            potential_savings: cost.potential_savings,
            optimization_count: cost.optimizations.len(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub dependencies: DependencyGraph,
    pub security: SecurityReport,
    pub cost: CostReport,
    pub summary: AnalysisSummary,
    /// Sections left empty because their analyzer failed.
    pub degraded_sections: Vec<Section>,
    /// Cancellation was observed; sections may be partial.
    pub cancelled: bool,
}

impl AnalysisReport {
    pub fn is_complete(&self) -> bool {
        self.degraded_sections.is_empty() && !self.cancelled
    }
}
