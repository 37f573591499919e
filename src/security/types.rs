use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl Severity {
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::High,
        Severity::Medium,
        Severity::Low,
        Severity::Info,
    ];

    /// Weight subtracted from a perfect compliance score.
    pub fn compliance_weight(self) -> f64 {
        match self {
            Severity::Critical => 10.0,
            Severity::High => 5.0,
            Severity::Medium => 2.0,
            Severity::Low => 1.0,
            Severity::Info => 0.5,
        }
    }

    pub fn risk_weight(self) -> f64 {
        match self {
            Severity::Critical => 10.0,
            Severity::High => 7.0,
            Severity::Medium => 4.0,
            Severity::Low => 1.0,
            Severity::Info => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::High => "high",
            Severity::Medium => "medium",
            Severity::Low => "low",
            Severity::Info => "info",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FindingCategory {
    PublicAccess,
    Encryption,
    DataProtection,
    Configuration,
    Network,
    AccessControl,
    Compliance,
}

impl FindingCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            FindingCategory::PublicAccess => "public_access",
            FindingCategory::Encryption => "encryption",
            FindingCategory::DataProtection => "data_protection",
            FindingCategory::Configuration => "configuration",
            FindingCategory::Network => "network",
            FindingCategory::AccessControl => "access_control",
            FindingCategory::Compliance => "compliance",
        }
    }
}

impl fmt::Display for FindingCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindingMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Configuration value that triggered the rule, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence: Option<String>,
    /// Group key for consistency findings.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// One violated rule on one resource. Never merged with other findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityFinding {
    pub id: String,
    pub rule_id: String,
    pub resource_id: String,
    pub resource_address: String,
    pub provider: String,
    pub service: String,
    pub resource_type: String,
    pub severity: Severity,
    pub category: FindingCategory,
    pub title: String,
    pub description: String,
    pub recommendation: String,
    pub compliance: Vec<String>,
    pub metadata: FindingMetadata,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeveritySummary {
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    pub total_findings: usize,
}

impl SeveritySummary {
    pub fn from_findings(findings: &[SecurityFinding]) -> Self {
        let mut summary = SeveritySummary::default();
        for finding in findings {
            summary.record(finding.severity);
        }
        summary
    }

    pub fn record(&mut self, severity: Severity) {
        match severity {
            Severity::Critical => self.critical += 1,
            Severity::High => self.high += 1,
            Severity::Medium => self.medium += 1,
            Severity::Low => self.low += 1,
            Severity::Info => self.info += 1,
        }
        self.total_findings += 1;
    }

    pub fn count(&self, severity: Severity) -> usize {
        match severity {
            Severity::Critical => self.critical,
            Severity::High => self.high,
            Severity::Medium => self.medium,
            Severity::Low => self.low,
            Severity::Info => self.info,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityReport {
    pub findings: Vec<SecurityFinding>,
    pub summary: SeveritySummary,
    pub compliance_score: f64,
    pub risk_score: f64,
    pub by_category: BTreeMap<FindingCategory, usize>,
}

impl Default for SecurityReport {
    fn default() -> Self {
        SecurityReport::from_findings(Vec::new())
    }
}

impl SecurityReport {
    pub fn from_findings(findings: Vec<SecurityFinding>) -> Self {
        let mut by_category = BTreeMap::new();
        for finding in &findings {
            *by_category.entry(finding.category).or_insert(0) += 1;
        }

        SecurityReport {
            summary: SeveritySummary::from_findings(&findings),
            compliance_score: crate::security::scoring::compliance_score(&findings),
            risk_score: crate::security::scoring::risk_score(&findings),
            by_category,
            findings,
        }
    }

    pub fn findings_for(&self, resource_id: &str) -> Vec<&SecurityFinding> {
        self.findings
            .iter()
            .filter(|f| f.resource_id == resource_id)
            .collect()
    }
}
