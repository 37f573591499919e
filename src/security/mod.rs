pub mod analyzer;
pub mod rules;
pub mod scoring;
pub mod templates;
pub mod types;

pub use analyzer::SecurityAnalyzer;
pub use rules::{SecurityRule, RuleScope, CATALOG};
pub use scoring::{compliance_score, risk_score};
pub use types::{FindingCategory, FindingMetadata, SecurityFinding, SecurityReport, Severity, SeveritySummary};
