use crate::security::types::{SecurityFinding, Severity};

fn mean_weight(findings: &[SecurityFinding], weight: fn(Severity) -> f64) -> Option<f64> {
    if findings.is_empty() {
        return None;
    }
    let total: f64 = findings.iter().map(|f| weight(f.severity)).sum();
    Some(total / findings.len() as f64)
}

/// 100 minus the mean compliance weight, floored at 0. Perfect with no findings.
pub fn compliance_score(findings: &[SecurityFinding]) -> f64 {
    match mean_weight(findings, Severity::compliance_weight) {
        Some(mean) => (100.0 - mean).clamp(0.0, 100.0),
        None => 100.0,
    }
}

/// Mean risk weight clamped to [0, 100]. Zero with no findings.
pub fn risk_score(findings: &[SecurityFinding]) -> f64 {
    match mean_weight(findings, Severity::risk_weight) {
        Some(mean) => mean.clamp(0.0, 100.0),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::security::types::{FindingCategory, FindingMetadata, SeveritySummary};
    use chrono::Utc;

    fn finding(severity: Severity) -> SecurityFinding {
        SecurityFinding {
            id: format!("r:{}", severity),
            rule_id: severity.to_string(),
            resource_id: "r".to_string(),
            resource_address: "aws:s3:bucket/r".to_string(),
            provider: "aws".to_string(),
            service: "s3".to_string(),
            resource_type: "bucket".to_string(),
            severity,
            category: FindingCategory::Configuration,
            title: String::new(),
            description: String::new(),
            recommendation: String::new(),
            compliance: Vec::new(),
            metadata: FindingMetadata::default(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_one_finding_per_severity_pins_both_scores() {
        let findings: Vec<SecurityFinding> = Severity::ALL.iter().map(|s| finding(*s)).collect();

        let summary = SeveritySummary::from_findings(&findings);
        for severity in Severity::ALL {
            assert_eq!(summary.count(severity), 1);
        }
        assert_eq!(summary.total_findings, 5);

        assert!((compliance_score(&findings) - 96.3).abs() < 1e-9);
        assert!((risk_score(&findings) - 4.4).abs() < 1e-9);
    }

    #[test]
    fn test_scores_are_not_rounded() {
        let findings = vec![finding(Severity::Critical), finding(Severity::Info)];
        assert!((compliance_score(&findings) - 94.75).abs() < 1e-9);
        assert!((risk_score(&findings) - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_empty_findings() {
        assert_eq!(compliance_score(&[]), 100.0);
        assert_eq!(risk_score(&[]), 0.0);
    }

    #[test]
    fn test_scores_stay_in_range() {
        let findings: Vec<SecurityFinding> = (0..50).map(|_| finding(Severity::Critical)).collect();
        assert_eq!(compliance_score(&findings), 90.0);
        assert_eq!(risk_score(&findings), 10.0);

        let info_only = vec![finding(Severity::Info)];
        assert_eq!(risk_score(&info_only), 0.0);
        assert_eq!(compliance_score(&info_only), 99.5);
    }
}
