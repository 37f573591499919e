use crate::orchestrator::report::AnalysisReport;

const LOW_COMPLIANCE: f64 = 80.0;
const HIGH_RISK: f64 = 5.0;
const HIGH_SAVINGS_PERCENT: f64 = 20.0;

/// Plain-language observations about a finished report.
pub fn derive_insights(report: &AnalysisReport) -> Vec<String> {
    let summary = &report.summary;
    let mut insights = Vec::new();

    if report.cancelled {
        insights.push("Analysis was cancelled; results are partial".to_string());
    }
    for section in &report.degraded_sections {
        insights.push(format!("The {} analysis failed and its section is empty", section));
    }

    if summary.critical_findings > 0 {
        insights.push(format!(
            "{} critical security finding(s) require immediate attention",
            summary.critical_findings
        ));
    }
    if summary.high_findings > 0 {
        insights.push(format!("{} high severity security finding(s)", summary.high_findings));
    }
    if summary.total_findings > 0 && summary.compliance_score < LOW_COMPLIANCE {
        insights.push(format!("Compliance score is low at {:.1}", summary.compliance_score));
    }
    if summary.risk_score > HIGH_RISK {
        insights.push(format!("Risk score is elevated at {:.1}", summary.risk_score));
    }

    if summary.total_monthly_cost > 0.0 {
        insights.push(format!(
            "Total monthly cost ${:.2} with potential savings ${:.2}",
            summary.total_monthly_cost, summary.potential_savings
        ));
        let percent = summary.potential_savings / summary.total_monthly_cost * 100.0;
        if percent > HIGH_SAVINGS_PERCENT {
            insights.push(format!("Optimizations could cut spend by {:.0}%", percent));
        }
    }
    if !report.cost.excluded_resources.is_empty() {
        insights.push(format!(
            "{} resource(s) could not be priced",
            report.cost.excluded_resources.len()
        ));
    }

    if summary.cycles > 0 {
        insights.push(format!(
            "Dependency cycles detected from {} starting point(s)",
            summary.cycles
        ));
    }
    if summary.total_resources > 0 && summary.islands > 0 {
        insights.push(format!(
            "{} of {} resource(s) have no detected dependencies",
            summary.islands, summary.total_resources
        ));
    }

    if insights.is_empty() {
        insights.push("No significant issues detected".to_string());
    }
    insights
}
