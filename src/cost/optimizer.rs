use std::collections::BTreeMap;
use crate::cost::types::{CostEstimate, CostOptimization, OptimizationCategory, Priority};

pub const RIGHTSIZING_THRESHOLD: f64 = 50.0;
pub const RIGHTSIZING_SAVINGS: f64 = 0.30;
pub const RESERVED_THRESHOLD: f64 = 100.0;
pub const RESERVED_SAVINGS: f64 = 0.40;

pub const PROVIDER_RESERVED_THRESHOLD: f64 = 1000.0;
pub const PROVIDER_RESERVED_SAVINGS: f64 = 0.40;
pub const PROVIDER_RIGHTSIZING_THRESHOLD: f64 = 500.0;
pub const PROVIDER_RIGHTSIZING_SAVINGS: f64 = 0.20;

/// Resource id used by provider-wide recommendations.
pub const ALL_RESOURCES: &str = "all";

fn optimization(
    resource_id: &str,
    provider: &str,
    category: OptimizationCategory,
    priority: Priority,
    current_cost: f64,
    savings_fraction: f64,
    text: (&str, &str, &str, &str),
) -> CostOptimization {
    let (title, description, recommendation, implementation) = text;
    let id = if resource_id == ALL_RESOURCES {
        format!("{}:{}:{}", ALL_RESOURCES, provider, category)
    } else {
        format!("{}:{}", resource_id, category)
    };

    CostOptimization {
        id,
        resource_id: resource_id.to_string(),
        provider: provider.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        current_cost,
        potential_savings: current_cost * savings_fraction,
        savings_percent: savings_fraction * 100.0,
        priority,
        category,
        recommendation: recommendation.to_string(),
        implementation: implementation.to_string(),
    }
}

/// Utilisation data is not part of the inventory, so nothing is ever
/// reported as unused yet.
fn is_unused(_estimate: &CostEstimate) -> bool {
    false
}

fn is_ec2(estimate: &CostEstimate) -> bool {
    estimate.service.eq_ignore_ascii_case("ec2")
}

/// Recommendations derived from a single estimate.
pub fn resource_optimizations(estimate: &CostEstimate) -> Vec<CostOptimization> {
    let mut optimizations = Vec::new();
    let monthly = estimate.monthly_cost;

    if is_unused(estimate) {
        optimizations.push(optimization(
            &estimate.resource_id,
            &estimate.provider,
            OptimizationCategory::Unused,
            Priority::High,
            monthly,
            1.0,
            (
                "Remove unused resource",
                "Resource shows no activity",
                "Delete the resource or snapshot and remove it",
                "Confirm with the owner, take a backup, then delete",
            ),
        ));
    }

    if monthly > RIGHTSIZING_THRESHOLD && is_ec2(estimate) {
        optimizations.push(optimization(
            &estimate.resource_id,
            &estimate.provider,
            OptimizationCategory::Rightsizing,
            Priority::Medium,
            monthly,
            RIGHTSIZING_SAVINGS,
            (
                "Right-size EC2 instance",
                "Instance cost suggests it may be larger than its workload needs",
                "Review CPU and memory utilisation and move to a smaller instance type",
                "Check CloudWatch metrics or Compute Optimizer, then change the instance type during a maintenance window",
            ),
        ));
    }

    if monthly > RESERVED_THRESHOLD && is_ec2(estimate) {
        optimizations.push(optimization(
            &estimate.resource_id,
            &estimate.provider,
            OptimizationCategory::Reserved,
            Priority::Medium,
            monthly,
            RESERVED_SAVINGS,
            (
                "Purchase a reserved instance",
                "Steady on-demand usage is cheaper under a one or three year commitment",
                "Buy a reserved instance or savings plan matching this instance family",
                "Use the Cost Explorer reservation recommendations for the instance family and region",
            ),
        ));
    }

    optimizations
}

/// Recommendations over a provider's total monthly spend.
pub fn provider_optimizations(cost_by_provider: &BTreeMap<String, f64>) -> Vec<CostOptimization> {
    let mut optimizations = Vec::new();

    for (provider, total) in cost_by_provider {
        if *total > PROVIDER_RESERVED_THRESHOLD {
            optimizations.push(optimization(
                ALL_RESOURCES,
                provider,
                OptimizationCategory::Reserved,
                Priority::High,
                *total,
                PROVIDER_RESERVED_SAVINGS,
                (
                    "Adopt reserved instances",
                    "Monthly spend is high enough for commitment discounts to pay off",
                    "Cover baseline usage with reserved capacity or savings plans",
                    "Identify always-on workloads and commit to their baseline for one year",
                ),
            ));
        }
        if *total > PROVIDER_RIGHTSIZING_THRESHOLD {
            optimizations.push(optimization(
                ALL_RESOURCES,
                provider,
                OptimizationCategory::Rightsizing,
                Priority::Medium,
                *total,
                PROVIDER_RIGHTSIZING_SAVINGS,
                (
                    "Right-size across the account",
                    "Monthly spend is high enough that a sizing review is worthwhile",
                    "Review utilisation across compute and database resources",
                    "Run the provider's rightsizing report and schedule changes by team",
                ),
            ));
        }
    }

    optimizations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::types::{EstimateMetadata, PricingModel};
    use crate::inventory::{Provider, Resource};

    fn ec2(monthly: f64) -> CostEstimate {
        let resource = Resource::new("i-1", Provider::Aws, "ec2", "instance");
        CostEstimate::from_monthly(&resource, monthly, PricingModel::Billing, 0.8, EstimateMetadata::default())
    }

    #[test]
    fn test_reserved_rule_on_150_dollar_instance() {
        let optimizations = resource_optimizations(&ec2(150.0));
        let reserved = optimizations
            .iter()
            .find(|o| o.category == OptimizationCategory::Reserved)
            .unwrap();

        assert!((reserved.potential_savings - 60.0).abs() < 1e-9);
        assert_eq!(reserved.priority, Priority::Medium);
        assert_eq!(reserved.id, "i-1:reserved");
        assert!(optimizations.iter().any(|o| o.category == OptimizationCategory::Rightsizing));
    }

    #[test]
    fn test_thresholds_are_strict() {
        assert!(resource_optimizations(&ec2(50.0)).is_empty());
        assert_eq!(resource_optimizations(&ec2(100.0)).len(), 1);
    }

    #[test]
    fn test_non_ec2_gets_no_resource_rules() {
        let resource = Resource::new("db", Provider::Aws, "rds", "db_instance");
        let estimate = CostEstimate::from_monthly(&resource, 500.0, PricingModel::Billing, 0.8, EstimateMetadata::default());
        assert!(resource_optimizations(&estimate).is_empty());
    }

    #[test]
    fn test_provider_wide_rules() {
        let mut totals = BTreeMap::new();
        totals.insert("aws".to_string(), 1200.0);
        totals.insert("azure".to_string(), 600.0);
        totals.insert("gcp".to_string(), 100.0);

        let optimizations = provider_optimizations(&totals);
        assert_eq!(optimizations.len(), 3);
        assert!(optimizations.iter().all(|o| o.resource_id == ALL_RESOURCES));

        let aws_reserved = &optimizations[0];
        assert_eq!(aws_reserved.provider, "aws");
        assert_eq!(aws_reserved.priority, Priority::High);
        assert!((aws_reserved.potential_savings - 480.0).abs() < 1e-9);

        let azure = &optimizations[2];
        assert_eq!(azure.category, OptimizationCategory::Rightsizing);
        assert!((azure.potential_savings - 120.0).abs() < 1e-9);
    }
}
