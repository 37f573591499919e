use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use crate::inventory::Resource;

pub const CURRENCY: &str = "USD";
pub const DAYS_PER_MONTH: f64 = 30.0;
pub const HOURS_PER_MONTH: f64 = 30.0 * 24.0;

/// Where a monthly figure came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PricingModel {
    /// Upstream billing data attached to the resource.
    Billing,
    /// Price table row matched on an instance/class identifier.
    OnDemand,
    /// Per-service flat rate.
    Flat,
    /// Network primitives that carry no charge of their own.
    Included,
    /// Unrecognised service under a known provider.
    Fallback,
}

impl PricingModel {
    pub fn as_str(self) -> &'static str {
        match self {
            PricingModel::Billing => "billing",
            PricingModel::OnDemand => "on_demand",
            PricingModel::Flat => "flat",
            PricingModel::Included => "included",
            PricingModel::Fallback => "fallback",
        }
    }
}

impl fmt::Display for PricingModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EstimateMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Identifier used for the table lookup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    /// The identifier was not in the table and the `default` row was used.
    #[serde(default)]
    pub default_row: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    pub resource_id: String,
    pub resource_address: String,
    pub provider: String,
    pub service: String,
    pub resource_type: String,
    pub monthly_cost: f64,
    pub daily_cost: f64,
    pub hourly_cost: f64,
    pub currency: String,
    pub pricing_model: PricingModel,
    pub confidence: f64,
    pub metadata: EstimateMetadata,
}

impl CostEstimate {
    pub fn from_monthly(
        resource: &Resource,
        monthly_cost: f64,
        pricing_model: PricingModel,
        confidence: f64,
        mut metadata: EstimateMetadata,
    ) -> Self {
        if metadata.region.is_none() && !resource.region.is_empty() {
            metadata.region = Some(resource.region.clone());
        }
        CostEstimate {
            resource_id: resource.id.clone(),
            resource_address: resource.address.clone(),
            provider: resource.provider.to_string(),
            service: resource.service.clone(),
            resource_type: resource.resource_type.clone(),
            monthly_cost,
            daily_cost: monthly_cost / DAYS_PER_MONTH,
            hourly_cost: monthly_cost / HOURS_PER_MONTH,
            currency: CURRENCY.to_string(),
            pricing_model,
            confidence: confidence.clamp(0.0, 1.0),
            metadata,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizationCategory {
    Rightsizing,
    Reserved,
    Spot,
    Unused,
}

impl OptimizationCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            OptimizationCategory::Rightsizing => "rightsizing",
            OptimizationCategory::Reserved => "reserved",
            OptimizationCategory::Spot => "spot",
            OptimizationCategory::Unused => "unused",
        }
    }
}

impl fmt::Display for OptimizationCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostOptimization {
    pub id: String,
    pub resource_id: String, // "all" for provider-wide recommendations
    pub provider: String,
    pub title: String,
    pub description: String,
    pub current_cost: f64,
    pub potential_savings: f64,
    pub savings_percent: f64,
    pub priority: Priority,
    pub category: OptimizationCategory,
    pub recommendation: String,
    pub implementation: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CostSummary {
    pub total_monthly_cost: f64,
    pub average_monthly_cost: f64,
    pub highest_cost_resource: Option<String>,
    pub lowest_cost_resource: Option<String>,
    pub cost_by_provider: BTreeMap<String, f64>,
    /// Keyed by `provider/service`.
    pub cost_by_service: BTreeMap<String, f64>,
    pub resource_count_by_provider: BTreeMap<String, usize>,
    pub resource_count: usize,
}

impl CostSummary {
    /// Summarise estimates already sorted by resource id. Ties on highest and
    /// lowest cost keep the first (smallest) id.
    pub fn from_estimates(estimates: &[CostEstimate]) -> Self {
        let mut summary = CostSummary {
            resource_count: estimates.len(),
            ..Default::default()
        };

        let mut highest: Option<&CostEstimate> = None;
        let mut lowest: Option<&CostEstimate> = None;

        for estimate in estimates {
            summary.total_monthly_cost += estimate.monthly_cost;
            *summary
                .cost_by_provider
                .entry(estimate.provider.clone())
                .or_insert(0.0) += estimate.monthly_cost;
            *summary
                .cost_by_service
                .entry(format!("{}/{}", estimate.provider, estimate.service))
                .or_insert(0.0) += estimate.monthly_cost;
            *summary
                .resource_count_by_provider
                .entry(estimate.provider.clone())
                .or_insert(0) += 1;

            if highest.map_or(true, |h| estimate.monthly_cost > h.monthly_cost) {
                highest = Some(estimate);
            }
            if lowest.map_or(true, |l| estimate.monthly_cost < l.monthly_cost) {
                lowest = Some(estimate);
            }
        }

        if !estimates.is_empty() {
            summary.average_monthly_cost = summary.total_monthly_cost / estimates.len() as f64;
        }
        summary.highest_cost_resource = highest.map(|e| e.resource_id.clone());
        summary.lowest_cost_resource = lowest.map(|e| e.resource_id.clone());
        summary
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostReport {
    pub total_monthly_cost: f64,
    pub total_daily_cost: f64,
    pub total_hourly_cost: f64,
    pub currency: String,
    pub estimates: Vec<CostEstimate>,
    pub optimizations: Vec<CostOptimization>,
    pub summary: CostSummary,
    pub potential_savings: f64,
    /// Resources with no estimator for their provider.
    pub excluded_resources: Vec<String>,
}

impl Default for CostReport {
    fn default() -> Self {
        CostReport {
            total_monthly_cost: 0.0,
            total_daily_cost: 0.0,
            total_hourly_cost: 0.0,
            currency: CURRENCY.to_string(),
            estimates: Vec::new(),
            optimizations: Vec::new(),
            summary: CostSummary::default(),
            potential_savings: 0.0,
            excluded_resources: Vec::new(),
        }
    }
}
