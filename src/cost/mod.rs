pub mod analyzer;
pub mod estimator;
pub mod optimizer;
pub mod pricing;
pub mod types;

pub use analyzer::CostAnalyzer;
pub use types::{
    CostEstimate, CostOptimization, CostReport, CostSummary, EstimateMetadata, OptimizationCategory, PricingModel,
    Priority,
};
