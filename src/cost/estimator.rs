use log::debug;
use crate::cost::pricing::{self, Pricing};
use crate::cost::types::{CostEstimate, EstimateMetadata, PricingModel};
use crate::error::{AnalysisError, AnalysisResult};
use crate::inventory::{Resource, ResourceConfig};

/// Monthly cost estimate for one resource.
///
/// Known billing data wins. Otherwise the provider's price list is used:
/// included network primitives cost nothing, tables match an identifier from
/// the configuration (falling back to the table's default row), and services
/// missing from the list get a low-confidence flat rate. Providers without a
/// price list are an error for this resource only.
pub fn estimate(resource: &Resource) -> AnalysisResult<CostEstimate> {
    if let Some(monthly) = resource.known_monthly_cost() {
        return Ok(CostEstimate::from_monthly(
            resource,
            monthly,
            PricingModel::Billing,
            pricing::BILLING_CONFIDENCE,
            EstimateMetadata::default(),
        ));
    }

    let price_list = pricing::pricing_for(&resource.provider).ok_or_else(|| AnalysisError::UnknownProviderCost {
        resource_id: resource.id.clone(),
        provider: resource.provider.to_string(),
    })?;

    if pricing::is_included_type(&resource.provider, &resource.resource_type) {
        return Ok(CostEstimate::from_monthly(
            resource,
            0.0,
            PricingModel::Included,
            pricing::INCLUDED_CONFIDENCE,
            EstimateMetadata::default(),
        ));
    }

    let Some(service) = price_list.service(&resource.service) else {
        debug!(
            "No price list entry for {}/{}, using fallback rate",
            resource.provider, resource.service
        );
        return Ok(CostEstimate::from_monthly(
            resource,
            pricing::FALLBACK_MONTHLY,
            PricingModel::Fallback,
            pricing::FALLBACK_CONFIDENCE,
            EstimateMetadata::default(),
        ));
    };

    let estimate = match &service.pricing {
        Pricing::Flat(monthly) => CostEstimate::from_monthly(
            resource,
            *monthly,
            PricingModel::Flat,
            pricing::FLAT_CONFIDENCE,
            EstimateMetadata::default(),
        ),
        Pricing::Table { field, rows, default } => {
            let config = ResourceConfig::parse(&resource.configuration);
            let identifier = config.text(&resource.provider, *field);
            let matched = identifier.as_deref().and_then(|id| pricing::lookup_row(rows, id));

            let metadata = EstimateMetadata {
                region: None,
                instance_type: identifier,
                default_row: matched.is_none(),
            };
            match matched {
                Some(monthly) => CostEstimate::from_monthly(
                    resource,
                    monthly,
                    PricingModel::OnDemand,
                    pricing::TABLE_MATCH_CONFIDENCE,
                    metadata,
                ),
                None => CostEstimate::from_monthly(
                    resource,
                    *default,
                    PricingModel::OnDemand,
                    pricing::TABLE_DEFAULT_CONFIDENCE,
                    metadata,
                ),
            }
        }
    };
    Ok(estimate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::Provider;

    #[test]
    fn test_known_cost_is_used_verbatim() {
        for cost in [0.01, 42.0, 150.0, 12_345.67] {
            let resource = Resource::new("r", Provider::Other("oracle".to_string()), "compute", "vm")
                .with_monthly_cost(cost);
            let estimate = estimate(&resource).unwrap();
            assert_eq!(estimate.monthly_cost, cost);
            assert_eq!(estimate.confidence, 0.8);
            assert_eq!(estimate.pricing_model, PricingModel::Billing);
            assert!((estimate.daily_cost - cost / 30.0).abs() < 1e-9);
            assert!((estimate.hourly_cost - cost / 720.0).abs() < 1e-9);
        }
    }

    #[test]
    fn test_table_lookup_and_default_row() {
        let micro = Resource::new("i-1", Provider::Aws, "ec2", "instance")
            .with_configuration(r#"{"InstanceType": "t3.micro"}"#);
        let estimate_micro = estimate(&micro).unwrap();
        assert_eq!(estimate_micro.monthly_cost, 7.59);
        assert_eq!(estimate_micro.metadata.instance_type.as_deref(), Some("t3.micro"));
        assert!(!estimate_micro.metadata.default_row);

        let unknown = Resource::new("i-2", Provider::Aws, "ec2", "instance")
            .with_configuration(r#"{"InstanceType": "x9.huge"}"#);
        let estimate_unknown = estimate(&unknown).unwrap();
        assert_eq!(estimate_unknown.monthly_cost, 30.37);
        assert!(estimate_unknown.metadata.default_row);
        assert_eq!(estimate_unknown.confidence, 0.5);
    }

    #[test]
    fn test_yaml_configuration_lookup() {
        let vm = Resource::new("vm-1", Provider::Gcp, "compute", "instance")
            .with_configuration("machineType: zones/us-central1-a/machineTypes/n2-standard-2\n");
        assert_eq!(estimate(&vm).unwrap().monthly_cost, 70.90);
    }

    #[test]
    fn test_flat_fallback_and_included() {
        let bucket = Resource::new("b", Provider::Aws, "s3", "bucket");
        assert_eq!(estimate(&bucket).unwrap().pricing_model, PricingModel::Flat);

        let topic = Resource::new("t", Provider::Gcp, "pubsub", "topic");
        let fallback = estimate(&topic).unwrap();
        assert_eq!(fallback.monthly_cost, 10.0);
        assert_eq!(fallback.confidence, 0.3);

        let sg = Resource::new("sg", Provider::Aws, "ec2", "security_group");
        assert_eq!(estimate(&sg).unwrap().monthly_cost, 0.0);
    }

    #[test]
    fn test_firewall_appliance_is_priced() {
        let firewall = Resource::new("fw", Provider::Azure, "network", "azure_firewall");
        let priced = estimate(&firewall).unwrap();
        assert_ne!(priced.pricing_model, PricingModel::Included);
        assert!(priced.monthly_cost > 0.0);

        let endpoint = Resource::new("vpce-1", Provider::Aws, "ec2", "vpc_endpoint");
        assert_ne!(estimate(&endpoint).unwrap().pricing_model, PricingModel::Included);
    }

    #[test]
    fn test_unknown_provider_is_an_error() {
        let resource = Resource::new("r", Provider::Other("oracle".to_string()), "compute", "vm");
        match estimate(&resource) {
            Err(AnalysisError::UnknownProviderCost { resource_id, provider }) => {
                assert_eq!(resource_id, "r");
                assert_eq!(provider, "oracle");
            }
            other => panic!("expected UnknownProviderCost, got {:?}", other),
        }
    }
}
