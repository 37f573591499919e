use crate::inventory::{normalize_key, ConfigField, Provider};

// Monthly on-demand USD, Linux, us-east-1 / eastus / us-central1 list prices.

pub const TABLE_MATCH_CONFIDENCE: f64 = 0.7;
pub const TABLE_DEFAULT_CONFIDENCE: f64 = 0.5;
pub const FLAT_CONFIDENCE: f64 = 0.6;
pub const INCLUDED_CONFIDENCE: f64 = 0.9;
pub const FALLBACK_MONTHLY: f64 = 10.0;
pub const FALLBACK_CONFIDENCE: f64 = 0.3;
pub const BILLING_CONFIDENCE: f64 = 0.8;

#[derive(Debug)]
pub enum Pricing {
    /// Looked up by the identifier found under `field`.
    Table {
        field: ConfigField,
        rows: &'static [(&'static str, f64)],
        default: f64,
    },
    Flat(f64),
}

#[derive(Debug)]
pub struct ServicePricing {
    pub service: &'static str,
    pub pricing: Pricing,
}

/// Price list of one provider.
#[derive(Debug)]
pub struct ProviderPricing {
    pub provider: Provider,
    pub services: &'static [ServicePricing],
}

impl ProviderPricing {
    pub fn service(&self, service: &str) -> Option<&ServicePricing> {
        let service = normalize_key(service);
        self.services.iter().find(|s| s.service == service)
    }
}

const EC2_INSTANCES: &[(&str, f64)] = &[
    ("t3.nano", 3.80),
    ("t3.micro", 7.59),
    ("t3.small", 15.18),
    ("t3.medium", 30.37),
    ("t3.large", 60.74),
    ("t3.xlarge", 121.47),
    ("m5.large", 70.08),
    ("m5.xlarge", 140.16),
    ("m5.2xlarge", 280.32),
    ("c5.large", 62.05),
    ("c5.xlarge", 124.10),
    ("r5.large", 91.98),
    ("r5.xlarge", 183.96),
];

const RDS_INSTANCES: &[(&str, f64)] = &[
    ("db.t3.micro", 12.41),
    ("db.t3.small", 24.82),
    ("db.t3.medium", 49.64),
    ("db.m5.large", 124.10),
    ("db.m5.xlarge", 248.20),
    ("db.r5.large", 175.20),
];

const ELASTICACHE_NODES: &[(&str, f64)] = &[
    ("cache.t3.micro", 12.41),
    ("cache.t3.medium", 49.64),
    ("cache.m5.large", 112.42),
    ("cache.r5.large", 156.95),
];

const AZURE_VM_SIZES: &[(&str, f64)] = &[
    ("standard_b1s", 7.59),
    ("standard_b2s", 30.37),
    ("standard_d2s_v3", 70.08),
    ("standard_d4s_v3", 140.16),
    ("standard_e2s_v3", 92.71),
    ("standard_f2s_v2", 61.76),
];

const AZURE_SQL_SKUS: &[(&str, f64)] = &[
    ("basic", 4.90),
    ("s0", 14.72),
    ("s1", 29.43),
    ("s2", 73.61),
    ("gp_gen5_2", 371.09),
];

const GCE_MACHINE_TYPES: &[(&str, f64)] = &[
    ("e2-micro", 6.11),
    ("e2-small", 12.23),
    ("e2-medium", 24.46),
    ("n1-standard-1", 24.27),
    ("n2-standard-2", 70.90),
    ("n2-standard-4", 141.79),
];

const CLOUD_SQL_TIERS: &[(&str, f64)] = &[
    ("db-f1-micro", 7.67),
    ("db-g1-small", 25.55),
    ("db-n1-standard-1", 46.20),
    ("db-n1-standard-2", 92.40),
];

static AWS_PRICING: ProviderPricing = ProviderPricing {
    provider: Provider::Aws,
    services: &[
        ServicePricing {
            service: "ec2",
            pricing: Pricing::Table { field: ConfigField::InstanceType, rows: EC2_INSTANCES, default: 30.37 },
        },
        ServicePricing {
            service: "rds",
            pricing: Pricing::Table { field: ConfigField::InstanceType, rows: RDS_INSTANCES, default: 49.64 },
        },
        ServicePricing {
            service: "elasticache",
            pricing: Pricing::Table { field: ConfigField::InstanceType, rows: ELASTICACHE_NODES, default: 49.64 },
        },
        ServicePricing { service: "s3", pricing: Pricing::Flat(5.0) },
        ServicePricing { service: "lambda", pricing: Pricing::Flat(2.0) },
        ServicePricing { service: "dynamodb", pricing: Pricing::Flat(25.0) },
        ServicePricing { service: "elb", pricing: Pricing::Flat(16.43) },
        ServicePricing { service: "elbv2", pricing: Pricing::Flat(16.43) },
        ServicePricing { service: "iam", pricing: Pricing::Flat(0.0) },
    ],
};

static AZURE_PRICING: ProviderPricing = ProviderPricing {
    provider: Provider::Azure,
    services: &[
        ServicePricing {
            service: "compute",
            pricing: Pricing::Table { field: ConfigField::InstanceType, rows: AZURE_VM_SIZES, default: 70.08 },
        },
        ServicePricing {
            service: "sql",
            pricing: Pricing::Table { field: ConfigField::InstanceType, rows: AZURE_SQL_SKUS, default: 14.72 },
        },
        ServicePricing { service: "storage", pricing: Pricing::Flat(20.80) },
        ServicePricing { service: "keyvault", pricing: Pricing::Flat(1.00) },
    ],
};

static GCP_PRICING: ProviderPricing = ProviderPricing {
    provider: Provider::Gcp,
    services: &[
        ServicePricing {
            service: "compute",
            pricing: Pricing::Table { field: ConfigField::InstanceType, rows: GCE_MACHINE_TYPES, default: 24.46 },
        },
        ServicePricing {
            service: "sql",
            pricing: Pricing::Table { field: ConfigField::InstanceType, rows: CLOUD_SQL_TIERS, default: 46.20 },
        },
        ServicePricing { service: "storage", pricing: Pricing::Flat(20.00) },
    ],
};

/// Price list for a provider; `None` for providers without an estimator.
pub fn pricing_for(provider: &Provider) -> Option<&'static ProviderPricing> {
    match provider {
        Provider::Aws => Some(&AWS_PRICING),
        Provider::Azure => Some(&AZURE_PRICING),
        Provider::Gcp => Some(&GCP_PRICING),
        Provider::Other(_) => None,
    }
}

// Normalized resource-type fragments that are not billed on their own.
// Normalized resource types with no charge of their own. Matched exactly, so
// billed appliances such as `azure_firewall` or `vpc_endpoint` are priced.
const INCLUDED_TYPES: &[&str] = &[
    "securitygroup",
    "networksecuritygroup",
    "vpc",
    "virtualnetwork",
    "network",
    "subnet",
    "subnetwork",
    "routetable",
    "route",
    "internetgateway",
    "networkinterface",
    "parametergroup",
    "dbparametergroup",
    "dbsubnetgroup",
    "firewallrule",
];

// GCP VPC firewall rules are free; other providers' firewalls are appliances.
const GCP_INCLUDED_TYPES: &[&str] = &["firewall"];

// Terraform-style prefixes dropped before matching.
const TYPE_PREFIXES: &[&str] = &["aws_", "azurerm_", "google_compute_", "google_"];

pub fn is_included_type(provider: &Provider, resource_type: &str) -> bool {
    let lowered = resource_type.trim().to_ascii_lowercase();
    let bare = TYPE_PREFIXES
        .iter()
        .find_map(|prefix| lowered.strip_prefix(prefix))
        .unwrap_or(lowered.as_str());
    let resource_type = normalize_key(bare);

    INCLUDED_TYPES.contains(&resource_type.as_str())
        || (*provider == Provider::Gcp && GCP_INCLUDED_TYPES.contains(&resource_type.as_str()))
}

/// Exact, case-insensitive row lookup. Full resource paths such as
/// `zones/us-central1-a/machineTypes/e2-medium` match on the last segment.
pub fn lookup_row(rows: &[(&str, f64)], identifier: &str) -> Option<f64> {
    let identifier = identifier.trim();
    let key = identifier.rsplit('/').next().unwrap_or(identifier);
    rows.iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .map(|(_, price)| *price)
}
