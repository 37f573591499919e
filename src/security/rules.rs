use chrono::Utc;
use crate::inventory::{normalize_key, ConfigField, Resource, ResourceConfig};
use crate::security::templates;
use crate::security::types::{FindingCategory, FindingMetadata, SecurityFinding, Severity};

const OPEN_CIDRS: &[&str] = &["0.0.0.0/0", "::/0"];

/// What a rule predicate sees.
pub struct RuleInput<'a> {
    pub resource: &'a Resource,
    pub config: &'a ResourceConfig,
}

pub enum Check {
    Pass,
    Fail,
    /// Failed, with the configuration value that caused it.
    FailWith(String),
}

impl Check {
    pub fn when(violated: bool) -> Self {
        if violated {
            Check::Fail
        } else {
            Check::Pass
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub enum RuleScope {
    /// A specific provider/service. An empty `types` list covers every
    /// resource type of the service.
    Service {
        provider: &'static str,
        service: &'static str,
        types: &'static [&'static str],
    },
    /// Every resource.
    Any,
    /// Resources of services with no `Service` rule in the catalog.
    Uncatalogued,
}

pub struct SecurityRule {
    pub id: &'static str,
    pub scope: RuleScope,
    pub severity: Severity,
    pub category: FindingCategory,
    pub title: &'static str,
    pub description: &'static str,
    pub recommendation: &'static str,
    pub compliance: &'static [&'static str],
    pub check: fn(&RuleInput<'_>) -> Check,
}

fn same_service(resource: &Resource, provider: &str, service: &str) -> bool {
    resource.provider.as_str() == provider && normalize_key(&resource.service) == service
}

impl SecurityRule {
    fn applies_to(&self, resource: &Resource) -> bool {
        match self.scope {
            RuleScope::Service { provider, service, types } => {
                if !same_service(resource, provider, service) {
                    return false;
                }
                let resource_type = normalize_key(&resource.resource_type);
                types.is_empty() || types.iter().any(|t| resource_type.contains(t))
            }
            RuleScope::Any => true,
            RuleScope::Uncatalogued => !is_catalogued(resource),
        }
    }

    pub fn finding_for(&self, resource: &Resource, evidence: Option<String>) -> SecurityFinding {
        SecurityFinding {
            id: format!("{}:{}", resource.id, self.id),
            rule_id: self.id.to_string(),
            resource_id: resource.id.clone(),
            resource_address: resource.address.clone(),
            provider: resource.provider.to_string(),
            service: resource.service.clone(),
            resource_type: resource.resource_type.clone(),
            severity: self.severity,
            category: self.category,
            title: self.title.to_string(),
            description: self.description.to_string(),
            recommendation: self.recommendation.to_string(),
            compliance: self.compliance.iter().map(|t| t.to_string()).collect(),
            metadata: FindingMetadata {
                region: (!resource.region.is_empty()).then(|| resource.region.clone()),
                evidence,
                group: None,
            },
            created_at: Utc::now(),
        }
    }
}

/// True when the catalog has service-specific rules for this resource's
/// provider and service.
pub fn is_catalogued(resource: &Resource) -> bool {
    CATALOG.iter().any(|rule| match rule.scope {
        RuleScope::Service { provider, service, .. } => same_service(resource, provider, service),
        _ => false,
    })
}

/// Evaluate every applicable catalog rule against one resource.
pub fn evaluate(resource: &Resource) -> Vec<SecurityFinding> {
    let config = ResourceConfig::parse(&resource.configuration);
    let input = RuleInput {
        resource,
        config: &config,
    };

    CATALOG
        .iter()
        .filter(|rule| rule.applies_to(resource))
        .filter_map(|rule| match (rule.check)(&input) {
            Check::Pass => None,
            Check::Fail => Some(rule.finding_for(resource, None)),
            Check::FailWith(evidence) => Some(rule.finding_for(resource, Some(evidence))),
        })
        .collect()
}

fn is_public(input: &RuleInput<'_>) -> Check {
    Check::when(input.resource.public_access)
}

fn not_encrypted(input: &RuleInput<'_>) -> Check {
    Check::when(!input.resource.encrypted)
}

fn versioning_disabled(input: &RuleInput<'_>) -> Check {
    let provider = &input.resource.provider;
    Check::when(input.config.flag(provider, ConfigField::Versioning) != Some(true))
}

fn ebs_not_declared_encrypted(input: &RuleInput<'_>) -> Check {
    let provider = &input.resource.provider;
    Check::when(input.config.all_encrypted(provider, ConfigField::BlockDevices) != Some(true))
}

fn imdsv2_not_required(input: &RuleInput<'_>) -> Check {
    let tokens = input.config.text(&input.resource.provider, ConfigField::MetadataTokens);
    match tokens {
        Some(t) if t.trim().eq_ignore_ascii_case("required") => Check::Pass,
        Some(t) => Check::FailWith(format!("HttpTokens={}", t)),
        None => Check::Fail,
    }
}

fn open_ingress(input: &RuleInput<'_>) -> Check {
    let sources = input.config.ingress_sources(&input.resource.configuration);
    let open = if input.config.is_structured() {
        sources
            .into_iter()
            .map(str::trim)
            .find(|cidr| OPEN_CIDRS.contains(cidr))
            .map(str::to_string)
    } else {
        OPEN_CIDRS
            .iter()
            .find(|cidr| sources.iter().any(|segment| segment.contains(*cidr)))
            .map(|cidr| cidr.to_string())
    };

    match open {
        Some(cidr) => Check::FailWith(cidr),
        None => Check::Pass,
    }
}

fn backups_disabled(input: &RuleInput<'_>) -> Check {
    let retention = input.config.number(&input.resource.provider, ConfigField::BackupRetention);
    Check::when(retention == Some(0.0))
}

fn no_vpc_config(input: &RuleInput<'_>) -> Check {
    Check::when(!input.config.has(&input.resource.provider, ConfigField::VpcConfig))
}

fn wildcard(input: &RuleInput<'_>, field: ConfigField) -> Check {
    let values = input.config.strings(&input.resource.provider, field);
    Check::when(values.iter().any(|v| v.trim() == "*"))
}

fn wildcard_action(input: &RuleInput<'_>) -> Check {
    wildcard(input, ConfigField::PolicyActions)
}

fn wildcard_resource(input: &RuleInput<'_>) -> Check {
    wildcard(input, ConfigField::PolicyResources)
}

fn soft_delete_disabled(input: &RuleInput<'_>) -> Check {
    let provider = &input.resource.provider;
    Check::when(input.config.flag(provider, ConfigField::SoftDelete) == Some(false))
}

fn pci_scope_unencrypted(input: &RuleInput<'_>) -> Check {
    Check::when(input.resource.has_compliance_scope("PCI-DSS") && !input.resource.encrypted)
}

const fn service(provider: &'static str, service: &'static str) -> RuleScope {
    RuleScope::Service {
        provider,
        service,
        types: &[],
    }
}

const fn typed(provider: &'static str, service: &'static str, types: &'static [&'static str]) -> RuleScope {
    RuleScope::Service {
        provider,
        service,
        types,
    }
}

pub static CATALOG: &[SecurityRule] = &[
    // aws/s3
    SecurityRule {
        id: "s3-public-access",
        scope: service("aws", "s3"),
        severity: Severity::Critical,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_S3_PUBLIC,
        description: templates::DESC_S3_PUBLIC,
        recommendation: templates::REC_S3_PUBLIC,
        compliance: &["CIS-2.1", "SOC2-CC6.1", "PCI-DSS-1.2"],
        check: is_public,
    },
    SecurityRule {
        id: "s3-unencrypted",
        scope: service("aws", "s3"),
        severity: Severity::High,
        category: FindingCategory::Encryption,
        title: templates::TITLE_S3_UNENCRYPTED,
        description: templates::DESC_S3_UNENCRYPTED,
        recommendation: templates::REC_S3_UNENCRYPTED,
        compliance: &["CIS-2.1.1", "PCI-DSS-3.4", "HIPAA-164.312"],
        check: not_encrypted,
    },
    SecurityRule {
        id: "s3-versioning-disabled",
        scope: service("aws", "s3"),
        severity: Severity::Low,
        category: FindingCategory::DataProtection,
        title: templates::TITLE_S3_VERSIONING,
        description: templates::DESC_S3_VERSIONING,
        recommendation: templates::REC_S3_VERSIONING,
        compliance: &["SOC2-A1.2"],
        check: versioning_disabled,
    },
    // aws/ec2
    SecurityRule {
        id: "ec2-public-instance",
        scope: typed("aws", "ec2", &["instance"]),
        severity: Severity::High,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_EC2_PUBLIC,
        description: templates::DESC_EC2_PUBLIC,
        recommendation: templates::REC_EC2_PUBLIC,
        compliance: &["CIS-5.1", "SOC2-CC6.6"],
        check: is_public,
    },
    SecurityRule {
        id: "ec2-ebs-unencrypted",
        scope: typed("aws", "ec2", &["instance"]),
        severity: Severity::Medium,
        category: FindingCategory::Encryption,
        title: templates::TITLE_EC2_EBS_UNENCRYPTED,
        description: templates::DESC_EC2_EBS_UNENCRYPTED,
        recommendation: templates::REC_EC2_EBS_UNENCRYPTED,
        compliance: &["CIS-2.2.1", "PCI-DSS-3.4"],
        check: ebs_not_declared_encrypted,
    },
    SecurityRule {
        id: "ec2-imdsv2-not-required",
        scope: typed("aws", "ec2", &["instance"]),
        severity: Severity::Medium,
        category: FindingCategory::Configuration,
        title: templates::TITLE_EC2_IMDSV1,
        description: templates::DESC_EC2_IMDSV1,
        recommendation: templates::REC_EC2_IMDSV1,
        compliance: &["CIS-5.6"],
        check: imdsv2_not_required,
    },
    SecurityRule {
        id: "ec2-open-ingress",
        scope: service("aws", "ec2"),
        severity: Severity::High,
        category: FindingCategory::Network,
        title: templates::TITLE_SG_OPEN,
        description: templates::DESC_SG_OPEN,
        recommendation: templates::REC_SG_OPEN,
        compliance: &["CIS-5.2", "PCI-DSS-1.3"],
        check: open_ingress,
    },
    // aws/rds
    SecurityRule {
        id: "rds-public-access",
        scope: service("aws", "rds"),
        severity: Severity::Critical,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_RDS_PUBLIC,
        description: templates::DESC_RDS_PUBLIC,
        recommendation: templates::REC_RDS_PUBLIC,
        compliance: &["CIS-2.3.3", "PCI-DSS-1.3"],
        check: is_public,
    },
    SecurityRule {
        id: "rds-unencrypted",
        scope: service("aws", "rds"),
        severity: Severity::High,
        category: FindingCategory::Encryption,
        title: templates::TITLE_RDS_UNENCRYPTED,
        description: templates::DESC_RDS_UNENCRYPTED,
        recommendation: templates::REC_RDS_UNENCRYPTED,
        compliance: &["CIS-2.3.1", "PCI-DSS-3.4", "HIPAA-164.312"],
        check: not_encrypted,
    },
    SecurityRule {
        id: "rds-backups-disabled",
        scope: service("aws", "rds"),
        severity: Severity::Medium,
        category: FindingCategory::DataProtection,
        title: templates::TITLE_RDS_NO_BACKUP,
        description: templates::DESC_RDS_NO_BACKUP,
        recommendation: templates::REC_RDS_NO_BACKUP,
        compliance: &["SOC2-A1.2"],
        check: backups_disabled,
    },
    // aws/lambda
    SecurityRule {
        id: "lambda-no-vpc",
        scope: service("aws", "lambda"),
        severity: Severity::Medium,
        category: FindingCategory::Network,
        title: templates::TITLE_LAMBDA_NO_VPC,
        description: templates::DESC_LAMBDA_NO_VPC,
        recommendation: templates::REC_LAMBDA_NO_VPC,
        compliance: &["SOC2-CC6.6"],
        check: no_vpc_config,
    },
    // aws/iam
    SecurityRule {
        id: "iam-wildcard-action",
        scope: service("aws", "iam"),
        severity: Severity::Critical,
        category: FindingCategory::AccessControl,
        title: templates::TITLE_IAM_WILDCARD_ACTION,
        description: templates::DESC_IAM_WILDCARD_ACTION,
        recommendation: templates::REC_IAM_WILDCARD_ACTION,
        compliance: &["CIS-1.16", "SOC2-CC6.3"],
        check: wildcard_action,
    },
    SecurityRule {
        id: "iam-wildcard-resource",
        scope: service("aws", "iam"),
        severity: Severity::High,
        category: FindingCategory::AccessControl,
        title: templates::TITLE_IAM_WILDCARD_RESOURCE,
        description: templates::DESC_IAM_WILDCARD_RESOURCE,
        recommendation: templates::REC_IAM_WILDCARD_RESOURCE,
        compliance: &["SOC2-CC6.3"],
        check: wildcard_resource,
    },
    // azure
    SecurityRule {
        id: "azure-storage-public-access",
        scope: service("azure", "storage"),
        severity: Severity::Critical,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_AZURE_STORAGE_PUBLIC,
        description: templates::DESC_AZURE_STORAGE_PUBLIC,
        recommendation: templates::REC_AZURE_STORAGE_PUBLIC,
        compliance: &["CIS-Azure-3.5", "SOC2-CC6.1"],
        check: is_public,
    },
    SecurityRule {
        id: "azure-storage-unencrypted",
        scope: service("azure", "storage"),
        severity: Severity::High,
        category: FindingCategory::Encryption,
        title: templates::TITLE_AZURE_STORAGE_UNENCRYPTED,
        description: templates::DESC_AZURE_STORAGE_UNENCRYPTED,
        recommendation: templates::REC_AZURE_STORAGE_UNENCRYPTED,
        compliance: &["CIS-Azure-3.2", "PCI-DSS-3.4"],
        check: not_encrypted,
    },
    SecurityRule {
        id: "azure-vm-public-access",
        scope: service("azure", "compute"),
        severity: Severity::High,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_AZURE_VM_PUBLIC,
        description: templates::DESC_AZURE_VM_PUBLIC,
        recommendation: templates::REC_AZURE_VM_PUBLIC,
        compliance: &["CIS-Azure-7.1"],
        check: is_public,
    },
    SecurityRule {
        id: "azure-vm-unencrypted",
        scope: service("azure", "compute"),
        severity: Severity::Medium,
        category: FindingCategory::Encryption,
        title: templates::TITLE_AZURE_VM_UNENCRYPTED,
        description: templates::DESC_AZURE_VM_UNENCRYPTED,
        recommendation: templates::REC_AZURE_VM_UNENCRYPTED,
        compliance: &["CIS-Azure-7.2"],
        check: not_encrypted,
    },
    SecurityRule {
        id: "azure-sql-public-access",
        scope: service("azure", "sql"),
        severity: Severity::Critical,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_AZURE_SQL_PUBLIC,
        description: templates::DESC_AZURE_SQL_PUBLIC,
        recommendation: templates::REC_AZURE_SQL_PUBLIC,
        compliance: &["CIS-Azure-4.1.2", "PCI-DSS-1.3"],
        check: is_public,
    },
    SecurityRule {
        id: "azure-sql-unencrypted",
        scope: service("azure", "sql"),
        severity: Severity::High,
        category: FindingCategory::Encryption,
        title: templates::TITLE_AZURE_SQL_UNENCRYPTED,
        description: templates::DESC_AZURE_SQL_UNENCRYPTED,
        recommendation: templates::REC_AZURE_SQL_UNENCRYPTED,
        compliance: &["CIS-Azure-4.1.5", "PCI-DSS-3.4"],
        check: not_encrypted,
    },
    SecurityRule {
        id: "azure-keyvault-soft-delete-disabled",
        scope: service("azure", "keyvault"),
        severity: Severity::Medium,
        category: FindingCategory::DataProtection,
        title: templates::TITLE_KEYVAULT_SOFT_DELETE,
        description: templates::DESC_KEYVAULT_SOFT_DELETE,
        recommendation: templates::REC_KEYVAULT_SOFT_DELETE,
        compliance: &["CIS-Azure-8.5"],
        check: soft_delete_disabled,
    },
    // gcp
    SecurityRule {
        id: "gcp-storage-public-access",
        scope: service("gcp", "storage"),
        severity: Severity::Critical,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_GCS_PUBLIC,
        description: templates::DESC_GCS_PUBLIC,
        recommendation: templates::REC_GCS_PUBLIC,
        compliance: &["CIS-GCP-5.1", "SOC2-CC6.1"],
        check: is_public,
    },
    SecurityRule {
        id: "gcp-storage-unencrypted",
        scope: service("gcp", "storage"),
        severity: Severity::Medium,
        category: FindingCategory::Encryption,
        title: templates::TITLE_GCS_UNENCRYPTED,
        description: templates::DESC_GCS_UNENCRYPTED,
        recommendation: templates::REC_GCS_UNENCRYPTED,
        compliance: &["CIS-GCP-5.3"],
        check: not_encrypted,
    },
    SecurityRule {
        id: "gcp-compute-public-access",
        scope: service("gcp", "compute"),
        severity: Severity::High,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_GCE_PUBLIC,
        description: templates::DESC_GCE_PUBLIC,
        recommendation: templates::REC_GCE_PUBLIC,
        compliance: &["CIS-GCP-4.9"],
        check: is_public,
    },
    SecurityRule {
        id: "gcp-sql-public-access",
        scope: service("gcp", "sql"),
        severity: Severity::Critical,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_CLOUDSQL_PUBLIC,
        description: templates::DESC_CLOUDSQL_PUBLIC,
        recommendation: templates::REC_CLOUDSQL_PUBLIC,
        compliance: &["CIS-GCP-6.5", "PCI-DSS-1.3"],
        check: is_public,
    },
    SecurityRule {
        id: "gcp-sql-unencrypted",
        scope: service("gcp", "sql"),
        severity: Severity::High,
        category: FindingCategory::Encryption,
        title: templates::TITLE_CLOUDSQL_UNENCRYPTED,
        description: templates::DESC_CLOUDSQL_UNENCRYPTED,
        recommendation: templates::REC_CLOUDSQL_UNENCRYPTED,
        compliance: &["PCI-DSS-3.4"],
        check: not_encrypted,
    },
    // any provider
    SecurityRule {
        id: "pci-dss-unencrypted",
        scope: RuleScope::Any,
        severity: Severity::High,
        category: FindingCategory::Compliance,
        title: templates::TITLE_PCI_UNENCRYPTED,
        description: templates::DESC_PCI_UNENCRYPTED,
        recommendation: templates::REC_PCI_UNENCRYPTED,
        compliance: &["PCI-DSS-3.4"],
        check: pci_scope_unencrypted,
    },
    SecurityRule {
        id: "public-access",
        scope: RuleScope::Uncatalogued,
        severity: Severity::Medium,
        category: FindingCategory::PublicAccess,
        title: templates::TITLE_PUBLIC_GENERIC,
        description: templates::DESC_PUBLIC_GENERIC,
        recommendation: templates::REC_PUBLIC_GENERIC,
        compliance: &["SOC2-CC6.1"],
        check: is_public,
    },
];
