use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Full inventory shared by every analyzer within one run.
pub type Snapshot = Arc<Vec<Resource>>;

pub const ENVIRONMENT_TAG: &str = "Environment";
pub const PROJECT_TAG: &str = "Project";

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
    Other(String),
}

impl Provider {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "aws" | "amazon" => Provider::Aws,
            "azure" | "microsoft" => Provider::Azure,
            "gcp" | "google" => Provider::Gcp,
            _ => Provider::Other(s.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
            Provider::Other(name) => name.as_str(),
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Provider::Other(_))
    }
}

impl From<String> for Provider {
    fn from(s: String) -> Self {
        Provider::parse(&s)
    }
}

impl From<Provider> for String {
    fn from(p: Provider) -> Self {
        p.as_str().to_string()
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One discovered cloud object. Produced by discovery, read-only here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub id: String,
    pub address: String, // ARN or provider-native resource path
    pub provider: Provider,
    pub service: String,
    pub resource_type: String,
    pub name: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    #[serde(default)]
    pub configuration: String,
    #[serde(default)]
    pub public_access: bool,
    #[serde(default)]
    pub encrypted: bool,
    #[serde(default)]
    pub compliance: Vec<String>,
    #[serde(default)]
    pub monthly_cost: Option<f64>,
    #[serde(default = "Utc::now")]
    pub discovered_at: DateTime<Utc>,
}

impl Resource {
    pub fn new(id: &str, provider: Provider, service: &str, resource_type: &str) -> Self {
        Resource {
            id: id.to_string(),
            address: format!("{}:{}:{}/{}", provider, service, resource_type, id),
            provider,
            service: service.to_string(),
            resource_type: resource_type.to_string(),
            name: id.to_string(),
            region: String::new(),
            tags: HashMap::new(),
            configuration: String::new(),
            public_access: false,
            encrypted: false,
            compliance: Vec::new(),
            monthly_cost: None,
            discovered_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = name.to_string();
        self
    }

    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn with_region(mut self, region: &str) -> Self {
        self.region = region.to_string();
        self
    }

    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.insert(key.to_string(), value.to_string());
        self
    }

    pub fn with_configuration(mut self, configuration: &str) -> Self {
        self.configuration = configuration.to_string();
        self
    }

    pub fn with_public_access(mut self, public_access: bool) -> Self {
        self.public_access = public_access;
        self
    }

    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = encrypted;
        self
    }

    pub fn with_compliance(mut self, flag: &str) -> Self {
        self.compliance.push(flag.to_string());
        self
    }

    pub fn with_monthly_cost(mut self, monthly_cost: f64) -> Self {
        self.monthly_cost = Some(monthly_cost);
        self
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(|v| v.as_str())
    }

    /// Upstream billing figure, if one was attached during discovery.
    pub fn known_monthly_cost(&self) -> Option<f64> {
        self.monthly_cost.filter(|c| c.is_finite() && *c > 0.0)
    }

    pub fn has_compliance_scope(&self, framework: &str) -> bool {
        let framework = framework.to_lowercase();
        self.compliance
            .iter()
            .any(|flag| flag.to_lowercase().starts_with(&framework))
    }

    pub fn group_key(&self) -> GroupKey {
        GroupKey {
            provider: self.provider.clone(),
            service: self.service.clone(),
            environment: self.tag(ENVIRONMENT_TAG).map(|s| s.to_string()),
            project: self.tag(PROJECT_TAG).map(|s| s.to_string()),
        }
    }
}

/// Composite key shared by dependency grouping and the encryption
/// consistency pass.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GroupKey {
    pub provider: Provider,
    pub service: String,
    pub environment: Option<String>,
    pub project: Option<String>,
}

impl fmt::Display for GroupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.provider,
            self.service,
            self.environment.as_deref().unwrap_or("-"),
            self.project.as_deref().unwrap_or("-")
        )
    }
}

/// Predicate handed to the storage collaborator. The engine always asks for
/// everything; the narrower fields exist for embedders.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResourceFilter {
    pub provider: Option<Provider>,
    pub service: Option<String>,
    pub region: Option<String>,
}

impl ResourceFilter {
    pub fn all() -> Self {
        ResourceFilter::default()
    }

    pub fn matches(&self, resource: &Resource) -> bool {
        self.provider.as_ref().map_or(true, |p| *p == resource.provider)
            && self.service.as_ref().map_or(true, |s| *s == resource.service)
            && self.region.as_ref().map_or(true, |r| *r == resource.region)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_parse_round_trip() {
        assert_eq!(Provider::parse("AWS"), Provider::Aws);
        assert_eq!(Provider::parse(" gcp "), Provider::Gcp);
        assert_eq!(Provider::parse("oracle"), Provider::Other("oracle".to_string()));
        assert!(!Provider::parse("oracle").is_known());

        let json = serde_json::to_string(&Provider::Azure).unwrap();
        assert_eq!(json, "\"azure\"");
        let back: Provider = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Provider::Azure);
    }

    #[test]
    fn test_known_monthly_cost_ignores_zero() {
        let r = Resource::new("i-1", Provider::Aws, "ec2", "instance");
        assert_eq!(r.known_monthly_cost(), None);
        assert_eq!(r.clone().with_monthly_cost(0.0).known_monthly_cost(), None);
        assert_eq!(r.with_monthly_cost(12.5).known_monthly_cost(), Some(12.5));
    }

    #[test]
    fn test_group_key_uses_environment_and_project_tags() {
        let a = Resource::new("a", Provider::Aws, "s3", "bucket")
            .with_tag("Environment", "prod")
            .with_tag("Project", "billing");
        let b = Resource::new("b", Provider::Aws, "s3", "bucket")
            .with_tag("Environment", "prod")
            .with_tag("Project", "billing");
        let c = Resource::new("c", Provider::Aws, "s3", "bucket").with_tag("Environment", "dev");

        assert_eq!(a.group_key(), b.group_key());
        assert_ne!(a.group_key(), c.group_key());
        assert_eq!(a.group_key().to_string(), "aws/s3/prod/billing");
    }

    #[test]
    fn test_filter_matches() {
        let r = Resource::new("a", Provider::Gcp, "compute", "instance").with_region("us-east1");
        assert!(ResourceFilter::all().matches(&r));

        let filter = ResourceFilter {
            provider: Some(Provider::Aws),
            ..Default::default()
        };
        assert!(!filter.matches(&r));
    }
}
