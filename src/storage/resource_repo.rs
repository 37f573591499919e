use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, params_from_iter};
use std::collections::HashMap;
use crate::inventory::{Provider, Resource, ResourceFilter};
use crate::storage::{Database, ResourceStore};

/// SQLite-backed inventory table.
#[derive(Clone)]
pub struct ResourceRepository {
    db: Database,
}

// Column values as stored, before JSON columns are decoded.
struct ResourceRow {
    id: String,
    address: String,
    provider: String,
    service: String,
    resource_type: String,
    name: String,
    region: String,
    tags: String,
    configuration: String,
    public_access: bool,
    encrypted: bool,
    compliance: String,
    monthly_cost: Option<f64>,
    discovered_at: String,
}

impl ResourceRow {
    fn into_resource(self) -> Result<Resource> {
        let tags: HashMap<String, String> = serde_json::from_str(&self.tags)
            .with_context(|| format!("invalid tags for resource {}", self.id))?;
        let compliance: Vec<String> = serde_json::from_str(&self.compliance)
            .with_context(|| format!("invalid compliance flags for resource {}", self.id))?;
        let discovered_at = DateTime::parse_from_rfc3339(&self.discovered_at)
            .with_context(|| format!("invalid discovered_at for resource {}", self.id))?
            .with_timezone(&Utc);

        Ok(Resource {
            id: self.id,
            address: self.address,
            provider: Provider::parse(&self.provider),
            service: self.service,
            resource_type: self.resource_type,
            name: self.name,
            region: self.region,
            tags,
            configuration: self.configuration,
            public_access: self.public_access,
            encrypted: self.encrypted,
            compliance,
            monthly_cost: self.monthly_cost,
            discovered_at,
        })
    }
}

impl ResourceRepository {
    pub fn new(db: Database) -> Self {
        ResourceRepository { db }
    }

    /// Insert or replace inventory rows by id.
    pub fn store_resources(&self, resources: &[Resource]) -> Result<()> {
        let conn = self.db.get_connection();
        let mut conn = conn.lock().map_err(|_| anyhow::anyhow!("database connection poisoned"))?;
        let tx = conn.transaction()?;

        for resource in resources {
            tx.execute(
                "INSERT OR REPLACE INTO resources
                 (id, address, provider, service, resource_type, name, region, tags, configuration,
                  public_access, encrypted, compliance, monthly_cost, discovered_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                params![
                    resource.id,
                    resource.address,
                    resource.provider.as_str(),
                    resource.service,
                    resource.resource_type,
                    resource.name,
                    resource.region,
                    serde_json::to_string(&resource.tags)?,
                    resource.configuration,
                    resource.public_access as i32,
                    resource.encrypted as i32,
                    serde_json::to_string(&resource.compliance)?,
                    resource.monthly_cost,
                    resource.discovered_at.to_rfc3339(),
                ],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn count(&self) -> Result<usize> {
        let conn = self.db.get_connection();
        let conn = conn.lock().map_err(|_| anyhow::anyhow!("database connection poisoned"))?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM resources", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn delete_all(&self) -> Result<()> {
        let conn = self.db.get_connection();
        let conn = conn.lock().map_err(|_| anyhow::anyhow!("database connection poisoned"))?;
        conn.execute("DELETE FROM resources", [])?;
        Ok(())
    }

    fn query(&self, filter: &ResourceFilter) -> Result<Vec<Resource>> {
        let mut clauses = Vec::new();
        let mut values: Vec<String> = Vec::new();
        if let Some(provider) = &filter.provider {
            values.push(provider.as_str().to_string());
            clauses.push(format!("provider = ?{}", values.len()));
        }
        if let Some(service) = &filter.service {
            values.push(service.clone());
            clauses.push(format!("service = ?{}", values.len()));
        }
        if let Some(region) = &filter.region {
            values.push(region.clone());
            clauses.push(format!("region = ?{}", values.len()));
        }

        let mut sql = String::from(
            "SELECT id, address, provider, service, resource_type, name, region, tags, configuration,
                    public_access, encrypted, compliance, monthly_cost, discovered_at
             FROM resources",
        );
        if !clauses.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&clauses.join(" AND "));
        }
        sql.push_str(" ORDER BY id");

        let conn = self.db.get_connection();
        let conn = conn.lock().map_err(|_| anyhow::anyhow!("database connection poisoned"))?;
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params_from_iter(values.iter()), |row| {
                Ok(ResourceRow {
                    id: row.get(0)?,
                    address: row.get(1)?,
                    provider: row.get(2)?,
                    service: row.get(3)?,
                    resource_type: row.get(4)?,
                    name: row.get(5)?,
                    region: row.get(6)?,
                    tags: row.get(7)?,
                    configuration: row.get(8)?,
                    public_access: row.get::<_, i32>(9)? != 0,
                    encrypted: row.get::<_, i32>(10)? != 0,
                    compliance: row.get(11)?,
                    monthly_cost: row.get(12)?,
                    discovered_at: row.get(13)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        rows.into_iter().map(ResourceRow::into_resource).collect()
    }
}

impl ResourceStore for ResourceRepository {
    fn find_resources(&self, filter: &ResourceFilter) -> Result<Vec<Resource>> {
        self.query(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Resource> {
        vec![
            Resource::new("i-1", Provider::Aws, "ec2", "instance")
                .with_region("us-east-1")
                .with_tag("Environment", "prod")
                .with_configuration(r#"{"InstanceType": "t3.micro"}"#)
                .with_public_access(true)
                .with_compliance("PCI-DSS"),
            Resource::new("vm-1", Provider::Azure, "compute", "virtual_machine")
                .with_monthly_cost(42.0)
                .with_encrypted(true),
        ]
    }

    #[test]
    fn test_store_and_fetch_round_trip() {
        let repo = ResourceRepository::new(Database::in_memory().unwrap());
        let resources = sample();
        repo.store_resources(&resources).unwrap();

        let fetched = repo.find_resources(&ResourceFilter::all()).unwrap();
        assert_eq!(fetched.len(), 2);
        assert_eq!(fetched[0].id, "i-1");
        assert_eq!(fetched[0].tag("Environment"), Some("prod"));
        assert!(fetched[0].public_access);
        assert_eq!(fetched[0].compliance, vec!["PCI-DSS".to_string()]);
        assert_eq!(fetched[1].provider, Provider::Azure);
        assert_eq!(fetched[1].monthly_cost, Some(42.0));
        assert!(fetched[1].encrypted);
    }

    #[test]
    fn test_filter_by_provider() {
        let repo = ResourceRepository::new(Database::in_memory().unwrap());
        repo.store_resources(&sample()).unwrap();

        let filter = ResourceFilter {
            provider: Some(Provider::Azure),
            ..Default::default()
        };
        let fetched = repo.find_resources(&filter).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].id, "vm-1");
    }

    #[test]
    fn test_store_replaces_existing_rows() {
        let repo = ResourceRepository::new(Database::in_memory().unwrap());
        repo.store_resources(&sample()).unwrap();
        repo.store_resources(&sample()).unwrap();
        assert_eq!(repo.count().unwrap(), 2);

        repo.delete_all().unwrap();
        assert_eq!(repo.count().unwrap(), 0);
    }
}
