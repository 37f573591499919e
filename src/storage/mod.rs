use anyhow::Result;
use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex};
use crate::config::DatabaseConfig;
use crate::inventory::{Resource, ResourceFilter};

pub mod resource_repo;
pub mod memory;

pub use resource_repo::ResourceRepository;
pub use memory::InMemoryResourceStore;

/// The one storage operation the analysis engine consumes.
pub trait ResourceStore: Send + Sync {
    fn find_resources(&self, filter: &ResourceFilter) -> Result<Vec<Resource>>;
}

#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn new(config: &DatabaseConfig) -> Result<Self> {
        // Ensure data directory exists
        if let Some(parent) = Path::new(&config.database_path).parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&config.database_path)?;
        let db = Database {
            conn: Arc::new(Mutex::new(conn)),
        };
        db.init_schema()?;
        Ok(db)
    }

    pub fn in_memory() -> Result<Self> {
        let db = Database {
            conn: Arc::new(Mutex::new(Connection::open_in_memory()?)),
        };
        db.init_schema()?;
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        let conn = self.conn.lock().map_err(|_| anyhow::anyhow!("database connection poisoned"))?;

        // Single inventory table written by discovery, read by analysis
        conn.execute(
            "CREATE TABLE IF NOT EXISTS resources (
                id TEXT PRIMARY KEY,
                address TEXT NOT NULL,
                provider TEXT NOT NULL,
                service TEXT NOT NULL,
                resource_type TEXT NOT NULL,
                name TEXT NOT NULL,
                region TEXT NOT NULL DEFAULT '',
                tags TEXT NOT NULL DEFAULT '{}',
                configuration TEXT NOT NULL DEFAULT '',
                public_access INTEGER NOT NULL DEFAULT 0,
                encrypted INTEGER NOT NULL DEFAULT 0,
                compliance TEXT NOT NULL DEFAULT '[]',
                monthly_cost REAL,
                discovered_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_resources_provider ON resources(provider)",
            [],
        )?;
        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_resources_service ON resources(provider, service)",
            [],
        )?;

        Ok(())
    }

    pub fn get_connection(&self) -> Arc<Mutex<Connection>> {
        self.conn.clone()
    }
}
