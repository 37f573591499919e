use anyhow::Result;
use std::sync::{PoisonError, RwLock};
use crate::inventory::{Resource, ResourceFilter};
use crate::storage::ResourceStore;

/// Inventory held in process memory, for tests and embedders that already
/// hold their resources.
#[derive(Debug, Default)]
pub struct InMemoryResourceStore {
    resources: RwLock<Vec<Resource>>,
}

impl InMemoryResourceStore {
    pub fn new(resources: Vec<Resource>) -> Self {
        InMemoryResourceStore {
            resources: RwLock::new(resources),
        }
    }

    pub fn replace(&self, resources: Vec<Resource>) {
        *self.resources.write().unwrap_or_else(PoisonError::into_inner) = resources;
    }
}

impl ResourceStore for InMemoryResourceStore {
    fn find_resources(&self, filter: &ResourceFilter) -> Result<Vec<Resource>> {
        let resources = self.resources.read().unwrap_or_else(PoisonError::into_inner);
        Ok(resources.iter().filter(|r| filter.matches(r)).cloned().collect())
    }
}
