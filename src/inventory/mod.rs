pub mod resource;
pub mod descriptor;

pub use resource::{Resource, Provider, GroupKey, ResourceFilter, Snapshot, ENVIRONMENT_TAG, PROJECT_TAG};
pub use descriptor::{ResourceConfig, ConfigField, normalize_key};
