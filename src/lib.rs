pub mod config;
pub mod error;
pub mod inventory;
pub mod engine;
pub mod storage;
pub mod analysis;
pub mod security;
pub mod cost;
pub mod orchestrator;

pub use config::{AnalysisConfig, Config};
pub use error::{AnalysisError, AnalysisResult};
pub use inventory::{Provider, Resource, Snapshot};
pub use orchestrator::{AnalysisOrchestrator, AnalysisReport};
