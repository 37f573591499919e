use serde::{Deserialize, Serialize};
use std::env;
use crate::engine::{CachePolicy, ExecutionStrategy, DEFAULT_BATCH_SIZE};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub analysis: AnalysisConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub database_path: String,
}

/// Explicit engine settings handed to every analyzer at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    pub strategy: ExecutionStrategy,
    pub cache: CachePolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub log_level: String,
    pub log_format: String,
}

impl AnalysisConfig {
    pub fn new(strategy: ExecutionStrategy, cache: CachePolicy) -> Self {
        AnalysisConfig { strategy, cache }
    }

    pub fn sequential() -> Self {
        AnalysisConfig::new(ExecutionStrategy::Sequential, CachePolicy::PerCall)
    }

    pub fn pooled(workers: usize, batch_size: usize) -> Self {
        AnalysisConfig::new(
            ExecutionStrategy::WorkerPool { workers, batch_size },
            CachePolicy::PerCall,
        )
    }
}

impl Config {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        // Load .env.local first (local overrides), then .env
        dotenv::from_filename(".env.local").ok();
        dotenv::dotenv().ok();

        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let workers = lookup("ANALYSIS_WORKERS").and_then(|v| v.trim().parse::<usize>().ok());
        let batch_size = lookup("ANALYSIS_BATCH_SIZE")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_BATCH_SIZE);

        let strategy = match lookup("ANALYSIS_STRATEGY")
            .unwrap_or_else(|| "pool".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "sequential" => ExecutionStrategy::Sequential,
            "pool" | "worker_pool" => ExecutionStrategy::WorkerPool {
                workers: workers.unwrap_or_else(num_cpus::get).max(1),
                batch_size: batch_size.max(1),
            },
            other => anyhow::bail!("Unknown ANALYSIS_STRATEGY '{}': expected 'sequential' or 'pool'", other),
        };

        let cache = match lookup("ANALYSIS_CACHE")
            .unwrap_or_else(|| "per_call".to_string())
            .trim()
            .to_lowercase()
            .as_str()
        {
            "per_call" | "enabled" => CachePolicy::PerCall,
            "disabled" | "off" => CachePolicy::Disabled,
            other => anyhow::bail!("Unknown ANALYSIS_CACHE '{}': expected 'per_call' or 'disabled'", other),
        };

        Ok(Config {
            database: DatabaseConfig {
                database_path: lookup("DATABASE_PATH")
                    .unwrap_or_else(|| "./data/cloudscope.db".to_string()),
            },
            analysis: AnalysisConfig::new(strategy, cache),
            logging: LoggingConfig {
                log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
                log_format: lookup("LOG_FORMAT").unwrap_or_else(|| "text".to_string()),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.database.database_path, "./data/cloudscope.db");
        assert_eq!(config.analysis.cache, CachePolicy::PerCall);
        assert_eq!(config.analysis.strategy.batch_size(), DEFAULT_BATCH_SIZE);
        assert!(config.analysis.strategy.workers() >= 1);
        assert_eq!(config.logging.log_level, "info");
    }

    #[test]
    fn test_explicit_pool_settings() {
        let config = Config::from_lookup(lookup(&[
            ("ANALYSIS_STRATEGY", "pool"),
            ("ANALYSIS_WORKERS", "3"),
            ("ANALYSIS_BATCH_SIZE", "25"),
            ("ANALYSIS_CACHE", "disabled"),
        ]))
        .unwrap();

        assert_eq!(
            config.analysis.strategy,
            ExecutionStrategy::WorkerPool { workers: 3, batch_size: 25 }
        );
        assert_eq!(config.analysis.cache, CachePolicy::Disabled);
    }

    #[test]
    fn test_sequential_and_invalid_values() {
        let config = Config::from_lookup(lookup(&[("ANALYSIS_STRATEGY", "Sequential")])).unwrap();
        assert_eq!(config.analysis.strategy, ExecutionStrategy::Sequential);

        assert!(Config::from_lookup(lookup(&[("ANALYSIS_STRATEGY", "threads")])).is_err());
        assert!(Config::from_lookup(lookup(&[("ANALYSIS_CACHE", "forever")])).is_err());
    }
}
