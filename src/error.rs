use thiserror::Error;

/// Failures the analysis engine distinguishes.
///
/// Only `SnapshotFetch` ever reaches a caller of the orchestrator. The other
/// variants are contained where they happen and show up as gaps in the
/// resulting report.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("failed to fetch resource snapshot: {0}")]
    SnapshotFetch(String),

    #[error("{stage} partition '{partition}' failed: {reason}")]
    Partition {
        stage: String,
        partition: String,
        reason: String,
    },

    #[error("no cost estimator for provider '{provider}' (resource {resource_id})")]
    UnknownProviderCost {
        resource_id: String,
        provider: String,
    },
}

impl AnalysisError {
    pub fn snapshot(err: anyhow::Error) -> Self {
        AnalysisError::SnapshotFetch(format!("{:#}", err))
    }
}

pub type AnalysisResult<T> = std::result::Result<T, AnalysisError>;
