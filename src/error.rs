//! Error types for Murine Flux

use thiserror::Error;

/// Errors that can occur while loading tables or computing views
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to load {table} table: {reason}")]
    LoadError { table: String, reason: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),

    #[error("Unknown filter value: {0}")]
    UnknownFilter(String),

    #[error("No dataset loaded")]
    NoDataset,
}

impl ComputeError {
    /// Wrap any reader failure as a load failure for the named table
    pub fn load(table: impl Into<String>, reason: impl ToString) -> Self {
        ComputeError::LoadError {
            table: table.into(),
            reason: reason.to_string(),
        }
    }
}
