use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FunnelError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("File not found: {}", path.display())]
    MissingFile { path: PathBuf },

    #[error("Column '{column}' not found in {source_name}")]
    MissingColumn { column: String, source_name: String },

    #[error("Invalid table name '{name}'")]
    InvalidTableName { name: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl FunnelError {
    /// True for errors that stop a stage but are only reported, not propagated.
    pub fn is_missing_file(&self) -> bool {
        matches!(self, FunnelError::MissingFile { .. })
    }
}

pub type FunnelResult<T> = Result<T, FunnelError>;
