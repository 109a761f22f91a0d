//! Error types for cogwatch

use thiserror::Error;

/// Errors that can occur while building the engine or moving data in and out of it.
///
/// Scoring, feature extraction and trend estimation never fail; only
/// construction from user-supplied tables, (de)serialization and I/O do.
#[derive(Debug, Error)]
pub enum AssessError {
    #[error("Empty input: {0}")]
    EmptyInput(String),

    #[error("Invalid rule tables: {0}")]
    InvalidRules(String),

    #[error("Invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Export error: {0}")]
    ExportError(String),
}
