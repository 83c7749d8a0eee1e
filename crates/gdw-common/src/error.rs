//! Error types for GDW

use thiserror::Error;

/// Result type alias for GDW operations
pub type Result<T> = std::result::Result<T, GdwError>;

/// Main error type for GDW
#[derive(Error, Debug)]
pub enum GdwError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Format error at line {line}: {reason}")]
    Format { line: usize, reason: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Pipeline cancelled: {0}")]
    Cancelled(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl GdwError {
    /// Build a format error for a specific input line
    pub fn format(line: usize, reason: impl Into<String>) -> Self {
        GdwError::Format {
            line,
            reason: reason.into(),
        }
    }
}
