//! Error types for Tally

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Invalid proposal at record {index}: field `{field}` {reason}")]
    Validation {
        index: usize,
        field: &'static str,
        reason: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl Error {
    /// Shorthand for a missing required field at ingestion
    pub fn missing(index: usize, field: &'static str) -> Self {
        Error::Validation {
            index,
            field,
            reason: "is required".to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
