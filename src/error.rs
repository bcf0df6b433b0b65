use thiserror::Error;

/// Application error type
#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Excel error: {0}")]
    Excel(#[from] calamine::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An identifier did not match the expected file name pattern
    #[error("Can't process corpus, invalid format for file name: {value}")]
    PatternMismatch { value: String },

    #[error("Invalid date: {value}")]
    InvalidDate { value: String },

    #[error("Unknown distribution '{0}', expected one of: day, month, year")]
    UnknownDistribution(String),

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Malformed publication mapping or mapping file; callers skip the
    /// optional name column instead of failing
    #[error("Invalid publication mapping: {0}")]
    InvalidMapping(String),

    #[error("Output '{0}' is not declared by this module")]
    UndeclaredOutput(String),
}
