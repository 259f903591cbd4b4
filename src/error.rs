use thiserror::Error;

pub type Result<T> = std::result::Result<T, KpiError>;

#[derive(Debug, Error)]
pub enum KpiError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("missing required columns in {file}: {}", .columns.join(", "))]
    MissingColumns { file: String, columns: Vec<String> },

    #[error("unknown counter code: {0}")]
    UnknownCounter(String),

    #[error("unknown filter field: {0}")]
    UnknownField(String),

    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
