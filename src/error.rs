use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the scheduling core.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("word already added: {0}")]
    DuplicateWord(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("grade must be between 0 and 5, got {0}")]
    InvalidGrade(u8),

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("word not found: {0}")]
    WordNotFound(String),
}

/// Errors raised by catalog providers.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("unknown level: {0}")]
    UnknownLevel(String),

    #[error("catalog I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Errors raised by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Errors raised while resolving runtime configuration.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} requires a value")]
    MissingValue(String),

    #[error("invalid port: {0}")]
    InvalidPort(String),

    #[error("no data directory available; pass --data-dir")]
    NoDataDir,
}
