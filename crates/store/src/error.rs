use ledgerline_core::LedgerError;
use thiserror::Error;

/// Errors raised by a tabular store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Table not found: {name}")]
    TableNotFound { name: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Store API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Config(msg) => LedgerError::Configuration(msg),
            StoreError::TableNotFound { .. } => LedgerError::NotFound(err.to_string()),
            other => LedgerError::Upstream(other.to_string()),
        }
    }
}
