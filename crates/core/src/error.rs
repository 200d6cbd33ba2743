//! Error types for ledgerline.

use thiserror::Error;

/// Result type for ledgerline operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Errors that can occur while reading or extending a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Credentials or other startup configuration is missing or unusable.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// No worksheet matched a project, or no row matched a period label.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Ledger content cannot be used as a billing baseline.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The tabular store failed (I/O, auth, malformed response).
    #[error("Upstream error: {0}")]
    Upstream(String),
}

impl LedgerError {
    /// Create a not-found error.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create an upstream error.
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    /// Stable machine-readable kind, used by the HTTP layer.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation",
            Self::Upstream(_) => "upstream",
        }
    }
}
