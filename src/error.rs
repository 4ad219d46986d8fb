use std::fmt::Display;

use ledger::LedgerError;

#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Malformed or out-of-range input. Raised before any write.
    Validation(String),
    /// Stored state no longer allows the operation; refetch and retry.
    Conflict(String),
    NotFound(String),
    Unauthorized(String),
    BusinessRule(String),
    Storage(String),
}

impl Error {
    /// Validation and conflict failures can be retried immediately by the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Validation(_) | Error::Conflict(_))
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Validation(msg) => write!(f, "Validation error: {}", msg),
            Error::Conflict(msg) => write!(f, "Conflict: {}", msg),
            Error::NotFound(what) => write!(f, "Not found: {}", what),
            Error::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            Error::BusinessRule(msg) => write!(f, "Business rule violated: {}", msg),
            Error::Storage(err) => write!(f, "Storage error: {}", err),
        }
    }
}

impl std::error::Error for Error {}

impl From<LedgerError> for Error {
    fn from(err: LedgerError) -> Self {
        match err {
            // stored entries can no longer be summed
            LedgerError::Overflow(_) => Error::Storage(err.to_string()),
            _ => Error::Validation(err.to_string()),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for Error {
    fn from(err: sqlx::Error) -> Self {
        Error::Storage(err.to_string())
    }
}
