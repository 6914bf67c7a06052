//! Error types for KMP.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Empty input: {0} must not be blank")]
    EmptyInput(&'static str),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures of the durable store, which callers may retry.
    pub fn is_store_failure(&self) -> bool {
        matches!(self, Error::Storage(_) | Error::Database(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Reject blank text before it reaches any stateful component.
pub fn require_text(field: &'static str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        Err(Error::EmptyInput(field))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_text() {
        assert!(require_text("text", "  مرحبا ").is_ok());
        assert!(matches!(
            require_text("text", " \n\t"),
            Err(Error::EmptyInput("text"))
        ));
    }

    #[test]
    fn test_store_failure_classification() {
        assert!(Error::Database("locked".into()).is_store_failure());
        assert!(!Error::NotFound("idea".into()).is_store_failure());
    }
}
