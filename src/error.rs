//! Engine error type for embedders.
//!
//! Library operations return `PolarsError` so engine failures pass through untouched.
//! Use [`EngineError`] when you want a single error type (e.g. for the CLI runner)
//! without depending on Polars error variants.

use polars::error::PolarsError;
use thiserror::Error;

/// Unified error type for spark-transformations operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// User-facing error (invalid input, unsupported operation).
    #[error("user error: {0}")]
    User(String),
    /// Internal / compute error.
    #[error("internal error: {0}")]
    Internal(String),
    /// I/O error (file not found, permission, etc.).
    #[error("io error: {0}")]
    Io(String),
    /// Resource not found (column, table, file).
    #[error("not found: {0}")]
    NotFound(String),
    /// Write target exists and the save mode is `error`.
    #[error("already exists: {0}")]
    AlreadyExists(String),
    /// Other / unclassified.
    #[error("{0}")]
    Other(String),
}

impl From<PolarsError> for EngineError {
    fn from(e: PolarsError) -> Self {
        let msg = e.to_string();
        match &e {
            PolarsError::ColumnNotFound(_) => EngineError::NotFound(msg),
            PolarsError::InvalidOperation(_) | PolarsError::SchemaMismatch(_) => {
                EngineError::User(msg)
            }
            PolarsError::ComputeError(_) => {
                if msg.contains("already exists") {
                    EngineError::AlreadyExists(msg)
                } else if msg.contains("not found") {
                    EngineError::NotFound(msg)
                } else {
                    EngineError::Internal(msg)
                }
            }
            PolarsError::IO { .. } => EngineError::Io(msg),
            _ => EngineError::Other(msg),
        }
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(e: serde_json::Error) -> Self {
        EngineError::Internal(e.to_string())
    }
}

impl From<std::io::Error> for EngineError {
    fn from(e: std::io::Error) -> Self {
        EngineError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::EngineError;
    use polars::error::PolarsError;

    #[test]
    fn column_not_found_maps_to_not_found() {
        let e: EngineError = PolarsError::ColumnNotFound("Column 'x' not found".into()).into();
        assert!(matches!(e, EngineError::NotFound(_)));
    }

    #[test]
    fn existing_target_maps_to_already_exists() {
        let e: EngineError =
            PolarsError::ComputeError("save: path 'out/data.csv' already exists".into()).into();
        assert!(matches!(e, EngineError::AlreadyExists(_)));
        assert!(e.to_string().starts_with("already exists:"));
    }

    #[test]
    fn io_error_maps_to_io() {
        let e: EngineError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert_eq!(e.to_string(), "io error: gone");
    }
}
