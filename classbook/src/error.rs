//! Error types for the classbook crate
//!
//! All errors use thiserror for structured error handling.
//! These errors can be serialized to a frontend as plain strings.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Note not found: {0}")]
    NoteNotFound(String),

    #[error("No log entries match the export selection")]
    NothingToExport,

    #[error("AI request failed: {0}")]
    Ai(String),

    #[error("{0}")]
    Generic(String),
}

impl serde::Serialize for AppError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_serialize_as_display_string() {
        let err = AppError::StudentNotFound("hs01".to_string());
        let json = serde_json::to_string(&err).unwrap();
        assert_eq!(json, r#""Student not found: hs01""#);
    }
}
