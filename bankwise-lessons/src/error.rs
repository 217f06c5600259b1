//! Error types for bankwise-lessons

use thiserror::Error;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced by the lesson engine.
///
/// Only lifecycle and loading problems are errors. Guard mismatches and
/// unknown reactions are absorbed by the matcher and logged instead.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Lesson has no usable identifier
    #[error("Invalid lesson: {0}")]
    InvalidLesson(String),

    /// Lesson is already in the completed set
    #[error("Lesson already completed: {0}")]
    AlreadyCompleted(String),

    /// Operation needs an active lesson
    #[error("Lesson not active: {0}")]
    LessonNotActive(String),

    /// Lesson catalog could not be parsed
    #[error("Catalog error: {0}")]
    Catalog(String),
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::Catalog(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::Catalog(err.to_string())
    }
}

/// Errors from pushing telemetry snapshots
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Telemetry transport failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Telemetry endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Telemetry serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Telemetry is not configured: {0}")]
    NotConfigured(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_lesson_displays_reason() {
        let error = EngineError::InvalidLesson("empty id".to_string());
        assert_eq!(error.to_string(), "Invalid lesson: empty id");
    }

    #[test]
    fn already_completed_displays_id() {
        let error = EngineError::AlreadyCompleted("banking_basics".to_string());
        assert!(error.to_string().contains("banking_basics"));
    }

    #[test]
    fn catalog_error_converts_from_toml() {
        let err = toml::from_str::<toml::Value>("lessons = [").unwrap_err();
        let engine_err: EngineError = err.into();
        assert!(matches!(engine_err, EngineError::Catalog(_)));
    }

    #[test]
    fn catalog_error_converts_from_json() {
        let err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let engine_err: EngineError = err.into();
        assert!(matches!(engine_err, EngineError::Catalog(_)));
    }

    #[test]
    fn telemetry_status_displays_code_and_body() {
        let error = TelemetryError::Status {
            status: 503,
            body: "unavailable".to_string(),
        };
        assert!(error.to_string().contains("503"));
        assert!(error.to_string().contains("unavailable"));
    }
}
