//! Model validation errors.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

/// Validation failures for authoring payloads and contact submissions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Field {field} exceeds {max} characters")]
    TooLong { field: &'static str, max: usize },

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid media URL: {0}")]
    InvalidMediaUrl(String),

    #[error("Unknown subject: {0}")]
    UnknownSubject(String),

    #[error("Unknown media type: {0}")]
    UnknownMediaKind(String),
}

impl ModelError {
    /// True if the error is a missing/blank required field.
    pub fn is_missing_field(&self) -> bool {
        matches!(self, ModelError::MissingField(_))
    }
}
