//! Firestore error types.

use thiserror::Error;

/// Result type for Firestore operations.
pub type FirestoreResult<T> = Result<T, FirestoreError>;

/// Errors that can occur during Firestore operations.
#[derive(Debug, Error)]
pub enum FirestoreError {
    #[error("Authentication failed: {0}")]
    AuthError(String),

    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document already exists: {0}")]
    AlreadyExists(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Server error ({0}): {1}")]
    ServerError(u16, String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Rate limited, retry after {0}ms")]
    RateLimited(u64),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Delay assumed for a 429 without a usable Retry-After header.
const DEFAULT_RATE_LIMIT_DELAY_MS: u64 = 1000;

impl FirestoreError {
    pub fn auth_error(msg: impl Into<String>) -> Self {
        Self::AuthError(msg.into())
    }

    pub fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound(path.into())
    }

    pub fn request_failed(msg: impl Into<String>) -> Self {
        Self::RequestFailed(msg.into())
    }

    pub fn invalid_response(msg: impl Into<String>) -> Self {
        Self::InvalidResponse(msg.into())
    }

    /// Classify an HTTP error status returned by the REST API.
    pub fn from_http_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match status {
            401 => Self::AuthError(body),
            403 => Self::PermissionDenied(body),
            404 => Self::NotFound(body),
            409 => Self::AlreadyExists(body),
            429 => Self::RateLimited(DEFAULT_RATE_LIMIT_DELAY_MS),
            500..=599 => Self::ServerError(status, body),
            _ => Self::RequestFailed(body),
        }
    }

    /// HTTP status this error corresponds to, if any.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            FirestoreError::AuthError(_) => Some(401),
            FirestoreError::PermissionDenied(_) => Some(403),
            FirestoreError::NotFound(_) => Some(404),
            FirestoreError::AlreadyExists(_) => Some(409),
            FirestoreError::RateLimited(_) => Some(429),
            FirestoreError::ServerError(status, _) => Some(*status),
            FirestoreError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Server-requested delay before retrying, if any.
    pub fn retry_after_ms(&self) -> Option<u64> {
        match self {
            FirestoreError::RateLimited(ms) => Some(*ms),
            _ => None,
        }
    }

    /// Check if error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            FirestoreError::Network(_)
                | FirestoreError::RateLimited(_)
                | FirestoreError::ServerError(_, _)
        )
    }
}
