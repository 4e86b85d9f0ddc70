//! API error types for the CANAGROSA client.

use thiserror::Error;

/// Errors that can occur when talking to the REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The bearer token is missing, expired or rejected.
    #[error("Session expired: please log in again")]
    Unauthorized,

    /// The user lacks access to the resource.
    #[error("Permission denied: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The server rejected the request payload.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// The record was changed or is still referenced elsewhere.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Server-side failure.
    #[error("Server error: {0}")]
    ServerError(String),

    /// Network or HTTP error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Invalid URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// No token stored for the active profile.
    #[error("No token stored for profile '{0}'")]
    MissingToken(String),

    /// Keyring error when storing/retrieving tokens.
    #[error("Keyring error: {0}")]
    Keyring(String),

    /// Invalid response from the API.
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// The request was superseded and aborted.
    #[error("Request cancelled")]
    Cancelled,
}

/// Result type for API operations.
pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Create an error from an HTTP status code and the best message
    /// available for it.
    pub fn from_status(status: reqwest::StatusCode, message: &str) -> Self {
        match status.as_u16() {
            401 => ApiError::Unauthorized,
            400 | 422 => ApiError::BadRequest(message.to_string()),
            403 => ApiError::Forbidden(message.to_string()),
            404 => ApiError::NotFound(message.to_string()),
            409 => ApiError::Conflict(message.to_string()),
            500..=599 => ApiError::ServerError(format!("HTTP {}: {}", status.as_u16(), message)),
            _ => ApiError::ServerError(format!("Unexpected HTTP {}: {}", status.as_u16(), message)),
        }
    }

    /// Whether this error means the session is no longer valid.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized | ApiError::MissingToken(_))
    }

    /// Whether this error is a user or programmatic cancellation, which is
    /// never shown.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;

    #[test]
    fn test_error_from_status_401() {
        let err = ApiError::from_status(StatusCode::UNAUTHORIZED, "token expired");
        assert!(matches!(err, ApiError::Unauthorized));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_error_from_status_403() {
        let err = ApiError::from_status(StatusCode::FORBIDDEN, "solo administradores");
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn test_error_from_status_404() {
        let err = ApiError::from_status(StatusCode::NOT_FOUND, "cliente 42");
        match err {
            ApiError::NotFound(msg) => assert_eq!(msg, "cliente 42"),
            _ => panic!("Expected NotFound error"),
        }
    }

    #[test]
    fn test_error_from_status_validation() {
        let err = ApiError::from_status(StatusCode::UNPROCESSABLE_ENTITY, "CIF: obligatorio");
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_error_from_status_500() {
        let err = ApiError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert_eq!(err.to_string(), "Server error: HTTP 500: boom");
    }

    #[test]
    fn test_error_from_status_409() {
        let err = ApiError::from_status(StatusCode::CONFLICT, "en uso");
        assert!(matches!(err, ApiError::Conflict(_)));
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            ApiError::Unauthorized.to_string(),
            "Session expired: please log in again"
        );
        assert_eq!(
            ApiError::NotFound("muestra 7".to_string()).to_string(),
            "Not found: muestra 7"
        );
    }

    #[test]
    fn test_cancelled_is_not_unauthorized() {
        assert!(ApiError::Cancelled.is_cancelled());
        assert!(!ApiError::Cancelled.is_unauthorized());
    }
}
