//! Centralized error types for the admin client.
//!
//! Layer errors ([`ApiError`], [`ConfigError`]) convert into [`AppError`],
//! which knows how to phrase itself for the notification area.

use thiserror::Error;

use crate::api::error::ApiError;
use crate::config::ConfigError;

/// The main application error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Configuration-related errors.
    #[error("{0}")]
    Config(#[from] ConfigError),

    /// API-related errors.
    #[error("{0}")]
    Api(#[from] ApiError),

    /// IO errors (file system, etc.).
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// Get a user-friendly message for display.
    ///
    /// Messages coming from the server (validation, conflicts, permissions)
    /// are passed through verbatim.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Config(e) => match e {
                ConfigError::NoConfigDir => {
                    "Could not find configuration directory. Please check your system settings."
                        .to_string()
                }
                ConfigError::CreateDirError(_) => {
                    "Could not create configuration directory. Check file permissions.".to_string()
                }
                ConfigError::ReadError(_) => {
                    "Could not read configuration file. Please check the file exists and is readable.".to_string()
                }
                ConfigError::WriteError(_) => {
                    "Could not save configuration. Please check file permissions.".to_string()
                }
                ConfigError::ParseError(_) => {
                    "Configuration file is invalid. Please check the file format.".to_string()
                }
                ConfigError::SerializeError(_) => {
                    "Could not save configuration. Internal error.".to_string()
                }
                ConfigError::ValidationError(msg) => format!("Configuration error: {}", msg),
                ConfigError::ProfileNotFound(name) => format!("Profile '{}' not found.", name),
            },
            AppError::Api(e) => match e {
                ApiError::Unauthorized => "Your session has expired. Please log in again.".to_string(),
                ApiError::MissingToken(profile) => format!(
                    "No token stored for '{}'. Run 'canagrosa login --profile {}'.",
                    profile, profile
                ),
                ApiError::Forbidden(msg) => format!("Access denied: {}", msg),
                ApiError::NotFound(resource) => format!("'{}' was not found.", resource),
                ApiError::BadRequest(msg) => msg.clone(),
                ApiError::Conflict(msg) => msg.clone(),
                ApiError::ServerError(_) => "Server error. Please try again later.".to_string(),
                ApiError::Network(_) => {
                    "Connection failed. Please check your network connection.".to_string()
                }
                ApiError::InvalidUrl(_) => "Invalid API URL in configuration.".to_string(),
                ApiError::Keyring(_) => {
                    "Could not access secure storage. Please log in again.".to_string()
                }
                ApiError::InvalidResponse(_) => {
                    "Unexpected response from the server. Please try again.".to_string()
                }
                ApiError::Cancelled => "Request cancelled.".to_string(),
            },
            AppError::Io(_) => "A file operation failed. Please check file permissions.".to_string(),
        }
    }

    /// [`user_message`](Self::user_message) followed by the suggested
    /// action, if there is one.
    pub fn display_message(&self) -> String {
        match self.suggested_action() {
            Some(action) => format!("{} {}", self.user_message(), action),
            None => self.user_message(),
        }
    }

    /// Check if this error is critical and requires user acknowledgment.
    pub fn is_critical(&self) -> bool {
        matches!(
            self,
            AppError::Config(_)
                | AppError::Api(ApiError::Unauthorized)
                | AppError::Api(ApiError::MissingToken(_))
                | AppError::Api(ApiError::Forbidden(_))
                | AppError::Api(ApiError::InvalidUrl(_))
                | AppError::Api(ApiError::Keyring(_))
        )
    }

    /// Whether the error ends the session (token must be purged).
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Api(e) if e.is_unauthorized())
    }

    /// Cancellations are never reported.
    pub fn is_silent(&self) -> bool {
        matches!(self, AppError::Api(ApiError::Cancelled))
    }

    /// Get a suggested action for the user.
    pub fn suggested_action(&self) -> Option<&'static str> {
        match self {
            AppError::Config(ConfigError::ProfileNotFound(_))
            | AppError::Config(ConfigError::ValidationError(_)) => {
                Some("Check the profiles in config.toml.")
            }
            AppError::Api(ApiError::Unauthorized) => Some("Run 'canagrosa login' with a new token."),
            AppError::Api(ApiError::InvalidUrl(_)) => Some("Check the profile url in config.toml."),
            AppError::Api(ApiError::Network(_)) | AppError::Api(ApiError::ServerError(_)) => {
                Some("Press 'r' to retry.")
            }
            _ => None,
        }
    }
}

/// Result type for application operations.
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_from_config_error() {
        let app_err: AppError = ConfigError::NoConfigDir.into();
        assert!(matches!(app_err, AppError::Config(ConfigError::NoConfigDir)));
    }

    #[test]
    fn test_app_error_from_api_error() {
        let app_err: AppError = ApiError::Unauthorized.into();
        assert!(matches!(app_err, AppError::Api(ApiError::Unauthorized)));
        assert!(app_err.is_unauthorized());
    }

    #[test]
    fn test_user_message_passes_server_text_through() {
        let err = AppError::Api(ApiError::Conflict(
            "El cliente tiene muestras asociadas".to_string(),
        ));
        assert_eq!(err.user_message(), "El cliente tiene muestras asociadas");
    }

    #[test]
    fn test_user_message_missing_token() {
        let err = AppError::Api(ApiError::MissingToken("lab".to_string()));
        assert!(err.user_message().contains("canagrosa login --profile lab"));
        assert!(err.is_unauthorized());
    }

    #[test]
    fn test_user_message_not_found() {
        let msg = AppError::Api(ApiError::NotFound("cliente 42".to_string())).user_message();
        assert!(msg.contains("cliente 42"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_user_message_config_validation() {
        let err = AppError::Config(ConfigError::ValidationError("duplicate profile".to_string()));
        assert!(err.user_message().contains("duplicate profile"));
    }

    #[test]
    fn test_is_critical() {
        assert!(AppError::Api(ApiError::Unauthorized).is_critical());
        assert!(AppError::Api(ApiError::Forbidden("x".to_string())).is_critical());
        assert!(AppError::Config(ConfigError::NoConfigDir).is_critical());
        assert!(!AppError::Api(ApiError::ServerError("x".to_string())).is_critical());
    }

    #[test]
    fn test_cancelled_is_silent() {
        assert!(AppError::Api(ApiError::Cancelled).is_silent());
        assert!(!AppError::Api(ApiError::ServerError("x".to_string())).is_silent());
    }

    #[test]
    fn test_suggested_action_unauthorized() {
        let action = AppError::Api(ApiError::Unauthorized).suggested_action();
        assert!(action.unwrap().contains("login"));
    }

    #[test]
    fn test_display_message_appends_suggestion() {
        let err = AppError::Api(ApiError::ServerError("boom".to_string()));
        assert_eq!(
            err.display_message(),
            "Server error. Please try again later. Press 'r' to retry."
        );
        let err = AppError::Api(ApiError::Conflict("Duplicado".to_string()));
        assert_eq!(err.display_message(), "Duplicado");
    }
}
