//! Error types for secret store operations.

use thiserror::Error;

/// Result type for secret store operations.
pub type Result<T> = std::result::Result<T, SecretsError>;

/// Errors that can occur while talking to the secret store.
///
/// An absent entry is not an error: [`super::SecretStore::read`] returns
/// `Ok(None)` for it.
#[derive(Error, Debug)]
pub enum SecretsError {
    /// Failed to reach the secrets backend.
    #[error("Backend connection failed: {message}")]
    ConnectionFailed { message: String },

    /// The backend rejected the presented token.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The path cannot be addressed on this backend.
    #[error("Invalid secret path: {path} - {reason}")]
    InvalidKey { path: String, reason: String },

    /// The value cannot be stored on this backend.
    #[error("Invalid secret value: {reason}")]
    InvalidValue { reason: String },

    /// Backend-specific error.
    #[error("Backend error: {message}")]
    BackendError { message: String },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    ConfigError { message: String },
}

impl SecretsError {
    /// Create a connection failed error.
    pub fn connection_failed(message: impl Into<String>) -> Self {
        Self::ConnectionFailed { message: message.into() }
    }

    /// Create an authentication failed error.
    pub fn authentication_failed(message: impl Into<String>) -> Self {
        Self::AuthenticationFailed { message: message.into() }
    }

    /// Create an invalid path error.
    pub fn invalid_key(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey { path: path.into(), reason: reason.into() }
    }

    /// Create an invalid value error.
    pub fn invalid_value(reason: impl Into<String>) -> Self {
        Self::InvalidValue { reason: reason.into() }
    }

    /// Create a backend error.
    pub fn backend_error(message: impl Into<String>) -> Self {
        Self::BackendError { message: message.into() }
    }

    /// Create a config error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError { message: message.into() }
    }
}
