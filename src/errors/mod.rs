//! # Error Handling
//!
//! Crate-level error type. Everything that reaches this type is startup-fatal:
//! request-scoped failures are turned into HTTP statuses in
//! [`crate::api::error`] and never propagate this far.

use crate::auth::CredentialError;
use crate::secrets::SecretsError;

/// Custom result type for gateway operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the gateway
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network transport errors (listener acquisition, HTTP serving)
    #[error("Transport error: {0}")]
    Transport(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Secrets backend construction or health-check failures
    #[error("Secrets backend error: {0}")]
    Secrets(#[from] SecretsError),

    /// Backend credential could not be resolved
    #[error("Credential error: {0}")]
    Credential(#[from] CredentialError),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new transport error
    pub fn transport<S: Into<String>>(message: S) -> Self {
        Self::Transport(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Self::Config(errors.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::config("TFSTATE_CODEC must be 'text' or 'binary'");
        assert_eq!(err.to_string(), "Configuration error: TFSTATE_CODEC must be 'text' or 'binary'");

        let err = Error::transport("address in use");
        assert!(err.to_string().starts_with("Transport error"));
    }

    #[test]
    fn test_secrets_error_conversion() {
        let err: Error = SecretsError::connection_failed("health check failed").into();
        assert!(matches!(err, Error::Secrets(_)));
        assert!(err.to_string().contains("health check failed"));
    }
}
