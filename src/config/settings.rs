//! # Configuration Settings
//!
//! Section structs for the gateway configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::state::StateCodec;

/// Default storage path for the state document
pub const DEFAULT_SECRET_PATH: &str = "secret/data/tfstate";

/// Default storage path for the Basic-Auth user record
pub const DEFAULT_USERS_PATH: &str = "secret/data/tfstate-users";

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Address to bind when no activated socket is inherited
    #[validate(length(min = 1, message = "Listen address cannot be empty"))]
    pub listen_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { listen_addr: ":8080".to_string() }
    }
}

/// Secret store backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Vault,
    Memory,
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vault" => Ok(BackendKind::Vault),
            "memory" => Ok(BackendKind::Memory),
            other => Err(format!("unknown backend '{}', expected 'vault' or 'memory'", other)),
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Vault => write!(f, "vault"),
            BackendKind::Memory => write!(f, "memory"),
        }
    }
}

/// Vault connection settings. The token is resolved separately, see
/// [`crate::auth::CredentialResolver`].
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VaultSettings {
    /// Backend implementation
    pub backend: BackendKind,

    /// Vault server address
    #[validate(length(min = 1, message = "Vault address cannot be empty"))]
    pub address: String,

    /// Vault namespace (Enterprise)
    pub namespace: Option<String>,

    /// Check `sys/health` at startup and fail when it errors
    pub health_check: bool,
}

impl Default for VaultSettings {
    fn default() -> Self {
        Self {
            backend: BackendKind::Vault,
            address: "http://127.0.0.1:8200".to_string(),
            namespace: None,
            health_check: true,
        }
    }
}

/// Where and how the state document is stored
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StateConfig {
    #[validate(length(min = 1, message = "Secret path cannot be empty"))]
    pub secret_path: String,

    pub codec: StateCodec,
}

impl Default for StateConfig {
    fn default() -> Self {
        Self { secret_path: DEFAULT_SECRET_PATH.to_string(), codec: StateCodec::TextSafe }
    }
}

/// How inbound requests relate to backend credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// No inbound authentication; one backend session shared by all requests
    #[default]
    None,
    /// Basic-Auth password is the backend token; a session per request
    Passthrough,
    /// Basic-Auth checked against the stored user record; shared session
    UserPass,
}

impl FromStr for AuthMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "" => Ok(AuthMode::None),
            "passthrough" | "token" => Ok(AuthMode::Passthrough),
            "userpass" | "basic" => Ok(AuthMode::UserPass),
            other => Err(format!(
                "unknown auth mode '{}', expected 'none', 'passthrough' or 'userpass'",
                other
            )),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthMode::None => write!(f, "none"),
            AuthMode::Passthrough => write!(f, "passthrough"),
            AuthMode::UserPass => write!(f, "userpass"),
        }
    }
}

/// Inbound authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct AuthConfig {
    pub mode: AuthMode,

    /// User record path, consulted in [`AuthMode::UserPass`]
    #[validate(length(min = 1, message = "Users path cannot be empty"))]
    pub users_path: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self { mode: AuthMode::None, users_path: DEFAULT_USERS_PATH.to_string() }
    }
}

/// Logging and metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[validate(length(min = 1, message = "Log level cannot be empty"))]
    pub log_level: String,

    /// Enable JSON structured logging
    pub json_logging: bool,

    /// Prometheus exporter listen address, disabled when unset
    pub metrics_addr: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self { log_level: "info".to_string(), json_logging: false, metrics_addr: None }
    }
}
