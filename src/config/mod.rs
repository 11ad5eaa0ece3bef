//! # Configuration Management
//!
//! Configuration comes from environment variables (optionally loaded from a
//! `.env` file by the binary), with command line flags taking precedence.
//!
//! | Variable | Default |
//! |---|---|
//! | `TFSTATE_LISTEN_ADDR` | `:8080` |
//! | `VAULT_ADDR` | `http://127.0.0.1:8200` |
//! | `VAULT_NAMESPACE` | unset |
//! | `TFSTATE_BACKEND` | `vault` |
//! | `TFSTATE_VAULT_HEALTH_CHECK` | `true` |
//! | `TFSTATE_SECRET_PATH` | `secret/data/tfstate` |
//! | `TFSTATE_CODEC` | `text` |
//! | `TFSTATE_AUTH_MODE` | `none` |
//! | `TFSTATE_USERS_PATH` | `secret/data/tfstate-users` |
//! | `TFSTATE_LOG_LEVEL` | `info` |
//! | `TFSTATE_LOG_JSON` | `false` |
//! | `TFSTATE_METRICS_ADDR` | unset |

pub mod settings;

pub use settings::{
    AuthConfig, AuthMode, BackendKind, ObservabilityConfig, ServerConfig, StateConfig,
    VaultSettings, DEFAULT_SECRET_PATH, DEFAULT_USERS_PATH,
};

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::cli::Cli;
use crate::errors::{Error, Result};
use crate::secrets::split_kv2_path;
use crate::state::StateCodec;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct Config {
    #[validate(nested)]
    pub server: ServerConfig,

    #[validate(nested)]
    pub vault: VaultSettings,

    #[validate(nested)]
    pub state: StateConfig,

    #[validate(nested)]
    pub auth: AuthConfig,

    #[validate(nested)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Create configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source.
    ///
    /// Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = Config::default();

        let codec = match var("TFSTATE_CODEC") {
            Some(raw) => raw.parse::<StateCodec>().map_err(Error::config)?,
            None => defaults.state.codec,
        };
        let mode = match var("TFSTATE_AUTH_MODE") {
            Some(raw) => raw.parse::<AuthMode>().map_err(Error::config)?,
            None => defaults.auth.mode,
        };
        let backend = match var("TFSTATE_BACKEND") {
            Some(raw) => raw.parse::<BackendKind>().map_err(Error::config)?,
            None => defaults.vault.backend,
        };

        Ok(Self {
            server: ServerConfig {
                listen_addr: var("TFSTATE_LISTEN_ADDR").unwrap_or(defaults.server.listen_addr),
            },
            vault: VaultSettings {
                backend,
                address: var("VAULT_ADDR").unwrap_or(defaults.vault.address),
                namespace: var("VAULT_NAMESPACE"),
                health_check: var("TFSTATE_VAULT_HEALTH_CHECK")
                    .map(|v| parse_bool(&v))
                    .unwrap_or(defaults.vault.health_check),
            },
            state: StateConfig {
                secret_path: var("TFSTATE_SECRET_PATH").unwrap_or(defaults.state.secret_path),
                codec,
            },
            auth: AuthConfig {
                mode,
                users_path: var("TFSTATE_USERS_PATH").unwrap_or(defaults.auth.users_path),
            },
            observability: ObservabilityConfig {
                log_level: var("TFSTATE_LOG_LEVEL").unwrap_or(defaults.observability.log_level),
                json_logging: var("TFSTATE_LOG_JSON").map(|v| parse_bool(&v)).unwrap_or(false),
                metrics_addr: var("TFSTATE_METRICS_ADDR"),
            },
        })
    }

    /// Apply command line overrides.
    pub fn with_cli(mut self, cli: &Cli) -> Self {
        if let Some(ref addr) = cli.listen_addr {
            self.server.listen_addr = addr.clone();
        }
        if let Some(ref addr) = cli.vault_addr {
            self.vault.address = addr.clone();
        }
        if cli.verbose {
            self.observability.log_level = "debug".to_string();
        }
        self
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<()> {
        Validate::validate(self)?;

        if self.vault.backend == BackendKind::Vault {
            split_kv2_path(&self.state.secret_path)?;
            if self.auth.mode == AuthMode::UserPass {
                split_kv2_path(&self.auth.users_path)?;
            }
            if self.state.codec == StateCodec::BinaryDirect {
                return Err(Error::config(
                    "the binary codec needs a backend that stores binary values; Vault KV v2 only stores JSON",
                ));
            }
        }

        Ok(())
    }
}

fn parse_bool(value: &str) -> bool {
    let value = value.trim();
    value.eq_ignore_ascii_case("true") || value == "1" || value.eq_ignore_ascii_case("yes")
}
