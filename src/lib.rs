//! # tfstate-gateway
//!
//! A Terraform `http` state backend that keeps the state document in
//! HashiCorp Vault and lets Vault do the authentication.
//!
//! ## Architecture
//!
//! ```text
//! Listener Acquirer → Request Router → Codec → SecretStore (Vault KV v2)
//!                           ↓
//!                  Credential Resolver / access gate
//! ```
//!
//! ## Core Components
//!
//! - **Request Router** ([`api`]): one axum handler dispatching on POST, GET,
//!   LOCK, UNLOCK and everything else
//! - **Codec** ([`state`]): base64 text-safe or binary-direct storage layout
//! - **Credential Resolver** ([`auth`]): env token, Basic-Auth password, or
//!   `~/.vault-token`
//! - **Secret Store** ([`secrets`]): the backend capability (`read`, `write`,
//!   `health`) with a `vaultrs` implementation
//! - **Listener Acquirer** ([`listener`]): systemd socket activation or bind
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tfstate_gateway::{
//!     api::{build_router, serve},
//!     auth::CredentialResolver,
//!     listener::{acquire_listener, ActivationEnv},
//!     startup::build_app_state,
//!     Config, Result,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = Config::from_env()?;
//!     let listener = acquire_listener(&config.server.listen_addr, &ActivationEnv::from_env()).await?;
//!     let state = build_app_state(&config, CredentialResolver::from_env()).await?;
//!     serve(listener, build_router(state)).await
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod errors;
pub mod listener;
pub mod observability;
pub mod secrets;
pub mod startup;
pub mod state;

// Re-export commonly used types
pub use config::Config;
pub use errors::{Error, Result};

/// Application version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name from Cargo.toml
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
