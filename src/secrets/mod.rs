//! Secret store abstraction for the Terraform state document.
//!
//! The gateway treats its backend as a black-box capability with three
//! operations, expressed by the [`SecretStore`] trait:
//! - **read**: fetch the logical document stored at a path, or `None`
//! - **write**: replace the logical document stored at a path
//! - **health**: check the backend and report its version
//!
//! # Supported Backends
//!
//! - **HashiCorp Vault** ([`VaultSecretStore`]): KV v2 engine through `vaultrs`.
//!   JSON values only.
//! - **Memory** ([`MemorySecretStore`]): process-local map for development and
//!   tests. Accepts binary values.
//!
//! # Sessions
//!
//! A store is either built once at startup and shared by every request, or
//! opened per request by a [`SessionFactory`] from a request-scoped token.
//!
//! # Example
//!
//! ```rust,ignore
//! use tfstate_gateway::secrets::{SecretStore, VaultConfig, VaultSecretStore};
//!
//! let store = VaultSecretStore::new(&VaultConfig::default())?;
//! let health = store.health().await?;
//! let entry = store.read("secret/data/tfstate").await?;
//! ```

pub mod error;
pub mod memory;
pub mod store;
pub mod types;
pub mod vault;

pub use error::{Result, SecretsError};
pub use memory::{MemorySecretStore, MemorySessionFactory};
pub use store::{HealthStatus, SecretStore, SecretValue, SessionFactory};
pub use types::SecretString;
pub use vault::{split_kv2_path, VaultConfig, VaultSecretStore, VaultSessionFactory};
