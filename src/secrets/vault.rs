//! HashiCorp Vault secret store.
//!
//! Stores the state document in Vault's KV v2 engine through `vaultrs`.
//!
//! # Path mapping
//!
//! The gateway is configured with a logical KV v2 path such as
//! `secret/data/tfstate`. The segment before `/data/` is the mount and the
//! rest is the key, so that path maps to `kv2::read("secret", "tfstate")`.
//!
//! # Document layout
//!
//! KV v2 wraps secret content in a `data` object, both on write and on read.
//! [`VaultSecretStore`] exposes the wrapped document, so the gateway sees the
//! same `{"data": {...}}` shape Vault's logical API returns:
//!
//! ```text
//! write {"data": {"data": "<base64>"}}  →  kv2::set(mount, key, {"data": "<base64>"})
//! kv2::read(mount, key) = {"data": "<base64>"}  →  read {"data": {"data": "<base64>"}}
//! ```
//!
//! # Security
//!
//! - Tokens are never logged
//! - Stored values are never logged, only their paths

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use rustify::errors::ClientError as RestError;
use vaultrs::client::{VaultClient, VaultClientSettingsBuilder};
use vaultrs::error::ClientError;
use vaultrs::kv2;

use super::error::{Result, SecretsError};
use super::store::{HealthStatus, SecretStore, SecretValue, SessionFactory};
use super::types::SecretString;

/// Configuration for the Vault backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultConfig {
    /// Vault server address (e.g., "https://vault.example.com:8200")
    pub address: String,

    /// Vault token, when already resolved
    pub token: Option<SecretString>,

    /// Vault namespace (for Enterprise multi-tenancy)
    pub namespace: Option<String>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self { address: "http://127.0.0.1:8200".to_string(), token: None, namespace: None }
    }
}

impl VaultConfig {
    /// Copy of this configuration authenticating with `token`.
    pub fn with_token(&self, token: SecretString) -> Self {
        Self { address: self.address.clone(), token: Some(token), namespace: self.namespace.clone() }
    }
}

/// Split a logical KV v2 path into `(mount, key)`.
///
/// `secret/data/tfstate` → `("secret", "tfstate")`,
/// `kv/team-a/data/envs/prod` → `("kv/team-a", "envs/prod")`.
pub fn split_kv2_path(path: &str) -> Result<(&str, &str)> {
    let trimmed = path.trim_matches('/');
    match trimmed.split_once("/data/") {
        Some((mount, key)) if !mount.is_empty() && !key.is_empty() => Ok((mount, key)),
        Some(_) => Err(SecretsError::invalid_key(path, "mount and key must both be non-empty")),
        None => Err(SecretsError::invalid_key(
            path,
            "expected a KV v2 path of the form <mount>/data/<key>",
        )),
    }
}

/// Vault KV v2 implementation of [`SecretStore`].
///
/// `Send + Sync`; a single instance is shared by all requests in the
/// shared-session mode.
pub struct VaultSecretStore {
    client: VaultClient,
    address: String,
}

impl std::fmt::Debug for VaultSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultSecretStore")
            .field("address", &self.address)
            .field("client", &"[VaultClient]")
            .finish()
    }
}

impl VaultSecretStore {
    /// Build a client for the configured Vault.
    ///
    /// No network call is made here; use [`SecretStore::health`] to check reachability.
    ///
    /// # Errors
    ///
    /// - [`SecretsError::ConfigError`] if the address is empty or rejected by `vaultrs`
    /// - [`SecretsError::ConnectionFailed`] if the HTTP client cannot be built
    pub fn new(config: &VaultConfig) -> Result<Self> {
        if config.address.is_empty() {
            return Err(SecretsError::config_error("Vault address cannot be empty"));
        }

        let mut settings_builder = VaultClientSettingsBuilder::default();
        settings_builder.address(&config.address);

        if let Some(ref token) = config.token {
            settings_builder.token(token.expose_secret());
        }

        if let Some(ref namespace) = config.namespace {
            settings_builder.namespace(Some(namespace.clone()));
        }

        let settings = settings_builder.build().map_err(|e| {
            SecretsError::config_error(format!("Invalid Vault configuration: {}", e))
        })?;

        let client = VaultClient::new(settings).map_err(|e| {
            SecretsError::connection_failed(format!("Failed to create Vault client: {}", e))
        })?;

        Ok(Self { client, address: config.address.clone() })
    }

    /// Vault address this store talks to.
    pub fn address(&self) -> &str {
        &self.address
    }
}

/// HTTP status of a non-2xx Vault response.
///
/// Bodies without an `errors` array (a soft-deleted KV v2 version, the
/// health endpoint) surface as a transport error rather than `APIError`.
fn response_code(err: &ClientError) -> Option<u16> {
    match err {
        ClientError::APIError { code, .. } => Some(*code),
        ClientError::RestClientError { source: RestError::ServerResponseError { code, .. } } => {
            Some(*code)
        }
        _ => None,
    }
}

/// `sys/health` body. Vault also sends it with a non-2xx code from sealed
/// (503), standby (429) and DR or performance secondary (472, 473) nodes.
#[derive(Debug, Deserialize)]
struct HealthBody {
    #[serde(default)]
    initialized: bool,
    #[serde(default)]
    sealed: bool,
    #[serde(default)]
    standby: bool,
    #[serde(default)]
    version: String,
}

impl From<HealthBody> for HealthStatus {
    fn from(body: HealthBody) -> Self {
        Self {
            initialized: body.initialized,
            sealed: body.sealed,
            standby: body.standby,
            version: body.version,
        }
    }
}

fn health_from_status_response(err: &ClientError) -> Option<HealthStatus> {
    let ClientError::RestClientError {
        source: RestError::ServerResponseError { code: 429 | 472 | 473 | 503, content },
    } = err
    else {
        return None;
    };
    let body: HealthBody = serde_json::from_str(content.as_deref()?).ok()?;
    Some(body.into())
}

fn map_client_error(operation: &str, path: &str, err: ClientError) -> SecretsError {
    match err {
        ClientError::APIError { code: 401 | 403, errors } => SecretsError::authentication_failed(
            format!("{} {} denied: {}", operation, path, errors.join(", ")),
        ),
        ClientError::APIError { code, errors } => SecretsError::backend_error(format!(
            "{} {} returned {}: {}",
            operation,
            path,
            code,
            errors.join(", ")
        )),
        other => SecretsError::connection_failed(format!("{} {}: {}", operation, path, other)),
    }
}

#[async_trait]
impl SecretStore for VaultSecretStore {
    fn backend_name(&self) -> &'static str {
        "vault"
    }

    async fn read(&self, path: &str) -> Result<Option<SecretValue>> {
        let (mount, key) = split_kv2_path(path)?;

        match kv2::read::<Value>(&self.client, mount, key).await {
            Ok(content) => Ok(Some(SecretValue::Json(json!({ "data": content })))),
            Err(e) if response_code(&e) == Some(404) => {
                tracing::debug!(path = %path, "No secret stored at path");
                Ok(None)
            }
            Err(e) => {
                tracing::error!(error = %e, path = %path, "Failed to read secret from Vault");
                Err(map_client_error("read", path, e))
            }
        }
    }

    async fn write(&self, path: &str, value: SecretValue) -> Result<()> {
        let (mount, key) = split_kv2_path(path)?;

        let document = match value {
            SecretValue::Json(document) => document,
            SecretValue::Binary(_) => {
                return Err(SecretsError::invalid_value(
                    "Vault KV v2 only stores JSON documents; use the text codec",
                ))
            }
        };
        let content = match document.get("data") {
            Some(content @ Value::Object(_)) => content,
            _ => {
                return Err(SecretsError::invalid_value(
                    "KV v2 documents must carry an object under 'data'",
                ))
            }
        };

        let metadata = kv2::set(&self.client, mount, key, content).await.map_err(|e| {
            tracing::error!(error = %e, path = %path, "Failed to write secret to Vault");
            map_client_error("write", path, e)
        })?;

        tracing::debug!(path = %path, version = metadata.version, "Stored secret in Vault");
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus> {
        match vaultrs::sys::health(&self.client).await {
            Ok(response) => Ok(HealthStatus {
                initialized: response.initialized,
                sealed: response.sealed,
                standby: response.standby,
                version: response.version,
            }),
            Err(e) => match health_from_status_response(&e) {
                Some(status) => Ok(status),
                None => {
                    tracing::error!(error = %e, address = %self.address, "Failed to check Vault health");
                    Err(SecretsError::connection_failed(format!("Vault health check failed: {}", e)))
                }
            },
        }
    }
}

/// Opens a [`VaultSecretStore`] per request, authenticated with the
/// request's own token.
#[derive(Debug, Clone)]
pub struct VaultSessionFactory {
    config: VaultConfig,
}

impl VaultSessionFactory {
    pub fn new(address: impl Into<String>, namespace: Option<String>) -> Self {
        Self { config: VaultConfig { address: address.into(), token: None, namespace } }
    }
}

impl SessionFactory for VaultSessionFactory {
    fn open(&self, token: &SecretString) -> Result<Arc<dyn SecretStore>> {
        let store = VaultSecretStore::new(&self.config.with_token(token.clone()))?;
        Ok(Arc::new(store))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_vault_config_default() {
        let config = VaultConfig::default();
        assert_eq!(config.address, "http://127.0.0.1:8200");
        assert!(config.token.is_none());
        assert!(config.namespace.is_none());
    }

    #[test]
    fn test_vault_config_serialization_redacts_token() {
        let config = VaultConfig::default().with_token(SecretString::new("hvs.token"));
        let json = serde_json::to_string(&config).unwrap();
        assert!(json.contains("[REDACTED]"));
        assert!(!json.contains("hvs.token"));
    }

    #[test]
    fn test_split_kv2_path_default() {
        assert_eq!(split_kv2_path("secret/data/tfstate").unwrap(), ("secret", "tfstate"));
    }

    #[test]
    fn test_split_kv2_path_nested() {
        assert_eq!(
            split_kv2_path("/kv/team-a/data/envs/prod/").unwrap(),
            ("kv/team-a", "envs/prod")
        );
    }

    #[test]
    fn test_split_kv2_path_rejects_kv1_style() {
        let err = split_kv2_path("secret/tfstate").unwrap_err();
        assert!(matches!(err, SecretsError::InvalidKey { .. }));
    }

    #[test]
    fn test_split_kv2_path_rejects_empty_key() {
        assert!(split_kv2_path("secret/data/").is_err());
        assert!(split_kv2_path("/data/tfstate").is_err());
    }

    #[test]
    fn test_new_rejects_empty_address() {
        let config = VaultConfig { address: String::new(), ..Default::default() };
        let err = VaultSecretStore::new(&config).unwrap_err();
        assert!(matches!(err, SecretsError::ConfigError { .. }));
    }

    #[tokio::test]
    async fn test_write_rejects_binary_values() {
        let store = VaultSecretStore::new(&VaultConfig::default()).unwrap();
        assert!(!store.supports_binary());

        let err = store
            .write("secret/data/tfstate", SecretValue::Binary(Bytes::from_static(b"raw")))
            .await
            .unwrap_err();
        assert!(matches!(err, SecretsError::InvalidValue { .. }));
    }

    #[tokio::test]
    async fn test_write_rejects_document_without_data_object() {
        let store = VaultSecretStore::new(&VaultConfig::default()).unwrap();
        let err = store
            .write("secret/data/tfstate", SecretValue::Json(json!({ "data": "flat" })))
            .await
            .unwrap_err();
        assert!(matches!(err, SecretsError::InvalidValue { .. }));
    }

    #[test]
    fn test_session_factory_opens_store() {
        let factory = VaultSessionFactory::new("http://127.0.0.1:8200", None);
        let store = factory.open(&SecretString::new("hvs.request")).unwrap();
        assert_eq!(store.backend_name(), "vault");
    }
}
