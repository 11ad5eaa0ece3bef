//! Core secret store trait and value types.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;

use super::error::Result;
use super::types::SecretString;

/// The logical document stored at a backend path.
///
/// JSON-only backends hold [`SecretValue::Json`]; backends that accept
/// non-text values may also hold [`SecretValue::Binary`].
#[derive(Debug, Clone, PartialEq)]
pub enum SecretValue {
    /// A JSON document, e.g. `{"data": {"data": "<base64>"}}`.
    Json(serde_json::Value),
    /// Raw bytes stored without any encoding.
    Binary(Bytes),
}

/// Result of a backend health check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub initialized: bool,
    pub sealed: bool,
    pub standby: bool,
    pub version: String,
}

/// Backend capability consumed by the gateway.
///
/// Implementations own durability and consistency of the stored entries.
/// No locking or compare-and-swap is expected: concurrent writers race and the
/// backend's last-write-wins semantics decide.
///
/// # Security
///
/// Implementations MUST NOT log stored values.
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// Short backend name used in logs.
    fn backend_name(&self) -> &'static str;

    /// Read the document stored at `path`.
    ///
    /// Returns `Ok(None)` when nothing is stored there.
    async fn read(&self, path: &str) -> Result<Option<SecretValue>>;

    /// Replace the document stored at `path`.
    async fn write(&self, path: &str, value: SecretValue) -> Result<()>;

    /// Check backend health.
    async fn health(&self) -> Result<HealthStatus>;

    /// Whether [`SecretValue::Binary`] can be written.
    fn supports_binary(&self) -> bool {
        false
    }
}

/// Opens a backend session bound to a request-scoped token.
///
/// The returned store lives for one request and is dropped with the response,
/// so the token is never cached by the gateway.
pub trait SessionFactory: Send + Sync {
    /// Build a store that authenticates with `token`.
    fn open(&self, token: &SecretString) -> Result<Arc<dyn SecretStore>>;

    /// Whether stores opened by this factory accept binary values.
    fn supports_binary(&self) -> bool {
        false
    }
}
