//! In-process secret store.
//!
//! Development backend (`TFSTATE_BACKEND=memory`). Contents are lost on
//! restart. Unlike Vault it accepts [`SecretValue::Binary`].

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::error::Result;
use super::store::{HealthStatus, SecretStore, SecretValue, SessionFactory};
use super::types::SecretString;

#[derive(Debug, Default)]
pub struct MemorySecretStore {
    entries: RwLock<HashMap<String, SecretValue>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an entry, e.g. user records for the access gate.
    pub fn with_entry(mut self, path: impl Into<String>, value: SecretValue) -> Self {
        self.entries.get_mut().insert(path.into(), value);
        self
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl SecretStore for MemorySecretStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn read(&self, path: &str) -> Result<Option<SecretValue>> {
        Ok(self.entries.read().await.get(path).cloned())
    }

    async fn write(&self, path: &str, value: SecretValue) -> Result<()> {
        self.entries.write().await.insert(path.to_string(), value);
        Ok(())
    }

    async fn health(&self) -> Result<HealthStatus> {
        Ok(HealthStatus {
            initialized: true,
            sealed: false,
            standby: false,
            version: format!("memory-{}", crate::VERSION),
        })
    }

    fn supports_binary(&self) -> bool {
        true
    }
}

/// Hands out the same shared [`MemorySecretStore`] whatever the token.
#[derive(Debug, Clone)]
pub struct MemorySessionFactory {
    store: Arc<MemorySecretStore>,
}

impl MemorySessionFactory {
    pub fn new(store: Arc<MemorySecretStore>) -> Self {
        Self { store }
    }
}

impl SessionFactory for MemorySessionFactory {
    fn open(&self, _token: &SecretString) -> Result<Arc<dyn SecretStore>> {
        Ok(self.store.clone())
    }

    fn supports_binary(&self) -> bool {
        true
    }
}
