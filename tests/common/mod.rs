#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header::AUTHORIZATION, Request, Response},
    Router,
};
use base64::{engine::general_purpose::STANDARD, Engine};
use bytes::Bytes;
use tfstate_gateway::{
    api::{build_router, AppState, BackendSession},
    secrets::{
        HealthStatus, MemorySecretStore, Result, SecretStore, SecretString, SecretValue,
        SecretsError, SessionFactory,
    },
    state::StateCodec,
};
use tower::ServiceExt;

pub const STATE_PATH: &str = "secret/data/tfstate";
pub const USERS_PATH: &str = "secret/data/tfstate-users";

/// In-memory store that counts calls per path and can be told to fail.
#[derive(Default)]
pub struct RecordingStore {
    inner: MemorySecretStore,
    binary: bool,
    reads: Mutex<HashMap<String, usize>>,
    writes: Mutex<HashMap<String, usize>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that accepts binary values, like the memory backend.
    pub fn binary() -> Self {
        Self { binary: true, ..Self::default() }
    }

    pub fn with_entry(mut self, path: &str, value: SecretValue) -> Self {
        self.inner = self.inner.with_entry(path, value);
        self
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn reads(&self, path: &str) -> usize {
        self.reads.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn writes(&self, path: &str) -> usize {
        self.writes.lock().unwrap().get(path).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.reads.lock().unwrap().values().sum::<usize>()
            + self.writes.lock().unwrap().values().sum::<usize>()
    }

    pub async fn stored(&self, path: &str) -> Option<SecretValue> {
        self.inner.read(path).await.unwrap()
    }
}

#[async_trait]
impl SecretStore for RecordingStore {
    fn backend_name(&self) -> &'static str {
        "recording"
    }

    async fn read(&self, path: &str) -> Result<Option<SecretValue>> {
        *self.reads.lock().unwrap().entry(path.to_string()).or_default() += 1;
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(SecretsError::connection_failed("injected read failure"));
        }
        self.inner.read(path).await
    }

    async fn write(&self, path: &str, value: SecretValue) -> Result<()> {
        *self.writes.lock().unwrap().entry(path.to_string()).or_default() += 1;
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SecretsError::backend_error("injected write failure"));
        }
        self.inner.write(path, value).await
    }

    async fn health(&self) -> Result<HealthStatus> {
        self.inner.health().await
    }

    fn supports_binary(&self) -> bool {
        self.binary
    }
}

/// Session factory handing out one shared store and remembering the tokens
/// it was asked to open sessions with.
pub struct RecordingFactory {
    pub store: Arc<RecordingStore>,
    tokens: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl RecordingFactory {
    pub fn new(store: Arc<RecordingStore>) -> Self {
        Self { store, tokens: Mutex::new(Vec::new()), fail: AtomicBool::new(false) }
    }

    pub fn fail_open(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn tokens(&self) -> Vec<String> {
        self.tokens.lock().unwrap().clone()
    }
}

impl SessionFactory for RecordingFactory {
    fn open(&self, token: &SecretString) -> Result<Arc<dyn SecretStore>> {
        self.tokens.lock().unwrap().push(token.expose_secret().to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(SecretsError::connection_failed("injected session failure"));
        }
        Ok(self.store.clone())
    }

    fn supports_binary(&self) -> bool {
        self.store.supports_binary()
    }
}

/// Router over a shared recording store with the text codec.
pub fn shared_app(store: Arc<RecordingStore>) -> Router {
    let state = AppState::new(BackendSession::shared(store), StateCodec::TextSafe, STATE_PATH);
    build_router(state)
}

pub fn basic_auth(username: &str, password: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password)))
}

pub async fn send(
    app: &Router,
    method: &str,
    path: &str,
    authorization: Option<&str>,
    body: impl Into<Body>,
) -> Response<Body> {
    let mut builder = Request::builder().method(method).uri(path);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    let request = builder.body(body.into()).expect("build request");
    app.clone().oneshot(request).await.expect("router response")
}

pub async fn read_body(response: Response<Body>) -> Bytes {
    to_bytes(response.into_body(), usize::MAX).await.expect("read body")
}
