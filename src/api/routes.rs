use std::sync::Arc;

use axum::{extract::DefaultBodyLimit, middleware, Router};

use super::handlers::handle_state;
use crate::auth::{CredentialResolver, UserDirectory};
use crate::observability::{track_requests, MetricsRecorder};
use crate::secrets::{SecretStore, SessionFactory};
use crate::state::StateCodec;

/// How a request obtains its secret store.
#[derive(Clone)]
pub enum BackendSession {
    /// One store built at startup and shared by every request.
    Shared(Arc<dyn SecretStore>),
    /// A store opened per request with the resolved credential and dropped
    /// with the response.
    PerRequest { resolver: Arc<CredentialResolver>, factory: Arc<dyn SessionFactory> },
}

impl BackendSession {
    pub fn shared(store: Arc<dyn SecretStore>) -> Self {
        Self::Shared(store)
    }

    pub fn per_request(resolver: CredentialResolver, factory: Arc<dyn SessionFactory>) -> Self {
        Self::PerRequest { resolver: Arc::new(resolver), factory }
    }

    pub fn is_per_request(&self) -> bool {
        matches!(self, Self::PerRequest { .. })
    }

    pub fn supports_binary(&self) -> bool {
        match self {
            Self::Shared(store) => store.supports_binary(),
            Self::PerRequest { factory, .. } => factory.supports_binary(),
        }
    }
}

/// Basic-Auth gate checked before any state access.
#[derive(Clone)]
pub struct AccessGate {
    pub directory: Arc<UserDirectory>,
    /// Store holding the user record
    pub store: Arc<dyn SecretStore>,
}

impl AccessGate {
    pub fn new(directory: UserDirectory, store: Arc<dyn SecretStore>) -> Self {
        Self { directory: Arc::new(directory), store }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub backend: BackendSession,
    pub codec: StateCodec,
    pub secret_path: Arc<str>,
    pub access: Option<AccessGate>,
    pub metrics: MetricsRecorder,
}

impl AppState {
    pub fn new(backend: BackendSession, codec: StateCodec, secret_path: impl Into<Arc<str>>) -> Self {
        Self {
            backend,
            codec,
            secret_path: secret_path.into(),
            access: None,
            metrics: MetricsRecorder::new(),
        }
    }

    pub fn with_access(mut self, gate: AccessGate) -> Self {
        self.access = Some(gate);
        self
    }

    /// Whether the request's Basic-Auth credentials are consulted, so a
    /// malformed header must be rejected. A per-request session with an
    /// environment token never reads them.
    pub fn requires_credentials(&self) -> bool {
        self.access.is_some()
            || matches!(
                &self.backend,
                BackendSession::PerRequest { resolver, .. } if !resolver.has_env_token()
            )
    }
}

/// Build the router. Every path is served by the state handler.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(handle_state)
        .layer(DefaultBodyLimit::disable())
        .layer(middleware::from_fn(track_requests))
        .with_state(state)
}
