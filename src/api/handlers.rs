//! The state endpoint.
//!
//! Order of checks for every request:
//! 1. the Basic-Auth gate, when configured
//! 2. method dispatch; anything but GET and POST is answered with 405
//! 3. backend session, shared or opened for this request
//! 4. the state read or write

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    extract::State,
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
};
use tracing::{debug, error, info, warn};

use super::error::ApiError;
use super::routes::{AccessGate, AppState, BackendSession};
use crate::auth::{AuthError, BasicCredentials};
use crate::secrets::SecretStore;
use crate::state::DecodedState;

const UNAUTHORIZED_MESSAGE: &str = "valid credentials are required";

pub async fn handle_state(
    State(state): State<AppState>,
    method: Method,
    headers: HeaderMap,
    body: Body,
) -> Result<Response, ApiError> {
    let basic = match BasicCredentials::from_headers(&headers) {
        Ok(basic) => basic,
        Err(e) if state.requires_credentials() => {
            return Err(reject(&AuthError::Malformed(e)));
        }
        Err(e) => {
            debug!(error = %e, "Ignoring malformed Authorization header");
            None
        }
    };

    if let Some(gate) = &state.access {
        check_access(&state, gate, basic.as_ref()).await?;
    }

    match method.as_str() {
        "POST" => {
            let store = open_session(&state, basic.as_ref())?;
            write_state(&state, store.as_ref(), body).await
        }
        "GET" => {
            let store = open_session(&state, basic.as_ref())?;
            read_state(&state, store.as_ref()).await
        }
        "LOCK" | "UNLOCK" => {
            debug!(method = %method, "State locking is not supported");
            Err(ApiError::MethodNotAllowed)
        }
        other => {
            debug!(method = %other, "Method not allowed");
            Err(ApiError::MethodNotAllowed)
        }
    }
}

async fn check_access(
    state: &AppState,
    gate: &AccessGate,
    basic: Option<&BasicCredentials>,
) -> Result<(), ApiError> {
    match gate.directory.authenticate(gate.store.as_ref(), basic).await {
        Ok(username) => {
            debug!(username = %username, "Access granted");
            Ok(())
        }
        Err(e) if e.is_rejection() => Err(reject(&e)),
        Err(e) => {
            state.metrics.record_backend_error("auth");
            error!(error = %e, path = %gate.directory.path(), "Couldn't verify credentials");
            Err(ApiError::Internal("failed to verify credentials".to_string()))
        }
    }
}

fn reject(err: &AuthError) -> ApiError {
    warn!(error = %err, "Rejected request");
    ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
}

fn open_session(
    state: &AppState,
    basic: Option<&BasicCredentials>,
) -> Result<Arc<dyn SecretStore>, ApiError> {
    match &state.backend {
        BackendSession::Shared(store) => Ok(Arc::clone(store)),
        BackendSession::PerRequest { resolver, factory } => {
            let credential = resolver.resolve(basic).map_err(|e| {
                warn!(error = %e, "No backend credential for request");
                ApiError::Unauthorized(UNAUTHORIZED_MESSAGE.to_string())
            })?;
            debug!(source = %credential.source(), "Opening per-request backend session");
            factory.open(credential.token()).map_err(|e| {
                state.metrics.record_backend_error("session");
                error!(error = %e, "Couldn't open backend session");
                ApiError::Internal("failed to open backend session".to_string())
            })
        }
    }
}

async fn write_state(
    state: &AppState,
    store: &dyn SecretStore,
    body: Body,
) -> Result<Response, ApiError> {
    let blob = to_bytes(body, usize::MAX).await.map_err(|e| {
        error!(error = %e, "Couldn't read request body");
        ApiError::Internal("failed to read request body".to_string())
    })?;

    let value = state.codec.encode(&blob);
    store.write(&state.secret_path, value).await.map_err(|e| {
        state.metrics.record_backend_error("write");
        error!(error = %e, path = %state.secret_path, "Couldn't write state");
        ApiError::Internal("failed to write state".to_string())
    })?;

    info!(path = %state.secret_path, size = blob.len(), "wrote state");
    Ok(StatusCode::OK.into_response())
}

async fn read_state(state: &AppState, store: &dyn SecretStore) -> Result<Response, ApiError> {
    let stored = store.read(&state.secret_path).await.map_err(|e| {
        state.metrics.record_backend_error("read");
        error!(error = %e, path = %state.secret_path, "Couldn't read state");
        ApiError::Internal("failed to read state".to_string())
    })?;

    match state.codec.decode(stored) {
        DecodedState::Absent => {
            debug!(path = %state.secret_path, "No state stored yet");
            Ok(StatusCode::OK.into_response())
        }
        DecodedState::Present(blob) => {
            debug!(path = %state.secret_path, size = blob.len(), "read state");
            Ok((
                [(header::CONTENT_TYPE, HeaderValue::from_static("application/octet-stream"))],
                blob,
            )
                .into_response())
        }
        DecodedState::Malformed(e) => {
            error!(error = %e, path = %state.secret_path, "Stored state is malformed");
            Err(ApiError::Internal("stored state is malformed".to_string()))
        }
    }
}
