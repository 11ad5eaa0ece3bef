//! Startup wiring: turns a validated [`Config`] into the router state.
//!
//! | Auth mode | Backend session | Credential |
//! |---|---|---|
//! | `none` | shared | resolved once (env, then token file) |
//! | `passthrough` | per request | resolved per request (env, Basic-Auth, token file) |
//! | `userpass` | shared | resolved once; requests gated by the user record |

use std::sync::Arc;

use tracing::{info, warn};

use crate::api::{AccessGate, AppState, BackendSession};
use crate::auth::{CredentialResolver, UserDirectory};
use crate::config::{AuthMode, BackendKind, Config};
use crate::errors::{Error, Result};
use crate::secrets::{
    MemorySecretStore, MemorySessionFactory, SecretStore, VaultConfig, VaultSecretStore,
    VaultSessionFactory,
};
use crate::state::StateCodec;

/// Build the router state. Every error here is fatal to startup.
pub async fn build_app_state(config: &Config, resolver: CredentialResolver) -> Result<AppState> {
    config.validate()?;

    info!(
        path = %config.state.secret_path,
        backend = %config.vault.backend,
        codec = %config.state.codec,
        auth_mode = %config.auth.mode,
        "tfstate stored at"
    );

    let backend = match config.vault.backend {
        BackendKind::Memory => memory_session(config.auth.mode, resolver),
        BackendKind::Vault => vault_session(config, resolver).await?,
    };

    if config.state.codec == StateCodec::BinaryDirect && !backend.supports_binary() {
        return Err(Error::config(format!(
            "codec '{}' requires a backend that stores binary values",
            config.state.codec
        )));
    }

    let mut state = AppState::new(backend, config.state.codec, config.state.secret_path.as_str());

    if config.auth.mode == AuthMode::UserPass {
        let BackendSession::Shared(store) = &state.backend else {
            return Err(Error::internal("user/password access requires a shared backend session"));
        };
        let gate = AccessGate::new(UserDirectory::new(&config.auth.users_path), Arc::clone(store));
        info!(users_path = %config.auth.users_path, "Basic-Auth access gate enabled");
        state = state.with_access(gate);
    }

    Ok(state)
}

fn memory_session(mode: AuthMode, resolver: CredentialResolver) -> BackendSession {
    warn!("Using the in-memory backend; state is lost on restart");
    let store = Arc::new(MemorySecretStore::new());
    match mode {
        AuthMode::Passthrough => {
            BackendSession::per_request(resolver, Arc::new(MemorySessionFactory::new(store)))
        }
        AuthMode::None | AuthMode::UserPass => BackendSession::shared(store),
    }
}

async fn vault_session(config: &Config, resolver: CredentialResolver) -> Result<BackendSession> {
    let vault = VaultConfig {
        address: config.vault.address.clone(),
        token: None,
        namespace: config.vault.namespace.clone(),
    };

    match config.auth.mode {
        AuthMode::Passthrough => {
            if resolver.has_env_token() {
                warn!("VAULT_TOKEN is set; it is used for every request instead of Basic-Auth passwords");
            }
            if config.vault.health_check {
                // sys/health needs no token
                let tokenless = VaultSecretStore::new(&vault)?;
                check_health(&tokenless).await?;
            }
            let factory = VaultSessionFactory::new(vault.address, vault.namespace);
            Ok(BackendSession::per_request(resolver, Arc::new(factory)))
        }
        AuthMode::None | AuthMode::UserPass => {
            let credential = resolver.resolve(None)?;
            info!(source = %credential.source(), "Resolved Vault token");

            let store = VaultSecretStore::new(&vault.with_token(credential.token().clone()))?;
            if config.vault.health_check {
                check_health(&store).await?;
            }
            Ok(BackendSession::shared(Arc::new(store)))
        }
    }
}

/// Check backend health and log its version.
pub async fn check_health(store: &dyn SecretStore) -> Result<()> {
    let status = store.health().await.map_err(|e| {
        tracing::error!(error = %e, backend = store.backend_name(), "Failed to check backend health");
        Error::from(e)
    })?;

    if status.sealed {
        warn!(version = %status.version, "Vault reports it is sealed");
    }
    info!(
        backend = store.backend_name(),
        version = %status.version,
        initialized = status.initialized,
        standby = status.standby,
        "Backend is healthy"
    );
    Ok(())
}
