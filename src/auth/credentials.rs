//! Resolution of the token presented to the secret store.
//!
//! Resolution order, first match wins:
//! 1. `VAULT_TOKEN` from the environment
//! 2. the password of an inbound `Authorization: Basic` header
//! 3. the trimmed contents of `$HOME/.vault-token`

use std::fmt;
use std::path::{Path, PathBuf};

use axum::http::{header::AUTHORIZATION, HeaderMap};
use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::debug;

use crate::secrets::SecretString;

/// Environment variable holding a static backend token.
pub const ENV_VAULT_TOKEN: &str = "VAULT_TOKEN";

/// Token file name, relative to the home directory.
pub const TOKEN_FILE_NAME: &str = ".vault-token";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("no token available: VAULT_TOKEN is unset and HOME is unknown")]
    NoHomeDirectory,

    #[error("there is no such file: {}", path.display())]
    MissingTokenFile { path: PathBuf },

    #[error("token path is not a regular file: {}", path.display())]
    NotAFile { path: PathBuf },

    #[error("couldn't read token file {}: {source}", path.display())]
    UnreadableTokenFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("token file is empty: {}", path.display())]
    EmptyTokenFile { path: PathBuf },

    #[error("malformed Authorization header: {0}")]
    MalformedAuthorization(String),
}

/// Where a credential came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialSource {
    Environment,
    BasicAuth,
    TokenFile,
}

impl fmt::Display for CredentialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialSource::Environment => write!(f, "environment"),
            CredentialSource::BasicAuth => write!(f, "basic_auth"),
            CredentialSource::TokenFile => write!(f, "token_file"),
        }
    }
}

/// A bearer token for the secret store. Never persisted by the gateway.
#[derive(Debug, Clone)]
pub struct Credential {
    token: SecretString,
    source: CredentialSource,
}

impl Credential {
    pub fn new(token: SecretString, source: CredentialSource) -> Self {
        Self { token, source }
    }

    pub fn token(&self) -> &SecretString {
        &self.token
    }

    pub fn source(&self) -> CredentialSource {
        self.source
    }

    /// Request-scoped credentials must not outlive the request.
    pub fn is_request_scoped(&self) -> bool {
        self.source == CredentialSource::BasicAuth
    }
}

/// Credentials from an `Authorization: Basic` header.
#[derive(Debug, Clone)]
pub struct BasicCredentials {
    pub username: String,
    password: SecretString,
}

impl BasicCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<SecretString>) -> Self {
        Self { username: username.into(), password: password.into() }
    }

    pub fn password(&self) -> &SecretString {
        &self.password
    }

    /// Parse the `Authorization` header.
    ///
    /// Returns `Ok(None)` when the header is absent or uses another scheme.
    pub fn from_headers(headers: &HeaderMap) -> Result<Option<Self>, CredentialError> {
        let Some(value) = headers.get(AUTHORIZATION) else {
            return Ok(None);
        };
        let value = value.to_str().map_err(|_| {
            CredentialError::MalformedAuthorization("header is not valid ASCII".into())
        })?;

        let Some((scheme, encoded)) = value.trim().split_once(' ') else {
            return Ok(None);
        };
        if !scheme.eq_ignore_ascii_case("basic") {
            return Ok(None);
        }

        let decoded = STANDARD
            .decode(encoded.trim())
            .map_err(|e| CredentialError::MalformedAuthorization(format!("invalid base64: {e}")))?;
        let decoded = String::from_utf8(decoded).map_err(|_| {
            CredentialError::MalformedAuthorization("credentials are not UTF-8".into())
        })?;
        let (username, password) = decoded.split_once(':').ok_or_else(|| {
            CredentialError::MalformedAuthorization("missing ':' separator".into())
        })?;

        Ok(Some(Self::new(username, password)))
    }
}

/// Finds the token to present to the secret store.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    env_token: Option<SecretString>,
    token_file: Option<PathBuf>,
}

impl CredentialResolver {
    pub fn new(env_token: Option<SecretString>, token_file: Option<PathBuf>) -> Self {
        Self { env_token: env_token.filter(|t| !t.is_empty()), token_file }
    }

    /// Build from `VAULT_TOKEN` and `$HOME/.vault-token`.
    pub fn from_env() -> Self {
        let env_token = std::env::var(ENV_VAULT_TOKEN).ok().map(SecretString::new);
        let token_file = std::env::var_os("HOME").map(|home| PathBuf::from(home).join(TOKEN_FILE_NAME));
        Self::new(env_token, token_file)
    }

    pub fn token_file(&self) -> Option<&Path> {
        self.token_file.as_deref()
    }

    pub fn has_env_token(&self) -> bool {
        self.env_token.is_some()
    }

    /// Resolve a credential, consulting `basic` only when no environment
    /// token is configured.
    pub fn resolve(&self, basic: Option<&BasicCredentials>) -> Result<Credential, CredentialError> {
        if let Some(token) = &self.env_token {
            debug!("Using backend token from {}", ENV_VAULT_TOKEN);
            return Ok(Credential::new(token.clone(), CredentialSource::Environment));
        }

        if let Some(basic) = basic {
            debug!(username = %basic.username, "Using Basic-Auth password as backend token");
            return Ok(Credential::new(basic.password.clone(), CredentialSource::BasicAuth));
        }

        let path = self.token_file.as_deref().ok_or(CredentialError::NoHomeDirectory)?;
        let token = read_token_file(path)?;
        debug!(path = %path.display(), "Using backend token from file");
        Ok(Credential::new(token, CredentialSource::TokenFile))
    }
}

fn read_token_file(path: &Path) -> Result<SecretString, CredentialError> {
    let metadata = match std::fs::metadata(path) {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(CredentialError::MissingTokenFile { path: path.to_path_buf() })
        }
        Err(source) => {
            return Err(CredentialError::UnreadableTokenFile { path: path.to_path_buf(), source })
        }
    };
    if !metadata.is_file() {
        return Err(CredentialError::NotAFile { path: path.to_path_buf() });
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|source| CredentialError::UnreadableTokenFile { path: path.to_path_buf(), source })?;
    let token = contents.trim();
    if token.is_empty() {
        return Err(CredentialError::EmptyTokenFile { path: path.to_path_buf() });
    }

    Ok(SecretString::new(token))
}
