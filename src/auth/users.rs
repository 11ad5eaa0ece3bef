//! Basic-Auth access gate backed by a user record in the secret store.
//!
//! The record lives at a configurable KV v2 path and maps usernames to
//! passwords:
//!
//! ```json
//! {"data": {"alice": "secret", "bob": "$argon2id$v=19$m=19456,t=2,p=1$..."}}
//! ```
//!
//! Values starting with `$argon2` are verified as PHC hashes, anything else
//! is compared as a plain password.

use argon2::{Argon2, PasswordHash, PasswordVerifier};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::warn;

use super::credentials::{BasicCredentials, CredentialError};
use crate::secrets::{SecretStore, SecretValue, SecretsError};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Basic-Auth credentials")]
    MissingCredentials,

    #[error(transparent)]
    Malformed(#[from] CredentialError),

    #[error("unknown user '{0}'")]
    UnknownUser(String),

    #[error("invalid password for user '{0}'")]
    InvalidPassword(String),

    #[error("user record at {path} is malformed")]
    InvalidUserRecord { path: String },

    #[error("failed to read user record: {0}")]
    Backend(#[from] SecretsError),
}

impl AuthError {
    /// Whether the caller is at fault (401) rather than the server (500).
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::MissingCredentials
                | AuthError::Malformed(_)
                | AuthError::UnknownUser(_)
                | AuthError::InvalidPassword(_)
        )
    }
}

/// Validates inbound Basic-Auth credentials against the stored user record.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    path: String,
}

impl UserDirectory {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Authenticate `credentials`, returning the username on success.
    ///
    /// Missing credentials are rejected before the store is touched.
    pub async fn authenticate(
        &self,
        store: &dyn SecretStore,
        credentials: Option<&BasicCredentials>,
    ) -> Result<String, AuthError> {
        let credentials = credentials.ok_or(AuthError::MissingCredentials)?;

        let stored = match store.read(&self.path).await? {
            Some(SecretValue::Json(document)) => document,
            Some(SecretValue::Binary(_)) => {
                return Err(AuthError::InvalidUserRecord { path: self.path.clone() })
            }
            None => {
                warn!(path = %self.path, "No user record stored, rejecting all users");
                return Err(AuthError::UnknownUser(credentials.username.clone()));
            }
        };

        let users = stored
            .get("data")
            .and_then(|data| data.as_object())
            .ok_or_else(|| AuthError::InvalidUserRecord { path: self.path.clone() })?;

        let expected = users
            .get(&credentials.username)
            .and_then(|value| value.as_str())
            .ok_or_else(|| AuthError::UnknownUser(credentials.username.clone()))?;

        if verify_password(expected, credentials.password().expose_secret()) {
            Ok(credentials.username.clone())
        } else {
            Err(AuthError::InvalidPassword(credentials.username.clone()))
        }
    }
}

fn verify_password(expected: &str, presented: &str) -> bool {
    if expected.starts_with("$argon2") {
        return match PasswordHash::new(expected) {
            Ok(hash) => Argon2::default().verify_password(presented.as_bytes(), &hash).is_ok(),
            Err(e) => {
                warn!(error = %e, "Stored password hash is not a valid PHC string");
                false
            }
        };
    }

    // Compare digests so the comparison time does not depend on the common prefix.
    Sha256::digest(expected.as_bytes()) == Sha256::digest(presented.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};
    use serde_json::json;

    const USERS_PATH: &str = "secret/data/tfstate-users";

    fn store_with_users(users: serde_json::Value) -> MemorySecretStore {
        MemorySecretStore::new().with_entry(USERS_PATH, SecretValue::Json(json!({ "data": users })))
    }

    #[tokio::test]
    async fn test_valid_plain_password() {
        let store = store_with_users(json!({ "alice": "secret" }));
        let directory = UserDirectory::new(USERS_PATH);
        let basic = BasicCredentials::new("alice", "secret");

        assert_eq!(directory.authenticate(&store, Some(&basic)).await.unwrap(), "alice");
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let store = store_with_users(json!({ "alice": "secret" }));
        let directory = UserDirectory::new(USERS_PATH);
        let basic = BasicCredentials::new("alice", "wrong");

        let err = directory.authenticate(&store, Some(&basic)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidPassword(ref user) if user == "alice"));
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_unknown_user_rejected() {
        let store = store_with_users(json!({ "alice": "secret" }));
        let directory = UserDirectory::new(USERS_PATH);
        let basic = BasicCredentials::new("mallory", "secret");

        let err = directory.authenticate(&store, Some(&basic)).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownUser(_)));
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected() {
        let store = store_with_users(json!({ "alice": "secret" }));
        let directory = UserDirectory::new(USERS_PATH);

        let err = directory.authenticate(&store, None).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingCredentials));
    }

    #[tokio::test]
    async fn test_missing_record_rejects_everyone() {
        let store = MemorySecretStore::new();
        let directory = UserDirectory::new(USERS_PATH);
        let basic = BasicCredentials::new("alice", "secret");

        let err = directory.authenticate(&store, Some(&basic)).await.unwrap_err();
        assert!(err.is_rejection());
    }

    #[tokio::test]
    async fn test_malformed_record_is_server_error() {
        let store = MemorySecretStore::new()
            .with_entry(USERS_PATH, SecretValue::Json(json!({ "data": "alice:secret" })));
        let directory = UserDirectory::new(USERS_PATH);
        let basic = BasicCredentials::new("alice", "secret");

        let err = directory.authenticate(&store, Some(&basic)).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidUserRecord { .. }));
        assert!(!err.is_rejection());
    }

    #[tokio::test]
    async fn test_argon2_hashed_password() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default().hash_password(b"secret", &salt).unwrap().to_string();
        let store = store_with_users(json!({ "alice": hash }));
        let directory = UserDirectory::new(USERS_PATH);

        let ok = BasicCredentials::new("alice", "secret");
        assert!(directory.authenticate(&store, Some(&ok)).await.is_ok());

        let bad = BasicCredentials::new("alice", "wrong");
        assert!(directory.authenticate(&store, Some(&bad)).await.is_err());
    }
}
