//! Backend credentials and the optional Basic-Auth access gate.
//!
//! - [`CredentialResolver`] finds the token presented to Vault.
//! - [`UserDirectory`] validates inbound Basic-Auth credentials against a
//!   user record kept in the secret store.

pub mod credentials;
pub mod users;

pub use credentials::{
    BasicCredentials, Credential, CredentialError, CredentialResolver, CredentialSource,
};
pub use users::{AuthError, UserDirectory};
