//! Credential Resolution Pipeline
//!
//! Rebuilds the secrets of a saved profile from the secret store, fetching
//! only the kinds its `saved_auth_type` names, and merges them with the
//! profile's non-secret fields into a [`ConnectionConfig`].

pub mod resolver;

pub use resolver::{
    ConnectionConfig, CredentialError, CredentialResolver, ProfileSource, ResolvedCredentials,
};
