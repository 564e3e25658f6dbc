use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};
use zeroize::Zeroize;

use crate::backend::{SecretStore, SecretStoreError};
use crate::config::{ConnectionKind, ConnectionProfile, SavedAuthType, SecretKind};

#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("Profile not found: {0}")]
    ProfileNotFound(String),

    #[error("Profile {profile_id} is a {found} connection, expected {expected}")]
    KindMismatch {
        profile_id: String,
        expected: ConnectionKind,
        found: ConnectionKind,
    },

    #[error("Secret store error: {0}")]
    SecretStore(#[from] SecretStoreError),
}

impl serde::Serialize for CredentialError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Lookup of saved profiles by id
pub trait ProfileSource: Send + Sync {
    fn profile(&self, id: &str) -> Option<ConnectionProfile>;
}

/// Secrets fetched for one connection attempt. Never persisted; wiped on drop.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedCredentials {
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
}

impl ResolvedCredentials {
    fn slot(&mut self, kind: SecretKind) -> &mut Option<String> {
        match kind {
            SecretKind::Password => &mut self.password,
            SecretKind::PrivateKey => &mut self.private_key,
            SecretKind::Passphrase => &mut self.passphrase,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.password.is_none() && self.private_key.is_none() && self.passphrase.is_none()
    }
}

impl Drop for ResolvedCredentials {
    fn drop(&mut self) {
        for secret in [&mut self.password, &mut self.private_key, &mut self.passphrase] {
            if let Some(value) = secret.as_mut() {
                value.zeroize();
            }
        }
    }
}

// Never print secret material
impl fmt::Debug for ResolvedCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = |s: &Option<String>| if s.is_some() { "<set>" } else { "<none>" };
        f.debug_struct("ResolvedCredentials")
            .field("password", &mark(&self.password))
            .field("private_key", &mark(&self.private_key))
            .field("passphrase", &mark(&self.passphrase))
            .finish()
    }
}

/// Everything needed to open a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub profile_id: String,
    pub kind: ConnectionKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub key_path: Option<String>,
    pub remote_path: Option<String>,
    pub credentials: ResolvedCredentials,
}

impl ConnectionConfig {
    pub fn from_profile(profile: &ConnectionProfile, credentials: ResolvedCredentials) -> Self {
        Self {
            profile_id: profile.id.clone(),
            kind: profile.kind,
            host: profile.host.clone(),
            port: profile.port,
            username: profile.username.clone(),
            key_path: profile.key_path.clone(),
            remote_path: profile.remote_path.clone(),
            credentials,
        }
    }
}

pub struct CredentialResolver {
    profiles: Arc<dyn ProfileSource>,
    secrets: Arc<dyn SecretStore>,
}

impl CredentialResolver {
    pub fn new(profiles: Arc<dyn ProfileSource>, secrets: Arc<dyn SecretStore>) -> Self {
        Self { profiles, secrets }
    }

    /// Resolve a profile into a connection config.
    ///
    /// Missing secrets resolve to `None`; only an unknown profile, a kind
    /// mismatch, or a failing secret store abort the attempt. A profile
    /// without a tag is treated as interactive.
    pub async fn resolve(
        &self,
        profile_id: &str,
        expected_kind: ConnectionKind,
    ) -> Result<ConnectionConfig, CredentialError> {
        let profile = self
            .profiles
            .profile(profile_id)
            .ok_or_else(|| CredentialError::ProfileNotFound(profile_id.to_string()))?;

        if profile.kind != expected_kind {
            warn!(
                "Profile {} is {} but {} was requested",
                profile_id, profile.kind, expected_kind
            );
            return Err(CredentialError::KindMismatch {
                profile_id: profile_id.to_string(),
                expected: expected_kind,
                found: profile.kind,
            });
        }

        let auth_type = profile.saved_auth_type.unwrap_or(SavedAuthType::Interactive);
        let mut credentials = ResolvedCredentials::default();
        for &kind in auth_type.secret_kinds() {
            let value = self.secrets.get_secret(profile_id, profile.kind, kind).await?;
            match &value {
                Some(v) => debug!("Resolved {} for {} (len={})", kind, profile_id, v.len()),
                None => debug!("No stored {} for {}", kind, profile_id),
            }
            *credentials.slot(kind) = value;
        }

        info!(
            "Resolved credentials for {} ({:?}, {} secret kinds)",
            profile_id,
            auth_type,
            auth_type.secret_kinds().len()
        );
        Ok(ConnectionConfig::from_profile(&profile, credentials))
    }
}
