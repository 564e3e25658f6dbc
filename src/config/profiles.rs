//! Saved connection profiles
//!
//! In-memory snapshot of the config file. Every mutation is written back
//! through [`ConfigStorage`]; secrets go to the [`SecretStore`] and only the
//! resulting [`SavedAuthType`] tag is persisted.

use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};
use zeroize::Zeroize;

use super::storage::{ConfigStorage, StorageError};
use super::types::{AppSettings, ConfigFile, ConnectionProfile, SavedAuthType, SecretKind};
use crate::backend::{SecretStore, SecretStoreError};
use crate::credentials::ProfileSource;

#[derive(Debug, thiserror::Error)]
pub enum ProfileError {
    #[error("Profile not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    SecretStore(#[from] SecretStoreError),
}

impl serde::Serialize for ProfileError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Secrets supplied when saving a profile. Cleared on drop.
#[derive(Default)]
pub struct ProfileSecrets {
    pub password: Option<String>,
    pub private_key: Option<String>,
    pub passphrase: Option<String>,
}

impl ProfileSecrets {
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(password.into()),
            private_key: None,
            passphrase: None,
        }
    }

    pub fn private_key(key: impl Into<String>, passphrase: Option<String>) -> Self {
        Self {
            password: None,
            private_key: Some(key.into()),
            passphrase,
        }
    }

    /// Tag describing which secrets are present
    pub fn auth_type(&self) -> SavedAuthType {
        if self.passphrase.is_some() {
            SavedAuthType::Passphrase
        } else if self.private_key.is_some() {
            SavedAuthType::PrivateKey
        } else if self.password.is_some() {
            SavedAuthType::Password
        } else {
            SavedAuthType::Interactive
        }
    }

    fn get(&self, kind: SecretKind) -> Option<&str> {
        match kind {
            SecretKind::Password => self.password.as_deref(),
            SecretKind::PrivateKey => self.private_key.as_deref(),
            SecretKind::Passphrase => self.passphrase.as_deref(),
        }
    }
}

impl Drop for ProfileSecrets {
    fn drop(&mut self) {
        for secret in [&mut self.password, &mut self.private_key, &mut self.passphrase] {
            if let Some(value) = secret.as_mut() {
                value.zeroize();
            }
        }
    }
}

pub struct ProfileStore {
    storage: ConfigStorage,
    config: RwLock<ConfigFile>,
    secrets: Arc<dyn SecretStore>,
}

impl ProfileStore {
    /// Load the config file and wrap it
    pub async fn load(storage: ConfigStorage, secrets: Arc<dyn SecretStore>) -> Result<Self, StorageError> {
        let config = storage.load().await?;
        info!(
            "Loaded {} connection profiles from {:?}",
            config.connections.len(),
            storage.path()
        );
        Ok(Self {
            storage,
            config: RwLock::new(config),
            secrets,
        })
    }

    pub fn list(&self) -> Vec<ConnectionProfile> {
        self.config.read().connections.clone()
    }

    pub fn get(&self, id: &str) -> Option<ConnectionProfile> {
        self.config
            .read()
            .connections
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    pub fn settings(&self) -> AppSettings {
        self.config.read().settings.clone()
    }

    pub async fn update_settings(&self, settings: AppSettings) -> Result<(), ProfileError> {
        self.config.write().settings = settings;
        self.persist().await
    }

    /// Insert or replace a profile.
    ///
    /// With `secrets`, they replace whatever was stored for the profile and
    /// `saved_auth_type` is derived from them. Without, stored secrets and
    /// the existing tag are kept.
    pub async fn save_profile(
        &self,
        mut profile: ConnectionProfile,
        secrets: Option<ProfileSecrets>,
    ) -> Result<ConnectionProfile, ProfileError> {
        let previous = self.get(&profile.id);

        match secrets {
            Some(secrets) => {
                if let Some(prev) = previous.as_ref().filter(|p| p.kind != profile.kind) {
                    self.delete_secrets(prev).await?;
                }
                for kind in SecretKind::ALL {
                    match secrets.get(kind) {
                        Some(value) => {
                            self.secrets
                                .set_secret(&profile.id, profile.kind, kind, value)
                                .await?
                        }
                        None => self.secrets.delete_secret(&profile.id, profile.kind, kind).await?,
                    }
                }
                profile.saved_auth_type = Some(secrets.auth_type());
            }
            None => {
                profile.saved_auth_type = previous.as_ref().and_then(|p| p.saved_auth_type);
            }
        }

        {
            let mut config = self.config.write();
            match config.connections.iter_mut().find(|p| p.id == profile.id) {
                Some(slot) => *slot = profile.clone(),
                None => config.connections.push(profile.clone()),
            }
        }
        self.persist().await?;
        info!("Saved profile {} ({})", profile.name, profile.id);
        Ok(profile)
    }

    /// Remove a profile and all of its stored secrets
    pub async fn delete_profile(&self, id: &str) -> Result<(), ProfileError> {
        let profile = self
            .get(id)
            .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
        self.delete_secrets(&profile).await?;
        self.config.write().connections.retain(|p| p.id != id);
        self.persist().await?;
        info!("Deleted profile {} ({})", profile.name, id);
        Ok(())
    }

    pub async fn mark_used(&self, id: &str) -> Result<(), ProfileError> {
        {
            let mut config = self.config.write();
            let profile = config
                .connections
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or_else(|| ProfileError::NotFound(id.to_string()))?;
            profile.last_used_at = Some(Utc::now());
        }
        self.persist().await
    }

    async fn delete_secrets(&self, profile: &ConnectionProfile) -> Result<(), ProfileError> {
        for kind in SecretKind::ALL {
            if let Err(e) = self.secrets.delete_secret(&profile.id, profile.kind, kind).await {
                warn!("Failed to delete {} for profile {}: {}", kind, profile.id, e);
                return Err(e.into());
            }
        }
        Ok(())
    }

    async fn persist(&self) -> Result<(), ProfileError> {
        let snapshot = self.config.read().clone();
        self.storage.save(&snapshot).await?;
        Ok(())
    }
}

impl ProfileSource for ProfileStore {
    fn profile(&self, id: &str) -> Option<ConnectionProfile> {
        self.get(id)
    }
}
