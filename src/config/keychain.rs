//! Keychain Integration
//!
//! [`SecretStore`] over the system keychain via the `keyring` crate.
//! keyring calls block, so each one runs on the blocking pool.

use async_trait::async_trait;
use keyring::Entry;

use super::types::{ConnectionKind, SecretKind};
use crate::backend::{SecretStore, SecretStoreError};

/// Service name for keychain entries
const SERVICE_NAME: &str = "com.oxidepane.credentials";

pub struct KeychainSecretStore {
    service: String,
}

impl KeychainSecretStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Custom service name (for testing)
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Account name: `<os user>@<profile>:<kind>:<secret>`.
    ///
    /// The explicit OS user keeps the keychain identity stable on macOS.
    pub fn account(profile_id: &str, kind: ConnectionKind, secret: SecretKind) -> String {
        format!("{}@{}:{}:{}", whoami::username(), profile_id, kind, secret)
    }

    async fn blocking<T, F>(&self, f: F) -> Result<T, SecretStoreError>
    where
        T: Send + 'static,
        F: FnOnce(String) -> Result<T, SecretStoreError> + Send + 'static,
    {
        let service = self.service.clone();
        tokio::task::spawn_blocking(move || f(service))
            .await
            .map_err(|e| SecretStoreError::Join(e.to_string()))?
    }
}

impl Default for KeychainSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SecretStore for KeychainSecretStore {
    async fn get_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
    ) -> Result<Option<String>, SecretStoreError> {
        let account = Self::account(profile_id, kind, secret);
        self.blocking(move |service| {
            let entry = Entry::new(&service, &account)?;
            match entry.get_password() {
                Ok(value) => {
                    tracing::debug!("Keychain get success: {} (len={})", account, value.len());
                    Ok(Some(value))
                }
                Err(keyring::Error::NoEntry) => {
                    tracing::debug!("Keychain get: no entry for {}", account);
                    Ok(None)
                }
                Err(e) => {
                    tracing::error!("Keychain get failed: {}, error={:?}", account, e);
                    Err(SecretStoreError::Keyring(e))
                }
            }
        })
        .await
    }

    async fn set_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
        value: &str,
    ) -> Result<(), SecretStoreError> {
        let account = Self::account(profile_id, kind, secret);
        let value = zeroize::Zeroizing::new(value.to_string());
        self.blocking(move |service| {
            let entry = Entry::new(&service, &account)?;
            entry.set_password(&value).map_err(|e| {
                tracing::error!("Keychain store failed: {}, error={:?}", account, e);
                SecretStoreError::Keyring(e)
            })?;
            tracing::info!("Keychain store: {}", account);
            Ok(())
        })
        .await
    }

    async fn delete_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
    ) -> Result<(), SecretStoreError> {
        let account = Self::account(profile_id, kind, secret);
        self.blocking(move |service| {
            let entry = Entry::new(&service, &account)?;
            match entry.delete_credential() {
                Ok(()) => Ok(()),
                Err(keyring::Error::NoEntry) => Ok(()), // Already deleted
                Err(e) => Err(SecretStoreError::Keyring(e)),
            }
        })
        .await
    }
}
