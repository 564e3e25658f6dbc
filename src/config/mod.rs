//! Configuration Management Module
//!
//! Persistent storage of connection profiles and settings, and secure
//! credential storage via the system keychain.

pub mod keychain;
pub mod profiles;
pub mod storage;
pub mod types;

pub use keychain::KeychainSecretStore;
pub use profiles::{ProfileError, ProfileSecrets, ProfileStore};
pub use storage::{config_dir, config_file, ConfigStorage, StorageError};
pub use types::{
    AppSettings, ConfigFile, ConnectionKind, ConnectionProfile, SavedAuthType, SecretKind,
    CONFIG_VERSION,
};
