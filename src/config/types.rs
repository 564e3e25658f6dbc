//! Configuration Types
//!
//! Persisted, non-secret configuration. Secrets live in the system keychain
//! and are addressed by `(profile id, connection kind, secret kind)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transfer::{DEFAULT_CONCURRENT_TRANSFERS, MAX_POSSIBLE_CONCURRENT};

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

/// Protocol family of a saved connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionKind {
    Ssh,
    Sftp,
    Ftp,
}

impl ConnectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionKind::Ssh => "ssh",
            ConnectionKind::Sftp => "sftp",
            ConnectionKind::Ftp => "ftp",
        }
    }

    pub fn default_port(&self) -> u16 {
        match self {
            ConnectionKind::Ssh | ConnectionKind::Sftp => 22,
            ConnectionKind::Ftp => 21,
        }
    }
}

impl std::fmt::Display for ConnectionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One kind of stored secret
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecretKind {
    Password,
    PrivateKey,
    Passphrase,
}

impl SecretKind {
    pub const ALL: [SecretKind; 3] = [SecretKind::Password, SecretKind::PrivateKey, SecretKind::Passphrase];

    pub fn as_str(&self) -> &'static str {
        match self {
            SecretKind::Password => "password",
            SecretKind::PrivateKey => "privatekey",
            SecretKind::Passphrase => "passphrase",
        }
    }
}

impl std::fmt::Display for SecretKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which secrets were saved with a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SavedAuthType {
    Password,
    PrivateKey,
    /// Private key protected by a passphrase
    Passphrase,
    /// Nothing stored; prompt or agent at connect time
    Interactive,
}

impl SavedAuthType {
    /// Secret kinds to fetch for this tag, in fetch order
    pub fn secret_kinds(&self) -> &'static [SecretKind] {
        match self {
            SavedAuthType::Password => &[SecretKind::Password],
            SavedAuthType::PrivateKey => &[SecretKind::PrivateKey],
            SavedAuthType::Passphrase => &[SecretKind::PrivateKey, SecretKind::Passphrase],
            SavedAuthType::Interactive => &[],
        }
    }
}

/// Saved connection (non-secret fields only)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionProfile {
    pub id: String,
    pub name: String,
    pub kind: ConnectionKind,
    pub host: String,
    pub port: u16,
    pub username: String,
    /// `None` for profiles saved before any secret was stored
    #[serde(default)]
    pub saved_auth_type: Option<SavedAuthType>,
    /// Key file path when the key is not stored in the keychain
    #[serde(default)]
    pub key_path: Option<String>,
    /// Initial remote directory
    #[serde(default)]
    pub remote_path: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub last_used_at: Option<DateTime<Utc>>,
}

impl ConnectionProfile {
    pub fn new(
        name: impl Into<String>,
        kind: ConnectionKind,
        host: impl Into<String>,
        username: impl Into<String>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            kind,
            host: host.into(),
            port: kind.default_port(),
            username: username.into(),
            saved_auth_type: None,
            key_path: None,
            remote_path: None,
            created_at: Utc::now(),
            last_used_at: None,
        }
    }
}

fn default_max_concurrent() -> usize {
    DEFAULT_CONCURRENT_TRANSFERS
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Transfers allowed to stream at once (1..=10)
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_transfers: usize,
    /// Show a `..` row above non-root listings
    #[serde(default = "default_true")]
    pub show_parent_entry: bool,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl AppSettings {
    /// Concurrency limit clamped to the supported range
    pub fn effective_max_concurrent(&self) -> usize {
        self.max_concurrent_transfers.clamp(1, MAX_POSSIBLE_CONCURRENT)
    }
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            max_concurrent_transfers: default_max_concurrent(),
            show_parent_entry: true,
            log_level: default_log_level(),
        }
    }
}

/// On-disk config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    pub version: u32,
    #[serde(default)]
    pub connections: Vec<ConnectionProfile>,
    #[serde(default)]
    pub settings: AppSettings,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            connections: Vec::new(),
            settings: AppSettings::default(),
        }
    }
}
