//! External collaborators
//!
//! The orchestration layer never talks to a file system, a transfer protocol
//! or a keychain directly. Everything goes through the traits below so the
//! wire-level session, OS calls and secret persistence stay replaceable.

pub mod error;
pub mod local;
pub mod router;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::config::{ConnectionKind, SecretKind};
use crate::credentials::ConnectionConfig;
use crate::panel::FileEntry;
use crate::transfer::{TransferControl, TransferSignal};

pub use error::{FsError, SecretStoreError};
pub use local::LocalFileBackend;
pub use router::RoutedFileBackend;

/// Opaque handle to an open remote session
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionHandle(pub String);

impl SessionHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Directory primitives. `session == None` addresses the local file system.
#[async_trait]
pub trait FileBackend: Send + Sync {
    async fn list_dir(
        &self,
        session: Option<&SessionHandle>,
        path: &str,
    ) -> Result<Vec<FileEntry>, FsError>;

    /// Fails with [`FsError::AlreadyExists`] when the directory is present
    async fn create_dir(&self, session: Option<&SessionHandle>, path: &str) -> Result<(), FsError>;

    /// Directories are removed recursively
    async fn delete_path(
        &self,
        session: Option<&SessionHandle>,
        path: &str,
        is_directory: bool,
    ) -> Result<(), FsError>;

    async fn rename_path(
        &self,
        session: Option<&SessionHandle>,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), FsError>;
}

/// Sender half for streamed transfer progress
pub type ProgressSender = mpsc::Sender<TransferSignal>;

/// Streaming file copy between the two panes.
///
/// Implementations emit [`TransferSignal::Started`] when the stream begins,
/// then [`TransferSignal::Progress`] in stream order. The returned result is
/// the terminal status. Implementations should poll `control` between chunks
/// and return [`FsError::TransferCancelled`] once it is cancelled.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    async fn upload(
        &self,
        session: &SessionHandle,
        local_path: &str,
        remote_path: &str,
        progress: ProgressSender,
        control: Arc<TransferControl>,
    ) -> Result<(), FsError>;

    async fn download(
        &self,
        session: &SessionHandle,
        remote_path: &str,
        local_path: &str,
        progress: ProgressSender,
        control: Arc<TransferControl>,
    ) -> Result<(), FsError>;
}

/// Capability-addressed credential persistence
#[async_trait]
pub trait SecretStore: Send + Sync {
    /// `Ok(None)` when nothing is stored under the key
    async fn get_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
    ) -> Result<Option<String>, SecretStoreError>;

    async fn set_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
        value: &str,
    ) -> Result<(), SecretStoreError>;

    /// Deleting a missing secret succeeds
    async fn delete_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
    ) -> Result<(), SecretStoreError>;
}

/// Opens and closes remote sessions
#[async_trait]
pub trait SessionConnector: Send + Sync {
    async fn open_session(&self, config: &ConnectionConfig) -> Result<SessionHandle, FsError>;

    async fn close_session(&self, handle: &SessionHandle) -> Result<(), FsError>;
}
