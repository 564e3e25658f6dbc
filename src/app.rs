//! Application root
//!
//! [`FileManager`] owns the one [`SessionStore`] and wires every component
//! to it. It also owns the tab lifecycle: connecting a tab resolves
//! credentials once, opens the remote session and loads both panels;
//! closing a tab releases the session handle exactly once, even when the
//! close races an in-flight connect.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::backend::{FileBackend, FsError, SecretStore, SessionConnector, SessionHandle, TransferBackend};
use crate::config::{AppSettings, ConnectionKind};
use crate::credentials::{CredentialError, CredentialResolver, ProfileSource};
use crate::file_ops::FileOperations;
use crate::panel::{DirectoryLoader, LoaderOptions, PaneKind};
use crate::session::{SessionStore, StoreEvent};
use crate::transfer::{TransferCoordinator, TransferEvent, TransferManager, TransferQueue};

/// Remote directory used when a profile names none
const DEFAULT_REMOTE_PATH: &str = "/";

#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error("Tab {0} already has a session")]
    TabOccupied(String),

    #[error("A connection for tab {0} is already in progress")]
    InProgress(String),

    #[error("Tab {0} was closed while connecting")]
    Abandoned(String),

    #[error(transparent)]
    Credentials(#[from] CredentialError),

    #[error(transparent)]
    Session(#[from] FsError),
}

impl serde::Serialize for ConnectError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// External capabilities the core runs against
#[derive(Clone)]
pub struct Collaborators {
    pub files: Arc<dyn FileBackend>,
    pub transfers: Arc<dyn TransferBackend>,
    pub secrets: Arc<dyn SecretStore>,
    pub profiles: Arc<dyn ProfileSource>,
    pub connector: Arc<dyn SessionConnector>,
}

pub struct FileManager {
    store: Arc<SessionStore>,
    loader: DirectoryLoader,
    file_ops: FileOperations,
    coordinator: TransferCoordinator,
    resolver: CredentialResolver,
    connector: Arc<dyn SessionConnector>,
    /// Protocol every profile must speak
    expected_kind: ConnectionKind,
    /// Tab -> id of its in-flight connect attempt
    pending: DashMap<String, u64>,
    next_attempt: AtomicU64,
}

impl FileManager {
    pub fn new(collaborators: Collaborators, settings: &AppSettings) -> Self {
        let store = Arc::new(SessionStore::new());
        let loader = DirectoryLoader::new(store.clone(), collaborators.files.clone()).with_options(
            LoaderOptions {
                show_parent_entry: settings.show_parent_entry,
            },
        );
        let file_ops = FileOperations::new(loader.clone(), collaborators.files.clone());
        let coordinator = TransferCoordinator::new(
            loader.clone(),
            Arc::new(TransferQueue::new()),
            Arc::new(TransferManager::with_max_concurrent(
                settings.effective_max_concurrent(),
            )),
            collaborators.transfers.clone(),
        );
        let resolver = CredentialResolver::new(collaborators.profiles.clone(), collaborators.secrets.clone());

        Self {
            store,
            loader,
            file_ops,
            coordinator,
            resolver,
            connector: collaborators.connector,
            expected_kind: ConnectionKind::Sftp,
            pending: DashMap::new(),
            next_attempt: AtomicU64::new(1),
        }
    }

    /// Require profiles of another protocol family
    pub fn with_expected_kind(mut self, kind: ConnectionKind) -> Self {
        self.expected_kind = kind;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn loader(&self) -> &DirectoryLoader {
        &self.loader
    }

    pub fn file_ops(&self) -> &FileOperations {
        &self.file_ops
    }

    pub fn transfers(&self) -> &TransferCoordinator {
        &self.coordinator
    }

    pub fn queue(&self) -> &Arc<TransferQueue> {
        self.coordinator.queue()
    }

    pub fn subscribe_panels(&self) -> broadcast::Receiver<StoreEvent> {
        self.store.subscribe()
    }

    pub fn subscribe_transfers(&self) -> broadcast::Receiver<TransferEvent> {
        self.coordinator.queue().subscribe()
    }

    /// Apply settings that can change at runtime
    pub fn apply_settings(&self, settings: &AppSettings) {
        self.coordinator
            .manager()
            .set_max_concurrent(settings.effective_max_concurrent());
    }

    pub fn is_connecting(&self, tab_id: &str) -> bool {
        self.pending.contains_key(tab_id)
    }

    /// Open a remote session for `tab_id` and load both panels.
    ///
    /// A second connect for a tab that is connecting or connected is
    /// rejected. If the tab is closed before the session is attached, the
    /// result is discarded and the freshly opened handle is closed.
    pub async fn connect(
        &self,
        tab_id: &str,
        profile_id: &str,
        local_start: &str,
    ) -> Result<SessionHandle, ConnectError> {
        if self.store.contains(tab_id) {
            return Err(ConnectError::TabOccupied(tab_id.to_string()));
        }
        let attempt = self.next_attempt.fetch_add(1, Ordering::Relaxed);
        match self.pending.entry(tab_id.to_string()) {
            Entry::Occupied(_) => return Err(ConnectError::InProgress(tab_id.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(attempt);
            }
        }
        info!("Connecting tab {} with profile {} (attempt {})", tab_id, profile_id, attempt);

        let config = match self.resolver.resolve(profile_id, self.expected_kind).await {
            Ok(config) => config,
            Err(e) => {
                warn!("Credential resolution failed for tab {}: {}", tab_id, e);
                self.clear_pending(tab_id, attempt);
                return Err(e.into());
            }
        };
        if !self.owns_attempt(tab_id, attempt) {
            debug!("Tab {} closed during credential resolution", tab_id);
            return Err(ConnectError::Abandoned(tab_id.to_string()));
        }

        let handle = match self.connector.open_session(&config).await {
            Ok(handle) => handle,
            Err(e) => {
                warn!("Failed to open session for tab {}: {}", tab_id, e);
                self.clear_pending(tab_id, attempt);
                return Err(e.into());
            }
        };
        let remote_path = config
            .remote_path
            .clone()
            .unwrap_or_else(|| DEFAULT_REMOTE_PATH.to_string());
        drop(config);

        if !self.owns_attempt(tab_id, attempt) {
            info!("Tab {} closed while connecting, releasing {}", tab_id, handle);
            self.release(&handle).await;
            return Err(ConnectError::Abandoned(tab_id.to_string()));
        }

        if let Err(e) = self
            .store
            .create_session(tab_id, handle.clone(), local_start, &remote_path)
        {
            warn!("Cannot attach session to tab {}: {}", tab_id, e);
            self.clear_pending(tab_id, attempt);
            self.release(&handle).await;
            return Err(ConnectError::TabOccupied(tab_id.to_string()));
        }

        // A close that ran after the attach owns the release; one that ran
        // before it found nothing to remove, so the release falls to us.
        if !self.clear_pending(tab_id, attempt) {
            if let Some(session) = self.store.remove_session(tab_id) {
                info!("Tab {} closed while attaching, releasing {}", tab_id, handle);
                self.release(&session.session_id).await;
            }
            return Err(ConnectError::Abandoned(tab_id.to_string()));
        }

        tokio::join!(
            self.loader.load(tab_id, PaneKind::Local, local_start),
            self.loader.load(tab_id, PaneKind::Remote, &remote_path),
        );
        info!("Tab {} connected as {}", tab_id, handle);
        Ok(handle)
    }

    /// Tear down a tab: abandon any in-flight connect, cancel its transfers
    /// and release the session handle. Returns whether a session was closed.
    pub async fn close_tab(&self, tab_id: &str) -> bool {
        if self.pending.remove(tab_id).is_some() {
            debug!("Abandoning in-flight connect for tab {}", tab_id);
        }
        self.coordinator.cancel_tab(tab_id);

        match self.store.remove_session(tab_id) {
            Some(session) => {
                self.release(&session.session_id).await;
                info!("Tab {} closed", tab_id);
                true
            }
            None => false,
        }
    }

    fn owns_attempt(&self, tab_id: &str, attempt: u64) -> bool {
        self.pending.get(tab_id).map(|a| *a == attempt).unwrap_or(false)
    }

    fn clear_pending(&self, tab_id: &str, attempt: u64) -> bool {
        self.pending.remove_if(tab_id, |_, a| *a == attempt).is_some()
    }

    async fn release(&self, handle: &SessionHandle) {
        if let Err(e) = self.connector.close_session(handle).await {
            warn!("Failed to close session {}: {}", handle, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConnectionProfile, SavedAuthType, SecretKind};
    use crate::panel::FileEntry;
    use crate::test_support::{FakeConnector, FakeFileBackend, FakeProfiles, FakeSecretStore, FakeTransferBackend};
    use crate::transfer::DEFAULT_CONCURRENT_TRANSFERS;

    struct Harness {
        files: Arc<FakeFileBackend>,
        secrets: Arc<FakeSecretStore>,
        connector: Arc<FakeConnector>,
        manager: Arc<FileManager>,
    }

    fn harness() -> Harness {
        harness_expecting(ConnectionKind::Sftp)
    }

    fn harness_expecting(kind: ConnectionKind) -> Harness {
        let mut profile = ConnectionProfile::new("box", ConnectionKind::Sftp, "example.com", "deploy");
        profile.id = "p1".into();
        profile.saved_auth_type = Some(SavedAuthType::Password);
        profile.remote_path = Some("/srv".into());

        let files = Arc::new(FakeFileBackend::new());
        files.set_listing("/home/user", vec![FileEntry::file("a.txt", "/home/user/a.txt", 10, 1)]);
        files.set_listing("/srv", vec![FileEntry::directory("data", "/srv/data", 1)]);
        let secrets = Arc::new(FakeSecretStore::new());
        secrets.insert("p1", ConnectionKind::Sftp, SecretKind::Password, "pw");
        let connector = Arc::new(FakeConnector::new());

        let collaborators = Collaborators {
            files: files.clone(),
            transfers: Arc::new(FakeTransferBackend::new()),
            secrets: secrets.clone(),
            profiles: Arc::new(FakeProfiles::new(vec![profile])),
            connector: connector.clone(),
        };
        let settings = AppSettings {
            show_parent_entry: false,
            ..AppSettings::default()
        };
        Harness {
            files,
            secrets,
            connector,
            manager: Arc::new(FileManager::new(collaborators, &settings).with_expected_kind(kind)),
        }
    }

    #[tokio::test]
    async fn test_connect_loads_both_panels() {
        let h = harness();
        let handle = h.manager.connect("tab", "p1", "/home/user").await.unwrap();
        assert_eq!(handle, SessionHandle::new("session-1"));

        let opened = h.connector.opened();
        assert_eq!(opened.len(), 1);
        assert_eq!(opened[0].1.credentials.password.as_deref(), Some("pw"));

        let store = h.manager.store();
        assert_eq!(store.panel("tab", PaneKind::Local).unwrap().entries.len(), 1);
        let remote = store.panel("tab", PaneKind::Remote).unwrap();
        assert_eq!(remote.current_path, "/srv");
        assert_eq!(remote.entries[0].name, "data");
        assert!(!h.manager.is_connecting("tab"));
    }

    #[tokio::test]
    async fn test_connect_twice_rejected() {
        let h = harness();
        h.manager.connect("tab", "p1", "/home/user").await.unwrap();
        assert!(matches!(
            h.manager.connect("tab", "p1", "/home/user").await,
            Err(ConnectError::TabOccupied(_))
        ));
        assert_eq!(h.connector.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_connect_rejected() {
        let h = harness();
        let gate = h.connector.gate_next();
        let first = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.connect("tab", "p1", "/home/user").await })
        };
        gate.wait_entered().await;

        assert!(matches!(
            h.manager.connect("tab", "p1", "/home/user").await,
            Err(ConnectError::InProgress(_))
        ));
        gate.release();
        assert!(first.await.unwrap().is_ok());
        // Credentials were fetched once, for the one attempt that ran
        assert_eq!(h.secrets.requested_kinds(), vec![SecretKind::Password]);
    }

    #[tokio::test]
    async fn test_close_during_connect_discards_and_releases() {
        let h = harness();
        let gate = h.connector.gate_next();
        let connecting = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.connect("tab", "p1", "/home/user").await })
        };
        gate.wait_entered().await;

        assert!(!h.manager.close_tab("tab").await);
        gate.release();

        assert!(matches!(
            connecting.await.unwrap(),
            Err(ConnectError::Abandoned(_))
        ));
        assert!(!h.manager.store().contains("tab"));
        assert_eq!(h.connector.closed(), vec![SessionHandle::new("session-1")]);
        assert!(h.files.list_calls().is_empty());
    }

    #[tokio::test]
    async fn test_close_during_credential_resolution_never_opens() {
        let h = harness();
        let gate = h.secrets.gate_next();
        let connecting = {
            let manager = h.manager.clone();
            tokio::spawn(async move { manager.connect("tab", "p1", "/home/user").await })
        };
        gate.wait_entered().await;

        assert!(!h.manager.close_tab("tab").await);
        gate.release();

        assert!(matches!(
            connecting.await.unwrap(),
            Err(ConnectError::Abandoned(_))
        ));
        assert!(h.connector.opened().is_empty());
        assert!(h.connector.closed().is_empty());
        assert!(!h.manager.store().contains("tab"));
        assert!(!h.manager.is_connecting("tab"));
    }

    #[tokio::test]
    async fn test_apply_settings_updates_transfer_limit() {
        let h = harness();
        let manager = h.manager.transfers().manager();
        assert_eq!(manager.max_concurrent(), DEFAULT_CONCURRENT_TRANSFERS);

        let mut settings = AppSettings::default();
        settings.max_concurrent_transfers = 5;
        h.manager.apply_settings(&settings);
        assert_eq!(manager.max_concurrent(), 5);

        settings.max_concurrent_transfers = 0;
        h.manager.apply_settings(&settings);
        assert_eq!(manager.max_concurrent(), 1);
    }

    #[tokio::test]
    async fn test_close_releases_exactly_once() {
        let h = harness();
        h.manager.connect("tab", "p1", "/home/user").await.unwrap();

        let (a, b) = tokio::join!(h.manager.close_tab("tab"), h.manager.close_tab("tab"));
        assert!(a ^ b);
        assert_eq!(h.connector.closed().len(), 1);
        assert!(!h.manager.close_tab("tab").await);
        assert_eq!(h.connector.closed().len(), 1);
    }

    #[tokio::test]
    async fn test_credential_failure_never_connects() {
        let h = harness();
        h.secrets.set_unavailable(true);
        assert!(matches!(
            h.manager.connect("tab", "p1", "/home/user").await,
            Err(ConnectError::Credentials(CredentialError::SecretStore(_)))
        ));
        assert!(matches!(
            h.manager.connect("tab", "missing", "/home/user").await,
            Err(ConnectError::Credentials(CredentialError::ProfileNotFound(_)))
        ));
        assert!(h.connector.opened().is_empty());
        // The gate was released, so a retry may proceed
        h.secrets.set_unavailable(false);
        assert!(h.manager.connect("tab", "p1", "/home/user").await.is_ok());
    }

    #[tokio::test]
    async fn test_open_failure_is_terminal_for_attempt() {
        let h = harness();
        h.connector.fail_with("host unreachable");
        let result = h.manager.connect("tab", "p1", "/home/user").await;
        assert!(matches!(result, Err(ConnectError::Session(FsError::ConnectionFailed(_)))));
        assert!(!h.manager.store().contains("tab"));
        assert!(!h.manager.is_connecting("tab"));
    }

    #[tokio::test]
    async fn test_kind_mismatch() {
        let h = harness_expecting(ConnectionKind::Ftp);
        assert!(matches!(
            h.manager.connect("tab", "p1", "/home/user").await,
            Err(ConnectError::Credentials(CredentialError::KindMismatch { .. }))
        ));
        assert!(h.connector.opened().is_empty());
        assert!(!h.manager.is_connecting("tab"));
    }
}
