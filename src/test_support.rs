//! In-memory collaborators for unit tests

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

use crate::backend::{
    FileBackend, FsError, ProgressSender, SecretStore, SecretStoreError, SessionConnector,
    SessionHandle, TransferBackend,
};
use crate::config::{ConnectionKind, ConnectionProfile, SecretKind};
use crate::credentials::{ConnectionConfig, ProfileSource};
use crate::panel::FileEntry;
use crate::transfer::{check_transfer_control, TransferControl, TransferDirection, TransferSignal};

/// One-shot rendezvous that parks a fake call until the test releases it
pub struct Gate {
    entered: Notify,
    released: Semaphore,
}

impl Gate {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            entered: Notify::new(),
            released: Semaphore::new(0),
        })
    }

    async fn pass(&self) {
        self.entered.notify_one();
        if let Ok(permit) = self.released.acquire().await {
            permit.forget();
        }
    }

    /// Resolves once the gated call is parked
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.released.add_permits(1);
    }
}

/// Rebuild an error without requiring `FsError: Clone`
pub fn clone_err(err: &FsError) -> FsError {
    match err {
        FsError::NotFound(p) => FsError::NotFound(p.clone()),
        FsError::AlreadyExists(p) => FsError::AlreadyExists(p.clone()),
        FsError::PermissionDenied(p) => FsError::PermissionDenied(p.clone()),
        FsError::Io(e) => FsError::Io(std::io::Error::new(e.kind(), e.to_string())),
        FsError::Protocol(m) => FsError::Protocol(m.clone()),
        FsError::SessionNotFound(s) => FsError::SessionNotFound(s.clone()),
        FsError::ConnectionFailed(m) => FsError::ConnectionFailed(m.clone()),
        FsError::TransferCancelled => FsError::TransferCancelled,
        FsError::TransferError(m) => FsError::TransferError(m.clone()),
        FsError::Unsupported(m) => FsError::Unsupported(m.clone()),
    }
}

// ============================================================================
// File primitives
// ============================================================================

#[derive(Default)]
struct FakeFsState {
    listings: HashMap<String, Vec<FileEntry>>,
    list_failures: HashMap<String, FsError>,
    list_gates: HashMap<String, Arc<Gate>>,
    list_calls: Vec<(Option<String>, String)>,
    existing_dirs: HashSet<String>,
    created: Vec<String>,
    deleted: Vec<String>,
    renamed: Vec<(String, String)>,
    create_failures: HashMap<String, FsError>,
    delete_failures: HashMap<String, FsError>,
    rename_failures: HashMap<String, FsError>,
}

/// Scripted listings and failures, with call recording
#[derive(Default)]
pub struct FakeFileBackend {
    state: Mutex<FakeFsState>,
}

impl FakeFileBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_listing(&self, path: &str, entries: Vec<FileEntry>) {
        self.state.lock().listings.insert(path.to_string(), entries);
    }

    pub fn fail_list(&self, path: &str, err: FsError) {
        self.state.lock().list_failures.insert(path.to_string(), err);
    }

    /// Park the next listing of `path` until the gate is released
    pub fn gate_list(&self, path: &str) -> Arc<Gate> {
        let gate = Gate::new();
        self.state.lock().list_gates.insert(path.to_string(), gate.clone());
        gate
    }

    pub fn list_calls(&self) -> Vec<(Option<String>, String)> {
        self.state.lock().list_calls.clone()
    }

    /// Make `create_dir(path)` report `AlreadyExists`
    pub fn add_existing_dir(&self, path: &str) {
        self.state.lock().existing_dirs.insert(path.to_string());
    }

    pub fn fail_create(&self, path: &str, err: FsError) {
        self.state.lock().create_failures.insert(path.to_string(), err);
    }

    pub fn fail_delete(&self, path: &str, err: FsError) {
        self.state.lock().delete_failures.insert(path.to_string(), err);
    }

    pub fn fail_rename(&self, path: &str, err: FsError) {
        self.state.lock().rename_failures.insert(path.to_string(), err);
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().created.clone()
    }

    pub fn deleted(&self) -> Vec<String> {
        self.state.lock().deleted.clone()
    }

    pub fn renamed(&self) -> Vec<(String, String)> {
        self.state.lock().renamed.clone()
    }
}

#[async_trait]
impl FileBackend for FakeFileBackend {
    async fn list_dir(
        &self,
        session: Option<&SessionHandle>,
        path: &str,
    ) -> Result<Vec<FileEntry>, FsError> {
        let gate = {
            let mut state = self.state.lock();
            state
                .list_calls
                .push((session.map(|s| s.0.clone()), path.to_string()));
            state.list_gates.remove(path)
        };
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let state = self.state.lock();
        if let Some(err) = state.list_failures.get(path) {
            return Err(clone_err(err));
        }
        state
            .listings
            .get(path)
            .cloned()
            .ok_or_else(|| FsError::NotFound(path.to_string()))
    }

    async fn create_dir(&self, _session: Option<&SessionHandle>, path: &str) -> Result<(), FsError> {
        let mut state = self.state.lock();
        if let Some(err) = state.create_failures.get(path) {
            return Err(clone_err(err));
        }
        if !state.existing_dirs.insert(path.to_string()) {
            return Err(FsError::AlreadyExists(path.to_string()));
        }
        state.created.push(path.to_string());
        Ok(())
    }

    async fn delete_path(
        &self,
        _session: Option<&SessionHandle>,
        path: &str,
        _is_directory: bool,
    ) -> Result<(), FsError> {
        let mut state = self.state.lock();
        if let Some(err) = state.delete_failures.get(path) {
            return Err(clone_err(err));
        }
        state.deleted.push(path.to_string());
        Ok(())
    }

    async fn rename_path(
        &self,
        _session: Option<&SessionHandle>,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), FsError> {
        let mut state = self.state.lock();
        if let Some(err) = state.rename_failures.get(old_path) {
            return Err(clone_err(err));
        }
        state
            .renamed
            .push((old_path.to_string(), new_path.to_string()));
        Ok(())
    }
}

// ============================================================================
// Transfers
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferCall {
    pub direction: TransferDirection,
    pub session: String,
    pub source: String,
    pub destination: String,
}

#[derive(Default)]
struct FakeTransferState {
    total: u64,
    steps: Vec<u64>,
    failure: Option<String>,
    gate: Option<Arc<Gate>>,
    calls: Vec<TransferCall>,
}

/// Emits `Started`, optionally parks, then streams scripted progress steps
#[derive(Default)]
pub struct FakeTransferBackend {
    state: Mutex<FakeTransferState>,
}

impl FakeTransferBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_progress(&self, total: u64, steps: Vec<u64>) {
        let mut state = self.state.lock();
        state.total = total;
        state.steps = steps;
    }

    /// Fail after streaming the scripted steps
    pub fn fail_with(&self, message: &str) {
        self.state.lock().failure = Some(message.to_string());
    }

    /// Park the next transfer right after `Started`
    pub fn gate_next(&self) -> Arc<Gate> {
        let gate = Gate::new();
        self.state.lock().gate = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<TransferCall> {
        self.state.lock().calls.clone()
    }

    async fn run(
        &self,
        call: TransferCall,
        progress: ProgressSender,
        control: Arc<TransferControl>,
    ) -> Result<(), FsError> {
        let (total, steps, failure, gate) = {
            let mut state = self.state.lock();
            state.calls.push(call);
            (
                state.total,
                state.steps.clone(),
                state.failure.clone(),
                state.gate.take(),
            )
        };

        let _ = progress.send(TransferSignal::Started).await;
        if let Some(gate) = gate {
            gate.pass().await;
        }
        for bytes in steps {
            check_transfer_control(&control).await?;
            let _ = progress
                .send(TransferSignal::Progress {
                    bytes,
                    total_bytes: total,
                })
                .await;
        }
        check_transfer_control(&control).await?;
        match failure {
            Some(message) => Err(FsError::TransferError(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl TransferBackend for FakeTransferBackend {
    async fn upload(
        &self,
        session: &SessionHandle,
        local_path: &str,
        remote_path: &str,
        progress: ProgressSender,
        control: Arc<TransferControl>,
    ) -> Result<(), FsError> {
        let call = TransferCall {
            direction: TransferDirection::Upload,
            session: session.0.clone(),
            source: local_path.to_string(),
            destination: remote_path.to_string(),
        };
        self.run(call, progress, control).await
    }

    async fn download(
        &self,
        session: &SessionHandle,
        remote_path: &str,
        local_path: &str,
        progress: ProgressSender,
        control: Arc<TransferControl>,
    ) -> Result<(), FsError> {
        let call = TransferCall {
            direction: TransferDirection::Download,
            session: session.0.clone(),
            source: remote_path.to_string(),
            destination: local_path.to_string(),
        };
        self.run(call, progress, control).await
    }
}

// ============================================================================
// Secrets
// ============================================================================

#[derive(Default)]
struct FakeSecretState {
    secrets: HashMap<(String, ConnectionKind, SecretKind), String>,
    get_calls: Vec<(String, ConnectionKind, SecretKind)>,
    deleted: Vec<(String, ConnectionKind, SecretKind)>,
    unavailable: bool,
    gate: Option<Arc<Gate>>,
}

/// HashMap-backed secret store recording every lookup
#[derive(Default)]
pub struct FakeSecretStore {
    state: Mutex<FakeSecretState>,
}

impl FakeSecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, profile_id: &str, kind: ConnectionKind, secret: SecretKind, value: &str) {
        self.state
            .lock()
            .secrets
            .insert((profile_id.to_string(), kind, secret), value.to_string());
    }

    pub fn value(&self, profile_id: &str, kind: ConnectionKind, secret: SecretKind) -> Option<String> {
        self.state
            .lock()
            .secrets
            .get(&(profile_id.to_string(), kind, secret))
            .cloned()
    }

    /// Make every call fail at the transport level
    pub fn set_unavailable(&self, unavailable: bool) {
        self.state.lock().unavailable = unavailable;
    }

    /// Park the next `get_secret` until released
    pub fn gate_next(&self) -> Arc<Gate> {
        let gate = Gate::new();
        self.state.lock().gate = Some(gate.clone());
        gate
    }

    /// Secret kinds requested through `get_secret`, in call order
    pub fn requested_kinds(&self) -> Vec<SecretKind> {
        self.state.lock().get_calls.iter().map(|(_, _, s)| *s).collect()
    }

    pub fn deleted(&self) -> Vec<(String, ConnectionKind, SecretKind)> {
        self.state.lock().deleted.clone()
    }
}

#[async_trait]
impl SecretStore for FakeSecretStore {
    async fn get_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
    ) -> Result<Option<String>, SecretStoreError> {
        let gate = self.state.lock().gate.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let mut state = self.state.lock();
        state.get_calls.push((profile_id.to_string(), kind, secret));
        if state.unavailable {
            return Err(SecretStoreError::Unavailable("secret service offline".into()));
        }
        Ok(state
            .secrets
            .get(&(profile_id.to_string(), kind, secret))
            .cloned())
    }

    async fn set_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
        value: &str,
    ) -> Result<(), SecretStoreError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(SecretStoreError::Unavailable("secret service offline".into()));
        }
        state
            .secrets
            .insert((profile_id.to_string(), kind, secret), value.to_string());
        Ok(())
    }

    async fn delete_secret(
        &self,
        profile_id: &str,
        kind: ConnectionKind,
        secret: SecretKind,
    ) -> Result<(), SecretStoreError> {
        let mut state = self.state.lock();
        if state.unavailable {
            return Err(SecretStoreError::Unavailable("secret service offline".into()));
        }
        state.secrets.remove(&(profile_id.to_string(), kind, secret));
        state.deleted.push((profile_id.to_string(), kind, secret));
        Ok(())
    }
}

// ============================================================================
// Profiles
// ============================================================================

/// Fixed profile list
#[derive(Default)]
pub struct FakeProfiles {
    profiles: Mutex<Vec<ConnectionProfile>>,
}

impl FakeProfiles {
    pub fn new(profiles: Vec<ConnectionProfile>) -> Self {
        Self {
            profiles: Mutex::new(profiles),
        }
    }
}

impl ProfileSource for FakeProfiles {
    fn profile(&self, id: &str) -> Option<ConnectionProfile> {
        self.profiles.lock().iter().find(|p| p.id == id).cloned()
    }
}

// ============================================================================
// Sessions
// ============================================================================

#[derive(Default)]
struct FakeConnectorState {
    next_id: u32,
    opened: Vec<(SessionHandle, ConnectionConfig)>,
    closed: Vec<SessionHandle>,
    failure: Option<String>,
    gate: Option<Arc<Gate>>,
}

/// Hands out `session-N` handles and records closes
#[derive(Default)]
pub struct FakeConnector {
    state: Mutex<FakeConnectorState>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_with(&self, message: &str) {
        self.state.lock().failure = Some(message.to_string());
    }

    /// Park the next `open_session` until released
    pub fn gate_next(&self) -> Arc<Gate> {
        let gate = Gate::new();
        self.state.lock().gate = Some(gate.clone());
        gate
    }

    pub fn opened(&self) -> Vec<(SessionHandle, ConnectionConfig)> {
        self.state.lock().opened.clone()
    }

    pub fn closed(&self) -> Vec<SessionHandle> {
        self.state.lock().closed.clone()
    }
}

#[async_trait]
impl SessionConnector for FakeConnector {
    async fn open_session(&self, config: &ConnectionConfig) -> Result<SessionHandle, FsError> {
        let gate = self.state.lock().gate.take();
        if let Some(gate) = gate {
            gate.pass().await;
        }
        let mut state = self.state.lock();
        if let Some(message) = &state.failure {
            return Err(FsError::ConnectionFailed(message.clone()));
        }
        state.next_id += 1;
        let handle = SessionHandle::new(format!("session-{}", state.next_id));
        state.opened.push((handle.clone(), config.clone()));
        Ok(handle)
    }

    async fn close_session(&self, handle: &SessionHandle) -> Result<(), FsError> {
        self.state.lock().closed.push(handle.clone());
        Ok(())
    }
}
