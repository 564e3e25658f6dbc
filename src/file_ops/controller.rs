//! File Operations Controller
//!
//! Validate, call the primitive, refresh the owning panel.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use super::validate::{validate_name, ValidationError};
use crate::backend::{FileBackend, FsError, SessionHandle};
use crate::panel::{DirectoryLoader, FileEntry, PaneKind, PanelState};
use crate::path::{join, with_file_name};
use crate::session::SessionStore;

#[derive(Debug, thiserror::Error)]
pub enum FileOpError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Session not found for tab: {0}")]
    SessionNotFound(String),

    #[error("Rename needs exactly one selected entry, {0} selected")]
    SelectionCount(usize),

    #[error("The parent directory entry cannot be {0}")]
    ParentEntry(&'static str),

    #[error(transparent)]
    Fs(#[from] FsError),
}

impl Serialize for FileOpError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Outcome of a batch delete
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReport {
    pub success_count: usize,
    /// Names of entries that could not be deleted
    pub failed: Vec<String>,
}

impl DeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

#[derive(Clone)]
pub struct FileOperations {
    store: Arc<SessionStore>,
    loader: DirectoryLoader,
    backend: Arc<dyn FileBackend>,
}

impl FileOperations {
    pub fn new(loader: DirectoryLoader, backend: Arc<dyn FileBackend>) -> Self {
        Self {
            store: loader.store().clone(),
            loader,
            backend,
        }
    }

    fn context(&self, tab_id: &str, pane: PaneKind) -> Result<(Option<SessionHandle>, PanelState), FileOpError> {
        let session = self
            .store
            .session(tab_id)
            .ok_or_else(|| FileOpError::SessionNotFound(tab_id.to_string()))?;
        let handle = session.handle_for(pane).cloned();
        Ok((handle, session.panel(pane).clone()))
    }

    /// Create `name` in the panel's current directory.
    ///
    /// An existing directory of that name counts as success.
    pub async fn create_directory(&self, tab_id: &str, pane: PaneKind, name: &str) -> Result<String, FileOpError> {
        validate_name(name)?;
        let (handle, panel) = self.context(tab_id, pane)?;
        let path = join(&panel.current_path, name, panel.style);

        match self.backend.create_dir(handle.as_ref(), &path).await {
            Ok(()) => info!("Created directory {} in {} panel", path, pane),
            Err(e) if e.is_already_exists() => info!("Directory {} already exists", path),
            Err(e) => {
                warn!("Failed to create directory {}: {}", path, e);
                return Err(e.into());
            }
        }

        self.loader.refresh(tab_id, pane).await;
        Ok(path)
    }

    /// Delete each entry independently and report partial success.
    ///
    /// The panel is refreshed whatever the outcome.
    pub async fn delete_entries(
        &self,
        tab_id: &str,
        pane: PaneKind,
        entries: &[FileEntry],
    ) -> Result<DeleteReport, FileOpError> {
        if entries.iter().any(|e| e.is_parent_entry()) {
            return Err(FileOpError::ParentEntry("deleted"));
        }
        let (handle, _) = self.context(tab_id, pane)?;
        if entries.is_empty() {
            return Ok(DeleteReport::default());
        }

        let mut report = DeleteReport::default();
        for entry in entries {
            match self
                .backend
                .delete_path(handle.as_ref(), &entry.path, entry.is_directory)
                .await
            {
                Ok(()) => report.success_count += 1,
                Err(e) => {
                    warn!("Failed to delete {}: {}", entry.path, e);
                    report.failed.push(entry.name.clone());
                }
            }
        }
        info!(
            "Deleted {}/{} entries in {} panel of {}",
            report.success_count,
            entries.len(),
            pane,
            tab_id
        );

        self.loader.refresh(tab_id, pane).await;
        Ok(report)
    }

    pub async fn delete_selected(&self, tab_id: &str, pane: PaneKind) -> Result<DeleteReport, FileOpError> {
        let (_, panel) = self.context(tab_id, pane)?;
        let entries = panel.selected_entries();
        self.delete_entries(tab_id, pane, &entries).await
    }

    /// Rename the single selected entry, keeping its parent directory
    pub async fn rename_selected(&self, tab_id: &str, pane: PaneKind, new_name: &str) -> Result<String, FileOpError> {
        let (_, panel) = self.context(tab_id, pane)?;
        let selected = panel.selected_entries();
        let [entry] = selected.as_slice() else {
            return Err(FileOpError::SelectionCount(selected.len()));
        };
        self.rename_entry(tab_id, pane, entry, new_name).await
    }

    pub async fn rename_entry(
        &self,
        tab_id: &str,
        pane: PaneKind,
        entry: &FileEntry,
        new_name: &str,
    ) -> Result<String, FileOpError> {
        if entry.is_parent_entry() {
            return Err(FileOpError::ParentEntry("renamed"));
        }
        validate_name(new_name)?;
        let (handle, panel) = self.context(tab_id, pane)?;
        if new_name == entry.name {
            return Ok(entry.path.clone());
        }

        let new_path = with_file_name(&entry.path, new_name, panel.style);
        self.backend
            .rename_path(handle.as_ref(), &entry.path, &new_path)
            .await
            .map_err(|e| {
                warn!("Failed to rename {} to {}: {}", entry.path, new_path, e);
                FileOpError::from(e)
            })?;
        info!("Renamed {} -> {}", entry.path, new_path);

        self.loader.refresh(tab_id, pane).await;
        Ok(new_path)
    }
}
