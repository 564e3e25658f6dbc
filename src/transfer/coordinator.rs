//! Cross-Panel Transfer Coordinator
//!
//! Turns a drop (or an explicit "transfer selection" request) into a queued
//! copy, drives the backend stream into the queue in stream order, and
//! refreshes the destination panel once the copy lands.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::control::{TransferGuard, TransferManager};
use super::queue::TransferQueue;
use super::types::{TransferDirection, TransferItem, TransferSignal, TransferStatus};
use crate::backend::{FsError, TransferBackend};
use crate::panel::{DirectoryLoader, FileEntry, PaneKind, PanelState};
use crate::path::join;
use crate::session::SessionStore;

/// Buffered progress signals per running transfer
const PROGRESS_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Session not found for tab: {0}")]
    SessionNotFound(String),

    #[error("Directories cannot be transferred: {0}")]
    DirectoryNotSupported(String),

    #[error("Transfer not found: {0}")]
    NotFound(String),
}

impl Serialize for TransferError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// The dragged row and the pane it came from
#[derive(Debug, Clone)]
pub struct DragSource {
    pub pane: PaneKind,
    pub entry: FileEntry,
}

/// Where the row was released
#[derive(Debug, Clone)]
pub struct DropTarget {
    pub pane: PaneKind,
    /// Row under the cursor; `None` for empty space
    pub onto: Option<FileEntry>,
}

/// A resolved copy, ready to enqueue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferPlan {
    pub direction: TransferDirection,
    pub source_path: String,
    pub destination_path: String,
    pub file_name: String,
    pub file_size: u64,
}

impl TransferPlan {
    /// Pane that receives the copy
    pub fn destination_pane(&self) -> PaneKind {
        match self.direction {
            TransferDirection::Upload => PaneKind::Remote,
            TransferDirection::Download => PaneKind::Local,
        }
    }
}

/// Resolve a drop against the destination panel.
///
/// Same-pane drops are not transfers and yield `Ok(None)`.
pub fn plan_drop(
    source: &DragSource,
    target: &DropTarget,
    destination: &PanelState,
) -> Result<Option<TransferPlan>, TransferError> {
    if source.pane == target.pane {
        return Ok(None);
    }
    if source.entry.is_directory {
        return Err(TransferError::DirectoryNotSupported(source.entry.name.clone()));
    }

    let direction = match source.pane {
        PaneKind::Local => TransferDirection::Upload,
        PaneKind::Remote => TransferDirection::Download,
    };
    let directory = match &target.onto {
        Some(entry) if entry.is_directory => entry.path.as_str(),
        _ => destination.current_path.as_str(),
    };

    Ok(Some(TransferPlan {
        direction,
        source_path: source.entry.path.clone(),
        destination_path: join(directory, &source.entry.name, destination.style),
        file_name: source.entry.name.clone(),
        file_size: source.entry.size,
    }))
}

#[derive(Clone)]
pub struct TransferCoordinator {
    store: Arc<SessionStore>,
    loader: DirectoryLoader,
    queue: Arc<TransferQueue>,
    manager: Arc<TransferManager>,
    backend: Arc<dyn TransferBackend>,
}

impl TransferCoordinator {
    pub fn new(
        loader: DirectoryLoader,
        queue: Arc<TransferQueue>,
        manager: Arc<TransferManager>,
        backend: Arc<dyn TransferBackend>,
    ) -> Self {
        Self {
            store: loader.store().clone(),
            loader,
            queue,
            manager,
            backend,
        }
    }

    pub fn queue(&self) -> &Arc<TransferQueue> {
        &self.queue
    }

    pub fn manager(&self) -> &Arc<TransferManager> {
        &self.manager
    }

    /// Handle a drag release. Returns the queued transfer id, or `None` for
    /// a same-pane drop. The copy runs in the background.
    pub fn handle_drop(
        &self,
        tab_id: &str,
        source: &DragSource,
        target: &DropTarget,
    ) -> Result<Option<String>, TransferError> {
        let destination = self
            .store
            .panel(tab_id, target.pane)
            .ok_or_else(|| TransferError::SessionNotFound(tab_id.to_string()))?;
        let Some(plan) = plan_drop(source, target, &destination)? else {
            debug!("Same-pane drop on {} panel of {} ignored", target.pane, tab_id);
            return Ok(None);
        };
        let id = self.enqueue(tab_id, &plan);
        self.spawn_execute(id.clone());
        Ok(Some(id))
    }

    /// Copy every selected file of `source_pane` into the other pane's
    /// current directory. Directories in the selection are skipped.
    pub fn transfer_selected(&self, tab_id: &str, source_pane: PaneKind) -> Result<Vec<String>, TransferError> {
        let session = self
            .store
            .session(tab_id)
            .ok_or_else(|| TransferError::SessionNotFound(tab_id.to_string()))?;
        let destination = session.panel(source_pane.opposite());
        let target = DropTarget {
            pane: source_pane.opposite(),
            onto: None,
        };

        let mut ids = Vec::new();
        for entry in session.panel(source_pane).selected_entries() {
            if entry.is_directory {
                debug!("Skipping directory {} in selection transfer", entry.name);
                continue;
            }
            let source = DragSource {
                pane: source_pane,
                entry,
            };
            if let Some(plan) = plan_drop(&source, &target, destination)? {
                let id = self.enqueue(tab_id, &plan);
                self.spawn_execute(id.clone());
                ids.push(id);
            }
        }
        info!("Queued {} transfers from {} panel of {}", ids.len(), source_pane, tab_id);
        Ok(ids)
    }

    /// Add a plan to the queue in `pending` and register its control handle
    pub fn enqueue(&self, tab_id: &str, plan: &TransferPlan) -> String {
        let item = TransferItem::new(
            tab_id,
            plan.direction,
            plan.file_name.clone(),
            plan.file_size,
            plan.source_path.clone(),
            plan.destination_path.clone(),
        );
        let id = self.queue.enqueue(item);
        self.manager.register(&id);
        info!(
            "Queued {:?} {} -> {} ({})",
            plan.direction, plan.source_path, plan.destination_path, id
        );
        id
    }

    fn spawn_execute(&self, id: String) {
        let this = self.clone();
        tokio::spawn(async move {
            this.execute(&id).await;
        });
    }

    /// Run one queued transfer to a terminal status.
    ///
    /// Waits for a concurrency slot first; the item stays `pending` meanwhile.
    pub async fn execute(&self, id: &str) -> Option<TransferStatus> {
        let item = self.queue.get(id)?;
        let control = self
            .manager
            .get_control(id)
            .unwrap_or_else(|| self.manager.register(id));
        let _guard = TransferGuard::new(self.manager.clone(), id);

        let _permit = match self.manager.acquire_permit().await {
            Ok(permit) => permit,
            Err(e) => return Some(self.finish(&item, Err(e)).await),
        };

        if control.is_cancelled() {
            debug!("Transfer {} cancelled before start", id);
            return Some(self.finish(&item, Err(FsError::TransferCancelled)).await);
        }

        let Some(handle) = self.store.handle(&item.tab_id) else {
            return Some(
                self.finish(&item, Err(FsError::SessionNotFound(item.tab_id.clone())))
                    .await,
            );
        };

        let (tx, mut rx) = mpsc::channel(PROGRESS_CHANNEL_CAPACITY);
        let stream = async {
            match item.direction {
                TransferDirection::Upload => {
                    self.backend
                        .upload(&handle, &item.source_path, &item.destination_path, tx, control.clone())
                        .await
                }
                TransferDirection::Download => {
                    self.backend
                        .download(&handle, &item.source_path, &item.destination_path, tx, control.clone())
                        .await
                }
            }
        };
        // Applied in stream order; ends once the backend drops its sender
        let drain = async {
            while let Some(signal) = rx.recv().await {
                match signal {
                    TransferSignal::Started => {
                        self.queue.update_status(id, TransferStatus::Transferring, None);
                    }
                    TransferSignal::Progress { bytes, total_bytes } => {
                        self.queue.update_progress(id, bytes, total_bytes);
                    }
                }
            }
        };
        let (result, ()) = tokio::join!(stream, drain);

        Some(self.finish(&item, result).await)
    }

    async fn finish(&self, item: &TransferItem, result: Result<(), FsError>) -> TransferStatus {
        let id = item.id.as_str();
        let status = match result {
            Ok(()) => {
                // Backends may finish without announcing the stream
                if let Some(current) = self.queue.get(id) {
                    if matches!(current.status, TransferStatus::Pending | TransferStatus::Paused) {
                        self.queue.update_status(id, TransferStatus::Transferring, None);
                    }
                }
                self.queue.update_status(id, TransferStatus::Completed, None);
                info!("Transfer {} completed: {}", id, item.destination_path);
                TransferStatus::Completed
            }
            Err(FsError::TransferCancelled) => {
                self.queue.update_status(id, TransferStatus::Cancelled, None);
                info!("Transfer {} cancelled", id);
                TransferStatus::Cancelled
            }
            Err(e) => {
                warn!("Transfer {} failed: {}", id, e);
                self.queue
                    .update_status(id, TransferStatus::Failed, Some(e.to_string()));
                TransferStatus::Failed
            }
        };

        if status == TransferStatus::Completed {
            let pane = match item.direction {
                TransferDirection::Upload => PaneKind::Remote,
                TransferDirection::Download => PaneKind::Local,
            };
            // Copies leave the source panel alone
            self.loader.refresh(&item.tab_id, pane).await;
        }
        status
    }

    /// Request cancellation. A pending item is cancelled immediately.
    pub fn cancel(&self, id: &str) -> Result<(), TransferError> {
        let item = self
            .queue
            .get(id)
            .ok_or_else(|| TransferError::NotFound(id.to_string()))?;
        self.manager.cancel(id);
        if item.status == TransferStatus::Pending {
            self.queue.update_status(id, TransferStatus::Cancelled, None);
        }
        Ok(())
    }

    /// Suspend a running transfer. Returns false unless it was transferring.
    pub fn pause(&self, id: &str) -> Result<bool, TransferError> {
        let item = self
            .queue
            .get(id)
            .ok_or_else(|| TransferError::NotFound(id.to_string()))?;
        if item.status != TransferStatus::Transferring {
            return Ok(false);
        }
        if !self.manager.pause(id) {
            return Ok(false);
        }
        Ok(self.queue.update_status(id, TransferStatus::Paused, None))
    }

    pub fn resume(&self, id: &str) -> Result<bool, TransferError> {
        let item = self
            .queue
            .get(id)
            .ok_or_else(|| TransferError::NotFound(id.to_string()))?;
        if item.status != TransferStatus::Paused {
            return Ok(false);
        }
        let updated = self.queue.update_status(id, TransferStatus::Transferring, None);
        self.manager.resume(id);
        Ok(updated)
    }

    /// Cancel every unfinished transfer belonging to a tab
    pub fn cancel_tab(&self, tab_id: &str) -> usize {
        let mut count = 0;
        for item in self.queue.list() {
            if item.tab_id == tab_id && !item.status.is_terminal() && self.cancel(&item.id).is_ok() {
                count += 1;
            }
        }
        if count > 0 {
            info!("Cancelled {} transfers of tab {}", count, tab_id);
        }
        count
    }
}
