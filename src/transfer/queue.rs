//! Transfer Queue
//!
//! Ordered, observable list of transfer items. The queue owns every status
//! change and rejects transitions the state machine does not allow, so a
//! late progress report can never resurrect a finished transfer.

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::{TransferItem, TransferProgress, TransferStatus};

const QUEUE_EVENT_CAPACITY: usize = 256;

/// Queue change notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransferEvent {
    Added { item: TransferItem },
    Updated { item: TransferItem },
    Removed { id: String },
}

pub struct TransferQueue {
    items: RwLock<Vec<TransferItem>>,
    events: broadcast::Sender<TransferEvent>,
}

impl TransferQueue {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(QUEUE_EVENT_CAPACITY);
        Self {
            items: RwLock::new(Vec::new()),
            events,
        }
    }

    /// Append an item in `pending`, returning its id
    pub fn enqueue(&self, mut item: TransferItem) -> String {
        item.status = TransferStatus::Pending;
        item.error = None;
        let id = item.id.clone();
        debug!("Enqueued transfer {} ({})", id, item.file_name);
        self.items.write().push(item.clone());
        let _ = self.events.send(TransferEvent::Added { item });
        id
    }

    /// Record byte progress. Ignored unless the item is transferring.
    pub fn update_progress(&self, id: &str, bytes: u64, total_bytes: u64) -> bool {
        let updated = {
            let mut items = self.items.write();
            let Some(item) = items.iter_mut().find(|i| i.id == id) else {
                return false;
            };
            if item.status != TransferStatus::Transferring {
                debug!("Dropping progress for {} in status {:?}", id, item.status);
                return false;
            }
            item.progress = TransferProgress::new(bytes, total_bytes);
            item.clone()
        };
        let _ = self.events.send(TransferEvent::Updated { item: updated });
        true
    }

    /// Move an item to `status`. Invalid transitions are logged and ignored.
    ///
    /// `completed` pins progress to the full size; `failed` carries `error`.
    pub fn update_status(&self, id: &str, status: TransferStatus, error: Option<String>) -> bool {
        let updated = {
            let mut items = self.items.write();
            let Some(item) = items.iter_mut().find(|i| i.id == id) else {
                return false;
            };
            if !item.status.can_transition_to(status) {
                warn!(
                    "Ignoring transfer {} transition {:?} -> {:?}",
                    id, item.status, status
                );
                return false;
            }
            item.status = status;
            match status {
                TransferStatus::Completed => {
                    let total = if item.progress.total_bytes > 0 {
                        item.progress.total_bytes
                    } else {
                        item.file_size
                    };
                    item.progress = TransferProgress {
                        bytes: total,
                        total_bytes: total,
                        percentage: 100,
                    };
                    item.error = None;
                }
                TransferStatus::Failed => item.error = error,
                _ => {}
            }
            item.clone()
        };
        debug!("Transfer {} is now {:?}", id, status);
        let _ = self.events.send(TransferEvent::Updated { item: updated });
        true
    }

    pub fn remove(&self, id: &str) -> Option<TransferItem> {
        let removed = {
            let mut items = self.items.write();
            let index = items.iter().position(|i| i.id == id)?;
            items.remove(index)
        };
        let _ = self.events.send(TransferEvent::Removed { id: id.to_string() });
        Some(removed)
    }

    /// Drop completed and failed items. Cancelled items stay listed.
    pub fn clear_completed(&self) -> usize {
        let removed: Vec<String> = {
            let mut items = self.items.write();
            let ids = items
                .iter()
                .filter(|i| i.status.is_clearable())
                .map(|i| i.id.clone())
                .collect();
            items.retain(|i| !i.status.is_clearable());
            ids
        };
        for id in &removed {
            let _ = self.events.send(TransferEvent::Removed { id: id.clone() });
        }
        removed.len()
    }

    pub fn get(&self, id: &str) -> Option<TransferItem> {
        self.items.read().iter().find(|i| i.id == id).cloned()
    }

    /// Snapshot in insertion order
    pub fn list(&self) -> Vec<TransferItem> {
        self.items.read().clone()
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransferEvent> {
        self.events.subscribe()
    }
}

impl Default for TransferQueue {
    fn default() -> Self {
        Self::new()
    }
}
