//! Session store change events
//!
//! The UI subscribes once and re-reads the affected panel on each event.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::panel::PaneKind;

/// Buffered events per subscriber before it starts lagging
const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum StoreEvent {
    /// A remote connection was attached to a tab
    SessionCreated { tab_id: String, session_id: String },
    /// A tab's session was torn down
    SessionRemoved { tab_id: String, session_id: String },
    /// Listing, selection, loading flag or error of one panel changed
    PanelUpdated { tab_id: String, pane: PaneKind },
}

/// Broadcast sender that tolerates having no subscribers
#[derive(Clone)]
pub struct StoreEventEmitter {
    tx: broadcast::Sender<StoreEvent>,
}

impl StoreEventEmitter {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn emit(&self, event: StoreEvent) {
        // No receivers is the normal headless case
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.tx.subscribe()
    }
}

impl Default for StoreEventEmitter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for StoreEventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEventEmitter")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}
