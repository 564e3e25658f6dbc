//! Session Store
//!
//! Single source of truth for panel state. One instance is owned by the
//! application root and handed to every component by `Arc`; there is no
//! process-wide store. All mutations go through [`SessionStore::update_panel`],
//! which applies a closure to the live state under the entry lock, so callers
//! always merge into the current state rather than into a copy taken before
//! an `await`.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::events::{StoreEvent, StoreEventEmitter};
use super::sequencer::LoadSequencer;
use crate::backend::SessionHandle;
use crate::panel::{FileEntry, PaneKind, PanelState};

/// One tab's remote connection and its two panels
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Owning UI context
    pub tab_id: String,
    /// Handle to the remote connection
    pub session_id: SessionHandle,
    pub local_panel: PanelState,
    pub remote_panel: PanelState,
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        tab_id: impl Into<String>,
        session_id: SessionHandle,
        local_path: impl Into<String>,
        remote_path: impl Into<String>,
    ) -> Self {
        Self {
            tab_id: tab_id.into(),
            session_id,
            local_panel: PanelState::new(PaneKind::Local, local_path),
            remote_panel: PanelState::new(PaneKind::Remote, remote_path),
            created_at: Utc::now(),
        }
    }

    pub fn panel(&self, pane: PaneKind) -> &PanelState {
        match pane {
            PaneKind::Local => &self.local_panel,
            PaneKind::Remote => &self.remote_panel,
        }
    }

    pub fn panel_mut(&mut self, pane: PaneKind) -> &mut PanelState {
        match pane {
            PaneKind::Local => &mut self.local_panel,
            PaneKind::Remote => &mut self.remote_panel,
        }
    }

    /// Handle to pass to file primitives: `None` addresses the local side
    pub fn handle_for(&self, pane: PaneKind) -> Option<&SessionHandle> {
        match pane {
            PaneKind::Local => None,
            PaneKind::Remote => Some(&self.session_id),
        }
    }
}

/// Store errors
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("Tab {0} already has a session")]
    TabOccupied(String),

    #[error("Session not found for tab: {0}")]
    SessionNotFound(String),
}

/// Sessions keyed by owning tab id
pub struct SessionStore {
    sessions: DashMap<String, Session>,
    sequencer: LoadSequencer,
    events: StoreEventEmitter,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
            sequencer: LoadSequencer::new(),
            events: StoreEventEmitter::new(),
        }
    }

    /// Attach a freshly opened session to a tab
    pub fn create_session(
        &self,
        tab_id: &str,
        handle: SessionHandle,
        local_path: &str,
        remote_path: &str,
    ) -> Result<(), StoreError> {
        match self.sessions.entry(tab_id.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(StoreError::TabOccupied(tab_id.to_string()))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Session::new(tab_id, handle.clone(), local_path, remote_path));
            }
        }

        info!("Session {} attached to tab {}", handle, tab_id);
        self.events.emit(StoreEvent::SessionCreated {
            tab_id: tab_id.to_string(),
            session_id: handle.0,
        });
        Ok(())
    }

    /// Detach a tab's session. Only one caller ever receives the session, so
    /// only one caller releases its handle.
    pub fn remove_session(&self, tab_id: &str) -> Option<Session> {
        let (_, session) = self.sessions.remove(tab_id)?;
        self.sequencer.remove(tab_id);
        info!("Session {} removed from tab {}", session.session_id, tab_id);
        self.events.emit(StoreEvent::SessionRemoved {
            tab_id: tab_id.to_string(),
            session_id: session.session_id.0.clone(),
        });
        Some(session)
    }

    pub fn contains(&self, tab_id: &str) -> bool {
        self.sessions.contains_key(tab_id)
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Snapshot of a whole session
    pub fn session(&self, tab_id: &str) -> Option<Session> {
        self.sessions.get(tab_id).map(|s| s.clone())
    }

    pub fn handle(&self, tab_id: &str) -> Option<SessionHandle> {
        self.sessions.get(tab_id).map(|s| s.session_id.clone())
    }

    /// Tab owning a remote handle
    pub fn find_tab_by_handle(&self, handle: &SessionHandle) -> Option<String> {
        self.sessions
            .iter()
            .find(|s| &s.session_id == handle)
            .map(|s| s.key().clone())
    }

    /// Snapshot of one panel
    pub fn panel(&self, tab_id: &str, pane: PaneKind) -> Option<PanelState> {
        self.sessions.get(tab_id).map(|s| s.panel(pane).clone())
    }

    /// Apply `f` to the live panel state and notify subscribers.
    ///
    /// Returns `None` when the tab has no session (e.g. it was torn down while
    /// the caller was awaiting I/O), in which case nothing is written.
    pub fn update_panel<R>(
        &self,
        tab_id: &str,
        pane: PaneKind,
        f: impl FnOnce(&mut PanelState) -> R,
    ) -> Option<R> {
        let result = {
            let mut session = self.sessions.get_mut(tab_id)?;
            f(session.panel_mut(pane))
        };
        self.events.emit(StoreEvent::PanelUpdated {
            tab_id: tab_id.to_string(),
            pane,
        });
        Some(result)
    }

    /// Mark a panel as loading and issue its next load number.
    ///
    /// Both happen under the session's map guard, and `remove_session` drops
    /// the session before forgetting its counters, so a closed tab never gets
    /// a counter back. `None` when the tab has no session.
    pub fn begin_load(&self, tab_id: &str, pane: PaneKind) -> Option<(SessionHandle, u64)> {
        let started = {
            let mut session = self.sessions.get_mut(tab_id)?;
            let seq = self.sequencer.next(tab_id, pane);
            session.panel_mut(pane).loading = true;
            (session.session_id.clone(), seq)
        };
        self.events.emit(StoreEvent::PanelUpdated {
            tab_id: tab_id.to_string(),
            pane,
        });
        Some(started)
    }

    pub fn sequencer(&self) -> &LoadSequencer {
        &self.sequencer
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    // Selection engine entry points

    pub fn toggle_selection(&self, tab_id: &str, pane: PaneKind, path: &str, multi: bool) -> bool {
        debug!("toggle {} {} {} multi={}", tab_id, pane, path, multi);
        self.update_panel(tab_id, pane, |panel| panel.toggle(path, multi))
            .is_some()
    }

    pub fn select_range(&self, tab_id: &str, pane: PaneKind, end_index: usize) -> bool {
        self.update_panel(tab_id, pane, |panel| panel.select_range(end_index))
            .is_some()
    }

    pub fn select_all(&self, tab_id: &str, pane: PaneKind) -> bool {
        self.update_panel(tab_id, pane, |panel| panel.select_all())
            .is_some()
    }

    pub fn clear_selection(&self, tab_id: &str, pane: PaneKind) -> bool {
        self.update_panel(tab_id, pane, |panel| panel.clear_selection())
            .is_some()
    }

    pub fn selected_entries(&self, tab_id: &str, pane: PaneKind) -> Vec<FileEntry> {
        self.sessions
            .get(tab_id)
            .map(|s| s.panel(pane).selected_entries())
            .unwrap_or_default()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
