//! Directory Loader
//!
//! Per-panel async controller around the listing primitive. A successful
//! load replaces the listing and resets selection unconditionally; a failed
//! load records the error and leaves the previous listing untouched.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::types::{FileEntry, PaneKind};
use crate::backend::{FileBackend, SessionHandle};
use crate::path::{is_root, parent, PathStyle};
use crate::session::SessionStore;

/// Loader behaviour switches
#[derive(Debug, Clone, Copy, Default)]
pub struct LoaderOptions {
    /// Prepend a synthetic `..` entry when not at a root
    pub show_parent_entry: bool,
}

/// What happened to a load request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Listing applied
    Loaded { entries: usize },
    /// Listing failed; the message is also in the panel's `error`
    Failed(String),
    /// A newer request for the same panel was issued; result discarded
    Stale,
    /// Navigation refused because the panel is already loading
    Busy,
    /// `navigate_up` at a root
    AtRoot,
    /// The tab has no session (never existed or torn down mid-flight)
    SessionClosed,
}

#[derive(Clone)]
pub struct DirectoryLoader {
    store: Arc<SessionStore>,
    backend: Arc<dyn FileBackend>,
    options: LoaderOptions,
}

impl DirectoryLoader {
    pub fn new(store: Arc<SessionStore>, backend: Arc<dyn FileBackend>) -> Self {
        Self {
            store,
            backend,
            options: LoaderOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoaderOptions) -> Self {
        self.options = options;
        self
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// List `path` into the panel.
    ///
    /// Not guarded by the loading flag: concurrent loads for one panel all
    /// run, and only the most recently issued one may write its result.
    pub async fn load(&self, tab_id: &str, pane: PaneKind, path: &str) -> LoadOutcome {
        let Some((handle, seq)) = self.store.begin_load(tab_id, pane) else {
            return LoadOutcome::SessionClosed;
        };

        debug!("Loading {} panel of {} at {} (seq {})", pane, tab_id, path, seq);
        let session = match pane {
            PaneKind::Local => None,
            PaneKind::Remote => Some(&handle),
        };
        let result = self.backend.list_dir(session, path).await;

        if !self.still_current(tab_id, pane, seq, &handle) {
            debug!(
                "Discarding stale listing of {} for {} panel of {} (seq {})",
                path, pane, tab_id, seq
            );
            return LoadOutcome::Stale;
        }

        match result {
            Ok(mut entries) => {
                let style = match pane {
                    PaneKind::Remote => PathStyle::Posix,
                    PaneKind::Local => PathStyle::detect(path),
                };
                if self.options.show_parent_entry && !is_root(path) {
                    entries.insert(0, FileEntry::parent_entry(parent(path, style)));
                }
                let count = entries.len();
                let owned_path = path.to_string();
                match self
                    .store
                    .update_panel(tab_id, pane, move |panel| panel.apply_listing(owned_path, entries))
                {
                    Some(()) => {
                        info!("Loaded {} entries into {} panel at {}", count, pane, path);
                        LoadOutcome::Loaded { entries: count }
                    }
                    None => LoadOutcome::SessionClosed,
                }
            }
            Err(e) => {
                let message = e.to_string();
                warn!("Failed to list {} for {} panel: {}", path, pane, message);
                let msg = message.clone();
                match self
                    .store
                    .update_panel(tab_id, pane, move |panel| panel.apply_error(msg))
                {
                    Some(()) => LoadOutcome::Failed(message),
                    None => LoadOutcome::SessionClosed,
                }
            }
        }
    }

    /// User-initiated navigation. Refused while the panel is loading.
    pub async fn navigate(&self, tab_id: &str, pane: PaneKind, path: &str) -> LoadOutcome {
        match self.store.panel(tab_id, pane) {
            None => LoadOutcome::SessionClosed,
            Some(panel) if panel.loading => LoadOutcome::Busy,
            Some(_) => self.load(tab_id, pane, path).await,
        }
    }

    /// Go to the parent directory; no-op at a root
    pub async fn navigate_up(&self, tab_id: &str, pane: PaneKind) -> LoadOutcome {
        let Some(panel) = self.store.panel(tab_id, pane) else {
            return LoadOutcome::SessionClosed;
        };
        if panel.loading {
            return LoadOutcome::Busy;
        }
        if is_root(&panel.current_path) {
            return LoadOutcome::AtRoot;
        }
        let target = parent(&panel.current_path, panel.style);
        self.load(tab_id, pane, &target).await
    }

    /// Enter a directory row (including the synthetic `..`). Files are ignored.
    pub async fn open_entry(&self, tab_id: &str, pane: PaneKind, entry: &FileEntry) -> Option<LoadOutcome> {
        if !entry.is_directory {
            return None;
        }
        Some(self.navigate(tab_id, pane, &entry.path).await)
    }

    /// Reload the current directory. Selection is reset like any load; callers
    /// that want it back must re-select afterwards.
    pub async fn refresh(&self, tab_id: &str, pane: PaneKind) -> LoadOutcome {
        let Some(panel) = self.store.panel(tab_id, pane) else {
            return LoadOutcome::SessionClosed;
        };
        self.load(tab_id, pane, &panel.current_path).await
    }

    fn still_current(&self, tab_id: &str, pane: PaneKind, seq: u64, handle: &SessionHandle) -> bool {
        // A tab torn down and reopened restarts its counters, so also compare
        // the handle the request was issued against.
        self.store.sequencer().is_current(tab_id, pane, seq)
            && self.store.handle(tab_id).as_ref() == Some(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FsError;
    use crate::session::StoreEvent;
    use crate::test_support::FakeFileBackend;

    fn setup(backend: Arc<FakeFileBackend>) -> (Arc<SessionStore>, DirectoryLoader) {
        let store = Arc::new(SessionStore::new());
        store
            .create_session("tab", SessionHandle::new("h"), "/home/user", "/srv")
            .unwrap();
        let loader = DirectoryLoader::new(store.clone(), backend);
        (store, loader)
    }

    fn home_listing() -> Vec<FileEntry> {
        vec![
            FileEntry::directory("docs", "/home/user/docs", 1),
            FileEntry::file("a.txt", "/home/user/a.txt", 10, 1),
        ]
    }

    #[tokio::test]
    async fn test_load_replaces_listing_and_resets_selection() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/home/user", home_listing());
        let (store, loader) = setup(backend);

        assert_eq!(
            loader.load("tab", PaneKind::Local, "/home/user").await,
            LoadOutcome::Loaded { entries: 2 }
        );
        store.toggle_selection("tab", PaneKind::Local, "/home/user/docs", false);
        store.toggle_selection("tab", PaneKind::Local, "/home/user/a.txt", true);

        loader.refresh("tab", PaneKind::Local).await;
        let panel = store.panel("tab", PaneKind::Local).unwrap();
        assert_eq!(panel.entries.len(), 2);
        assert!(panel.selected.is_empty());
        assert_eq!(panel.last_selected_index, None);
        assert!(!panel.loading);
    }

    #[tokio::test]
    async fn test_failed_load_keeps_previous_state() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/home/user", home_listing());
        let (store, loader) = setup(backend.clone());
        loader.load("tab", PaneKind::Local, "/home/user").await;

        backend.fail_list("/home/user/secret", FsError::PermissionDenied("/home/user/secret".into()));
        let outcome = loader.load("tab", PaneKind::Local, "/home/user/secret").await;
        assert!(matches!(outcome, LoadOutcome::Failed(_)));

        let panel = store.panel("tab", PaneKind::Local).unwrap();
        assert_eq!(panel.current_path, "/home/user");
        assert_eq!(panel.entries.len(), 2);
        assert!(panel.error.as_deref().unwrap().contains("Permission denied"));
        assert!(!panel.loading);
    }

    #[tokio::test]
    async fn test_remote_load_uses_handle() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/srv", vec![FileEntry::file("x", "/srv/x", 1, 1)]);
        let (_store, loader) = setup(backend.clone());
        loader.load("tab", PaneKind::Remote, "/srv").await;
        let calls = backend.list_calls();
        assert_eq!(calls, vec![(Some("h".to_string()), "/srv".to_string())]);
    }

    #[tokio::test]
    async fn test_navigate_up_and_root_noop() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/home", vec![FileEntry::directory("user", "/home/user", 1)]);
        backend.set_listing("/", vec![FileEntry::directory("home", "/home", 1)]);
        let (store, loader) = setup(backend.clone());

        assert!(matches!(
            loader.navigate_up("tab", PaneKind::Local).await,
            LoadOutcome::Loaded { .. }
        ));
        assert_eq!(store.panel("tab", PaneKind::Local).unwrap().current_path, "/home");
        loader.navigate_up("tab", PaneKind::Local).await;
        assert_eq!(store.panel("tab", PaneKind::Local).unwrap().current_path, "/");

        let calls_before = backend.list_calls().len();
        assert_eq!(loader.navigate_up("tab", PaneKind::Local).await, LoadOutcome::AtRoot);
        assert_eq!(backend.list_calls().len(), calls_before);
    }

    #[tokio::test]
    async fn test_navigate_refused_while_loading() {
        let backend = Arc::new(FakeFileBackend::new());
        let (store, loader) = setup(backend);
        store.update_panel("tab", PaneKind::Remote, |p| p.loading = true);
        assert_eq!(loader.navigate("tab", PaneKind::Remote, "/tmp").await, LoadOutcome::Busy);
        assert_eq!(loader.navigate_up("tab", PaneKind::Remote).await, LoadOutcome::Busy);
    }

    #[tokio::test]
    async fn test_parent_entry_option() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/srv/data", vec![FileEntry::file("f", "/srv/data/f", 1, 1)]);
        backend.set_listing("/", vec![FileEntry::directory("srv", "/srv", 1)]);
        let (store, loader) = setup(backend);
        let loader = loader.with_options(LoaderOptions {
            show_parent_entry: true,
        });

        loader.load("tab", PaneKind::Remote, "/srv/data").await;
        let panel = store.panel("tab", PaneKind::Remote).unwrap();
        assert_eq!(panel.entries.len(), 2);
        assert!(panel.entries[0].is_parent_entry());
        assert_eq!(panel.entries[0].path, "/srv");
        assert_eq!(panel.entries[0].modified, 0);

        loader.load("tab", PaneKind::Remote, "/").await;
        let panel = store.panel("tab", PaneKind::Remote).unwrap();
        assert_eq!(panel.entries.len(), 1);
        assert!(!panel.entries[0].is_parent_entry());
    }

    #[tokio::test]
    async fn test_stale_response_discarded() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/slow", vec![FileEntry::file("old", "/slow/old", 1, 1)]);
        backend.set_listing("/fast", vec![FileEntry::file("new", "/fast/new", 1, 1)]);
        let gate = backend.gate_list("/slow");
        let (store, loader) = setup(backend);

        let slow_loader = loader.clone();
        let slow = tokio::spawn(async move { slow_loader.load("tab", PaneKind::Remote, "/slow").await });
        // Let the slow request register and block on its gate
        gate.wait_entered().await;

        let fast = loader.load("tab", PaneKind::Remote, "/fast").await;
        assert_eq!(fast, LoadOutcome::Loaded { entries: 1 });

        gate.release();
        assert_eq!(slow.await.unwrap(), LoadOutcome::Stale);

        let panel = store.panel("tab", PaneKind::Remote).unwrap();
        assert_eq!(panel.current_path, "/fast");
        assert_eq!(panel.entries[0].name, "new");
    }

    #[tokio::test]
    async fn test_teardown_mid_load_writes_nothing() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/srv", vec![FileEntry::file("x", "/srv/x", 1, 1)]);
        let gate = backend.gate_list("/srv");
        let (store, loader) = setup(backend);

        let task_loader = loader.clone();
        let task = tokio::spawn(async move { task_loader.load("tab", PaneKind::Remote, "/srv").await });
        gate.wait_entered().await;
        store.remove_session("tab");
        gate.release();

        assert_eq!(task.await.unwrap(), LoadOutcome::Stale);
        assert!(store.panel("tab", PaneKind::Remote).is_none());
    }

    #[tokio::test]
    async fn test_load_emits_panel_events() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/srv", vec![]);
        let (store, loader) = setup(backend);
        let mut rx = store.subscribe();
        loader.load("tab", PaneKind::Remote, "/srv").await;
        // loading=true, then the listing
        for _ in 0..2 {
            assert_eq!(
                rx.recv().await.unwrap(),
                StoreEvent::PanelUpdated {
                    tab_id: "tab".into(),
                    pane: PaneKind::Remote
                }
            );
        }
    }

    #[tokio::test]
    async fn test_open_entry() {
        let backend = Arc::new(FakeFileBackend::new());
        backend.set_listing("/home/user", home_listing());
        backend.set_listing("/home/user/docs", vec![FileEntry::file("n.md", "/home/user/docs/n.md", 3, 1)]);
        backend.set_listing("/home", vec![FileEntry::directory("user", "/home/user", 1)]);
        let (store, loader) = setup(backend.clone());
        loader.load("tab", PaneKind::Local, "/home/user").await;

        // Files are not opened and cause no listing call
        let file = FileEntry::file("a.txt", "/home/user/a.txt", 10, 1);
        assert_eq!(loader.open_entry("tab", PaneKind::Local, &file).await, None);
        assert_eq!(backend.list_calls().len(), 1);

        let docs = FileEntry::directory("docs", "/home/user/docs", 1);
        assert_eq!(
            loader.open_entry("tab", PaneKind::Local, &docs).await,
            Some(LoadOutcome::Loaded { entries: 1 })
        );
        assert_eq!(store.panel("tab", PaneKind::Local).unwrap().current_path, "/home/user/docs");

        let up = FileEntry::parent_entry("/home");
        assert_eq!(
            loader.open_entry("tab", PaneKind::Local, &up).await,
            Some(LoadOutcome::Loaded { entries: 1 })
        );
        assert_eq!(store.panel("tab", PaneKind::Local).unwrap().current_path, "/home");
    }

    #[tokio::test]
    async fn test_unknown_tab() {
        let backend = Arc::new(FakeFileBackend::new());
        let (_store, loader) = setup(backend);
        assert_eq!(loader.load("nope", PaneKind::Local, "/").await, LoadOutcome::SessionClosed);
        assert_eq!(loader.refresh("nope", PaneKind::Local).await, LoadOutcome::SessionClosed);
    }
}
