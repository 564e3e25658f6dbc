//! Panel data types

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::path::{PanePath, PathStyle};

/// Name of the synthetic parent-directory entry
pub const PARENT_ENTRY_NAME: &str = "..";

/// Which side of the dual-pane browser
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaneKind {
    Local,
    Remote,
}

impl PaneKind {
    /// The pane on the other side
    pub fn opposite(&self) -> PaneKind {
        match self {
            PaneKind::Local => PaneKind::Remote,
            PaneKind::Remote => PaneKind::Local,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PaneKind::Local => "local",
            PaneKind::Remote => "remote",
        }
    }
}

impl std::fmt::Display for PaneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directory listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileEntry {
    /// File name (not full path)
    pub name: String,
    /// Absolute path in the owning pane's convention
    pub path: String,
    pub is_directory: bool,
    /// Size in bytes (meaningless for directories)
    pub size: u64,
    /// Last modified time (Unix timestamp). 0 means unknown or synthetic.
    pub modified: i64,
}

impl FileEntry {
    pub fn file(name: impl Into<String>, path: impl Into<String>, size: u64, modified: i64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: false,
            size,
            modified,
        }
    }

    pub fn directory(name: impl Into<String>, path: impl Into<String>, modified: i64) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            is_directory: true,
            size: 0,
            modified,
        }
    }

    /// `..` entry pointing at `parent_path`
    pub fn parent_entry(parent_path: impl Into<String>) -> Self {
        Self::directory(PARENT_ENTRY_NAME, parent_path, 0)
    }

    /// Whether this is the synthetic `..` row rather than a real file
    pub fn is_parent_entry(&self) -> bool {
        self.is_directory && self.modified == 0 && self.name == PARENT_ENTRY_NAME
    }
}

/// State of one pane of one session
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub pane: PaneKind,
    /// Absolute path in this pane's convention
    pub current_path: String,
    /// Separator convention of `current_path` and every entry path
    pub style: PathStyle,
    /// Listing in the order the backend returned it
    pub entries: Vec<FileEntry>,
    /// Paths of selected entries; always a subset of `entries[*].path`
    pub selected: HashSet<String>,
    /// Anchor for range selection
    pub last_selected_index: Option<usize>,
    pub loading: bool,
    pub error: Option<String>,
}

impl PanelState {
    /// Empty panel rooted at `path`
    pub fn new(pane: PaneKind, path: impl Into<String>) -> Self {
        let current_path = path.into();
        let style = match pane {
            PaneKind::Remote => PathStyle::Posix,
            PaneKind::Local => PathStyle::detect(&current_path),
        };
        Self {
            pane,
            current_path,
            style,
            entries: Vec::new(),
            selected: HashSet::new(),
            last_selected_index: None,
            loading: false,
            error: None,
        }
    }

    /// Current directory as a tagged path
    pub fn location(&self) -> PanePath {
        PanePath::new(self.current_path.clone(), self.style)
    }

    /// Index of the entry with `path`
    pub fn index_of(&self, path: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.path == path)
    }

    pub fn entry(&self, path: &str) -> Option<&FileEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    /// Replace the listing after a successful load.
    ///
    /// Selection and the range anchor are reset unconditionally.
    pub fn apply_listing(&mut self, path: String, entries: Vec<FileEntry>) {
        if self.pane == PaneKind::Local {
            self.style = PathStyle::detect(&path);
        }
        self.current_path = path;
        self.entries = entries;
        self.selected.clear();
        self.last_selected_index = None;
        self.loading = false;
        self.error = None;
    }

    /// Record a failed load. The previous listing stays visible.
    pub fn apply_error(&mut self, error: String) {
        self.error = Some(error);
        self.loading = false;
    }
}
