//! Panels: listing state, selection and directory loading

pub mod loader;
pub mod selection;
pub mod types;

pub use loader::{DirectoryLoader, LoadOutcome, LoaderOptions};
pub use types::{FileEntry, PaneKind, PanelState, PARENT_ENTRY_NAME};
