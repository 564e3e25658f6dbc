//! Selection engine
//!
//! Synchronous, total operations over a panel's current listing. None of them
//! perform I/O or fail; unknown paths and out-of-range indices are ignored.

use super::types::{FileEntry, PanelState};

impl PanelState {
    /// Toggle `path`.
    ///
    /// Without `multi`, clicking the sole selected item deselects it and
    /// anything else collapses the selection to `{path}`. With `multi`, `path`
    /// is flipped independently of the other members.
    pub fn toggle(&mut self, path: &str, multi: bool) {
        let index = self.index_of(path);
        if index.is_none() {
            // Not in the listing, so it can never be selected
            return;
        }

        if multi {
            if !self.selected.remove(path) {
                self.selected.insert(path.to_string());
            }
        } else if self.selected.len() == 1 && self.selected.contains(path) {
            self.selected.clear();
        } else {
            self.selected.clear();
            self.selected.insert(path.to_string());
        }

        self.last_selected_index = index;
    }

    /// Add every entry between the anchor and `end_index` (inclusive).
    ///
    /// Additive: prior members stay selected. Without a valid anchor this
    /// behaves like a plain single selection of `end_index`.
    pub fn select_range(&mut self, end_index: usize) {
        if end_index >= self.entries.len() {
            return;
        }

        let anchor = match self.last_selected_index {
            Some(anchor) if anchor < self.entries.len() => anchor,
            _ => {
                let path = self.entries[end_index].path.clone();
                self.selected.insert(path);
                self.last_selected_index = Some(end_index);
                return;
            }
        };

        let (start, end) = if anchor <= end_index {
            (anchor, end_index)
        } else {
            (end_index, anchor)
        };
        for entry in &self.entries[start..=end] {
            self.selected.insert(entry.path.clone());
        }
        self.last_selected_index = Some(end_index);
    }

    /// Select every entry except the synthetic parent row
    pub fn select_all(&mut self) {
        self.selected = self
            .entries
            .iter()
            .filter(|e| !e.is_parent_entry())
            .map(|e| e.path.clone())
            .collect();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.last_selected_index = None;
    }

    pub fn is_selected(&self, path: &str) -> bool {
        self.selected.contains(path)
    }

    /// Selected entries in listing order
    pub fn selected_entries(&self) -> Vec<FileEntry> {
        self.entries
            .iter()
            .filter(|e| self.selected.contains(&e.path))
            .cloned()
            .collect()
    }

    /// Drop selected paths that are no longer listed and an anchor that no
    /// longer points into the listing.
    pub fn prune_selection(&mut self) {
        let entries = &self.entries;
        self.selected
            .retain(|path| entries.iter().any(|e| &e.path == path));
        if matches!(self.last_selected_index, Some(i) if i >= entries.len()) {
            self.last_selected_index = None;
        }
    }
}
