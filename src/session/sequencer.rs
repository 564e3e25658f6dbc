//! Per-panel load request counters
//!
//! Every directory load takes the next value for its panel. A response is
//! applied only if its value is still the latest issued, so a slow response
//! can never overwrite a newer listing.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use crate::panel::PaneKind;

pub struct LoadSequencer {
    counters: DashMap<(String, PaneKind), AtomicU64>,
}

impl LoadSequencer {
    pub fn new() -> Self {
        Self {
            counters: DashMap::new(),
        }
    }

    /// Issue the next request number for a panel. Starts at 1; 0 means none
    /// issued yet.
    pub fn next(&self, tab_id: &str, pane: PaneKind) -> u64 {
        self.counters
            .entry((tab_id.to_string(), pane))
            .or_insert_with(|| AtomicU64::new(0))
            .fetch_add(1, Ordering::SeqCst)
            + 1
    }

    /// Latest issued request number, without incrementing
    pub fn current(&self, tab_id: &str, pane: PaneKind) -> u64 {
        self.counters
            .get(&(tab_id.to_string(), pane))
            .map(|c| c.load(Ordering::SeqCst))
            .unwrap_or(0)
    }

    pub fn is_current(&self, tab_id: &str, pane: PaneKind, seq: u64) -> bool {
        seq != 0 && self.current(tab_id, pane) == seq
    }

    /// Forget both panels of a tab
    pub fn remove(&self, tab_id: &str) {
        self.counters.retain(|(tab, _), _| tab != tab_id);
    }
}

impl Default for LoadSequencer {
    fn default() -> Self {
        Self::new()
    }
}
