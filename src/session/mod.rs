//! Session Management Module
//!
//! Per-tab sessions pairing a remote handle with its two panels:
//! - `store`: the injected single source of truth for panel state
//! - `events`: change notifications for the UI
//! - `sequencer`: per-panel load request ordering

pub mod events;
pub mod sequencer;
pub mod store;

pub use events::{StoreEvent, StoreEventEmitter};
pub use sequencer::LoadSequencer;
pub use store::{Session, SessionStore, StoreError};
