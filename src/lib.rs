//! OxidePane - state and orchestration core of a dual-pane local/remote
//! file manager
//!
//! The UI shell reads panel state from the [`session::SessionStore`],
//! issues navigation, file-operation and transfer intents through the
//! [`app::FileManager`], and subscribes to panel and transfer-queue events.
//! File systems, transfer protocols and the keychain sit behind the traits
//! in [`backend`].

pub mod app;
pub mod backend;
pub mod config;
pub mod credentials;
pub mod file_ops;
pub mod logging;
pub mod panel;
pub mod path;
pub mod session;
pub mod transfer;

#[cfg(test)]
mod test_support;

pub use app::{Collaborators, ConnectError, FileManager};
pub use logging::{init_logging, init_logging_with};
