//! File Operations
//!
//! Create, delete and rename in either pane.

pub mod controller;
pub mod validate;

pub use controller::{DeleteReport, FileOpError, FileOperations};
pub use validate::{validate_name, ValidationError, FORBIDDEN_CHARS, MAX_NAME_LENGTH};
