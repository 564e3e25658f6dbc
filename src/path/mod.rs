//! Path semantics for both panes
//!
//! Local panes may use either separator depending on the host; remote panes
//! always use `/`. The separator convention is carried explicitly as a
//! [`PathStyle`] instead of being guessed at each call site.

pub mod path_utils;

pub use path_utils::{
    file_name, is_root, join, parent, with_file_name, PanePath, PathStyle,
};
