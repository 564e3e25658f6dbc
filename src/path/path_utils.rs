//! Cross-platform path utilities
//!
//! Pure string functions. Nothing here touches the file system, so the same
//! code handles local paths (either convention) and remote paths (always `/`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator convention of a pane path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathStyle {
    /// `/home/user`
    #[default]
    Posix,
    /// `C:\Users\user`
    Windows,
}

impl PathStyle {
    /// Primary separator for this style
    pub fn separator(&self) -> char {
        match self {
            PathStyle::Posix => '/',
            PathStyle::Windows => '\\',
        }
    }

    /// Whether `c` separates segments in this style.
    ///
    /// Windows accepts both separators, posix only `/`.
    pub fn is_separator(&self, c: char) -> bool {
        match self {
            PathStyle::Posix => c == '/',
            PathStyle::Windows => c == '/' || c == '\\',
        }
    }

    /// Infer the style of a local path once, when a panel first receives it.
    ///
    /// Only a backslash means windows. A drive path written with forward
    /// slashes (`D:/data`) stays posix so joins keep using `/`.
    pub fn detect(path: &str) -> Self {
        if path.contains('\\') {
            PathStyle::Windows
        } else {
            PathStyle::Posix
        }
    }
}

/// A path tagged with its separator convention
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PanePath {
    pub path: String,
    pub style: PathStyle,
}

impl PanePath {
    pub fn new(path: impl Into<String>, style: PathStyle) -> Self {
        Self {
            path: path.into(),
            style,
        }
    }

    /// Remote paths are always posix
    pub fn remote(path: impl Into<String>) -> Self {
        Self::new(path, PathStyle::Posix)
    }

    /// Local path with its style detected from the string
    pub fn local(path: impl Into<String>) -> Self {
        let path = path.into();
        let style = PathStyle::detect(&path);
        Self { path, style }
    }

    pub fn as_str(&self) -> &str {
        &self.path
    }

    pub fn parent(&self) -> PanePath {
        PanePath::new(parent(&self.path, self.style), self.style)
    }

    pub fn join(&self, component: &str) -> PanePath {
        PanePath::new(join(&self.path, component, self.style), self.style)
    }

    pub fn is_root(&self) -> bool {
        is_root(&self.path)
    }

    pub fn file_name(&self) -> &str {
        file_name(&self.path, self.style)
    }
}

impl fmt::Display for PanePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

fn has_drive_prefix(path: &str) -> bool {
    let bytes = path.as_bytes();
    bytes.len() >= 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Root detection.
///
/// A root is exactly `/`, or a drive-letter root of at most three characters
/// (`C:`, `C:\`, `C:/`).
pub fn is_root(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    path.len() <= 3 && has_drive_prefix(path)
}

/// Parent of `path`. The parent of a root is the root itself.
///
/// # Examples
/// ```
/// use oxidepane::path::{parent, PathStyle};
/// assert_eq!(parent("/home/user", PathStyle::Posix), "/home");
/// assert_eq!(parent("/home", PathStyle::Posix), "/");
/// assert_eq!(parent("C:\\Users\\me", PathStyle::Windows), "C:\\Users");
/// assert_eq!(parent("C:\\Users", PathStyle::Windows), "C:\\");
/// ```
pub fn parent(path: &str, style: PathStyle) -> String {
    if is_root(path) {
        return if path.len() == 2 {
            format!("{}{}", path, style.separator())
        } else {
            path.to_string()
        };
    }

    let trimmed = path.trim_end_matches(|c| style.is_separator(c));
    if trimmed.is_empty() {
        return "/".to_string();
    }

    match trimmed.rfind(|c| style.is_separator(c)) {
        Some(0) => "/".to_string(),
        Some(idx) => {
            let head = &trimmed[..idx];
            // "C:" must keep its separator to stay a root
            if head.len() == 2 && has_drive_prefix(head) {
                format!("{}{}", head, style.separator())
            } else {
                head.to_string()
            }
        }
        None => match style {
            PathStyle::Posix => "/".to_string(),
            PathStyle::Windows => trimmed.to_string(),
        },
    }
}

/// Join a single component onto `base` with the style's separator.
pub fn join(base: &str, component: &str, style: PathStyle) -> String {
    let component = component.trim_start_matches(|c| style.is_separator(c));
    if base.is_empty() {
        return component.to_string();
    }
    if base.ends_with(|c| style.is_separator(c)) {
        format!("{}{}", base, component)
    } else {
        format!("{}{}{}", base, style.separator(), component)
    }
}

/// Final segment of `path` (empty for a root).
pub fn file_name(path: &str, style: PathStyle) -> &str {
    if is_root(path) {
        return "";
    }
    let trimmed = path.trim_end_matches(|c| style.is_separator(c));
    match trimmed.rfind(|c| style.is_separator(c)) {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Replace only the final segment, keeping the parent and the separator
/// convention.
pub fn with_file_name(path: &str, new_name: &str, style: PathStyle) -> String {
    join(&parent(path, style), new_name, style)
}
