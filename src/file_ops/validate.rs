//! File and folder name validation
//!
//! Runs before any I/O. The rules are those of the most restrictive file
//! system either pane may sit on, so a name accepted here is valid on both.

/// Maximum name length in bytes
pub const MAX_NAME_LENGTH: usize = 255;

/// Characters Windows file systems reject, besides the separators
pub const FORBIDDEN_CHARS: [char; 7] = ['<', '>', ':', '"', '|', '?', '*'];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Name cannot be empty")]
    Empty,

    #[error("Name cannot contain path separators")]
    ContainsSeparator,

    #[error("Name cannot contain '{0}'")]
    ForbiddenCharacter(char),

    #[error("'{0}' is not a valid name")]
    Reserved(String),

    #[error("Name is too long ({0} bytes, max 255)")]
    TooLong(usize),
}

impl serde::Serialize for ValidationError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

/// Check a single path segment supplied by the user
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::Empty);
    }
    if name == "." || name == ".." {
        return Err(ValidationError::Reserved(name.to_string()));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ValidationError::ContainsSeparator);
    }
    if let Some(c) = name.chars().find(|c| FORBIDDEN_CHARS.contains(c)) {
        return Err(ValidationError::ForbiddenCharacter(c));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong(name.len()));
    }
    Ok(())
}
