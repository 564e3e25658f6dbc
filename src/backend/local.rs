//! Local file system backend over `tokio::fs`

use std::time::SystemTime;

use async_trait::async_trait;
use tracing::{debug, info};

use super::{FileBackend, FsError, SessionHandle};
use crate::panel::FileEntry;
use crate::path::{join, PathStyle};

/// Local file system primitives
#[derive(Debug, Clone, Default)]
pub struct LocalFileBackend;

impl LocalFileBackend {
    pub fn new() -> Self {
        Self
    }

    fn reject_session(session: Option<&SessionHandle>) -> Result<(), FsError> {
        match session {
            Some(handle) => Err(FsError::Unsupported(format!(
                "local backend called with remote session {}",
                handle
            ))),
            None => Ok(()),
        }
    }
}

/// mtime as unix seconds, 0 when unavailable
fn mtime_secs(metadata: &std::fs::Metadata) -> i64 {
    metadata
        .modified()
        .ok()
        .and_then(|t| t.duration_since(SystemTime::UNIX_EPOCH).ok())
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[async_trait]
impl FileBackend for LocalFileBackend {
    async fn list_dir(
        &self,
        session: Option<&SessionHandle>,
        path: &str,
    ) -> Result<Vec<FileEntry>, FsError> {
        Self::reject_session(session)?;
        let style = PathStyle::detect(path);

        let mut read_dir = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(e, path))?;

        let mut entries = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| FsError::from_io(e, path))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            // Follows symlinks so a link to a directory browses like one
            let metadata = match tokio::fs::metadata(entry.path()).await {
                Ok(m) => m,
                Err(e) => {
                    debug!("Skipping {}: {}", name, e);
                    continue;
                }
            };
            let is_directory = metadata.is_dir();
            entries.push(FileEntry {
                path: join(path, &name, style),
                name,
                is_directory,
                size: if is_directory { 0 } else { metadata.len() },
                modified: mtime_secs(&metadata),
            });
        }

        // Directories first, then by name
        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
        });

        debug!("Listed {} local entries in {}", entries.len(), path);
        Ok(entries)
    }

    async fn create_dir(&self, session: Option<&SessionHandle>, path: &str) -> Result<(), FsError> {
        Self::reject_session(session)?;
        info!("Creating local directory: {}", path);
        tokio::fs::create_dir(path)
            .await
            .map_err(|e| FsError::from_io(e, path))
    }

    async fn delete_path(
        &self,
        session: Option<&SessionHandle>,
        path: &str,
        is_directory: bool,
    ) -> Result<(), FsError> {
        Self::reject_session(session)?;
        info!("Deleting local path: {} (directory: {})", path, is_directory);
        let result = if is_directory {
            tokio::fs::remove_dir_all(path).await
        } else {
            tokio::fs::remove_file(path).await
        };
        result.map_err(|e| FsError::from_io(e, path))
    }

    async fn rename_path(
        &self,
        session: Option<&SessionHandle>,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), FsError> {
        Self::reject_session(session)?;
        info!("Renaming local {} to {}", old_path, new_path);
        tokio::fs::rename(old_path, new_path)
            .await
            .map_err(|e| FsError::from_io(e, old_path))
    }
}
