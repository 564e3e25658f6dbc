//! Dispatches file primitives to the local or remote backend by handle

use std::sync::Arc;

use async_trait::async_trait;

use super::{FileBackend, FsError, SessionHandle};
use crate::panel::FileEntry;

/// `None` handle goes to `local`, anything else to `remote`
pub struct RoutedFileBackend {
    local: Arc<dyn FileBackend>,
    remote: Arc<dyn FileBackend>,
}

impl RoutedFileBackend {
    pub fn new(local: Arc<dyn FileBackend>, remote: Arc<dyn FileBackend>) -> Self {
        Self { local, remote }
    }

    fn pick(&self, session: Option<&SessionHandle>) -> &Arc<dyn FileBackend> {
        match session {
            Some(_) => &self.remote,
            None => &self.local,
        }
    }
}

#[async_trait]
impl FileBackend for RoutedFileBackend {
    async fn list_dir(
        &self,
        session: Option<&SessionHandle>,
        path: &str,
    ) -> Result<Vec<FileEntry>, FsError> {
        self.pick(session).list_dir(session, path).await
    }

    async fn create_dir(&self, session: Option<&SessionHandle>, path: &str) -> Result<(), FsError> {
        self.pick(session).create_dir(session, path).await
    }

    async fn delete_path(
        &self,
        session: Option<&SessionHandle>,
        path: &str,
        is_directory: bool,
    ) -> Result<(), FsError> {
        self.pick(session)
            .delete_path(session, path, is_directory)
            .await
    }

    async fn rename_path(
        &self,
        session: Option<&SessionHandle>,
        old_path: &str,
        new_path: &str,
    ) -> Result<(), FsError> {
        self.pick(session)
            .rename_path(session, old_path, new_path)
            .await
    }
}
