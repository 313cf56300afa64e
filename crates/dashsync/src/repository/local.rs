//! Plain directory without version control.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::error::{GitError, Result};
use super::types::{ChangedPaths, Revision};
use super::Repository;

/// Directory the pull pass writes into when no git remote is configured.
///
/// There is no history: sync only creates the directory, and commits and
/// pushes do nothing.
pub struct LocalDirectory {
    path: PathBuf,
}

impl LocalDirectory {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Repository for LocalDirectory {
    fn root(&self) -> &Path {
        &self.path
    }

    async fn sync(&self, allow_clone: bool) -> Result<Option<Revision>> {
        if !self.path.is_dir() {
            if !allow_clone {
                return Err(GitError::NotInitialized(self.path.clone()));
            }
            tokio::fs::create_dir_all(&self.path).await?;
            log::info!("Created sync directory {}", self.path.display());
        }
        Ok(None)
    }

    async fn push(&self) -> Result<()> {
        Ok(())
    }

    async fn commit(&self, _message: &str, paths: &[String]) -> Result<Option<Revision>> {
        log::debug!("{} file(s) written, no history to record", paths.len());
        Ok(None)
    }

    async fn latest_revision(&self) -> Result<Option<Revision>> {
        Ok(None)
    }

    async fn files_at(&self, _revision: &Revision) -> Result<BTreeMap<String, Vec<u8>>> {
        Ok(BTreeMap::new())
    }

    async fn changed_paths(
        &self,
        _from: Option<&Revision>,
        _to: &Revision,
        _exclude_author_email: &str,
    ) -> Result<ChangedPaths> {
        Ok(ChangedPaths::default())
    }
}
