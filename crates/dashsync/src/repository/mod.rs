//! The version-controlled directory dashboards are mirrored into.
//!
//! [`GitRepository`] drives a real clone through the `git` CLI;
//! [`LocalDirectory`] is a plain directory for pull-only setups.

pub mod error;
pub mod git;
pub mod local;
pub mod types;

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;

pub use error::{classify_git_error, GitError, Result};
pub use git::GitRepository;
pub use local::LocalDirectory;
pub use types::{ChangedPaths, CommitAuthor, FileChange, Revision};

/// Working tree plus history.
///
/// A `None` revision means the branch has no commits yet.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Directory holding the dashboard files.
    fn root(&self) -> &Path;

    /// Brings the working tree up to date with the remote, cloning it first
    /// when `allow_clone` is set and no clone exists.
    async fn sync(&self, allow_clone: bool) -> Result<Option<Revision>>;

    /// Publishes local commits. Nothing to push, a remote that moved ahead
    /// and an empty history are not errors.
    async fn push(&self) -> Result<()>;

    /// Stages `paths` (relative to [`root`](Repository::root)) and commits
    /// them as the bot identity. `None` when nothing changed.
    async fn commit(&self, message: &str, paths: &[String]) -> Result<Option<Revision>>;

    async fn latest_revision(&self) -> Result<Option<Revision>>;

    /// Every file tracked at `revision`, keyed by relative path.
    async fn files_at(&self, revision: &Revision) -> Result<BTreeMap<String, Vec<u8>>>;

    /// Paths changed after `from` up to and including `to`, ignoring commits
    /// authored by `exclude_author_email`. `from = None` means the whole history.
    async fn changed_paths(
        &self,
        from: Option<&Revision>,
        to: &Revision,
        exclude_author_email: &str,
    ) -> Result<ChangedPaths>;
}
