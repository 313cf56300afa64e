//! Repository error types.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while operating on the dashboard repository.
#[derive(Error, Debug)]
pub enum GitError {
    #[error("Git operation failed: {0}")]
    Operation(String),

    #[error("Git network error: {0}")]
    Network(String),

    #[error("Git merge conflict: {0}")]
    MergeConflict(String),

    #[error("Git authentication failed: {0}")]
    AuthFailed(String),

    #[error("Git repository not initialized at '{0}'")]
    NotInitialized(PathBuf),

    #[error("'{0}' already exists but is not a git repository")]
    NotARepository(PathBuf),

    #[error("Failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("File operation failed: {0}")]
    FileOperation(String),
}

impl From<std::io::Error> for GitError {
    fn from(err: std::io::Error) -> Self {
        GitError::FileOperation(err.to_string())
    }
}

impl GitError {
    /// Returns true if the error is likely transient and the next pass may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, GitError::Network(_))
    }
}

/// Classifies a git stderr string into a more specific error variant.
pub fn classify_git_error(stderr: &str) -> GitError {
    let lower = stderr.to_lowercase();

    if lower.contains("could not resolve host")
        || lower.contains("connection refused")
        || lower.contains("connection timed out")
        || lower.contains("network is unreachable")
        || lower.contains("unable to access")
        || lower.contains("failed to connect")
        || lower.contains("couldn't connect to server")
        || lower.contains("the remote end hung up unexpectedly")
    {
        return GitError::Network(stderr.trim().to_string());
    }

    if lower.contains("merge conflict") || (lower.contains("conflict") && lower.contains("merge"))
    {
        return GitError::MergeConflict(stderr.trim().to_string());
    }

    if lower.contains("authentication failed")
        || lower.contains("permission denied")
        || lower.contains("invalid credentials")
    {
        return GitError::AuthFailed(stderr.trim().to_string());
    }

    GitError::Operation(stderr.trim().to_string())
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, GitError>;
