//! Engine error type.

use std::path::PathBuf;

use thiserror::Error;

use super::ledger::LedgerError;
use crate::remote::RemoteError;
use crate::repository::GitError;

/// Errors raised by a pull or push pass.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Repository(#[from] GitError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Dashboard '{path}' is malformed: {reason}")]
    ContentMalformed { path: String, reason: String },

    #[error("Failed to write '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SyncError {
    pub(crate) fn malformed(path: impl Into<String>, reason: impl ToString) -> Self {
        SyncError::ContentMalformed {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the remote store or the git remote could not be reached.
    pub fn is_connectivity(&self) -> bool {
        match self {
            SyncError::Remote(e) => e.is_unavailable(),
            SyncError::Repository(e) => e.is_retryable(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
