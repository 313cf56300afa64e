//! Pure data types for repository operations.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A commit identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for log lines.
    pub fn short(&self) -> &str {
        let end = self.0.len().min(8);
        self.0.get(..end).unwrap_or(&self.0)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identity used for commits made by the pull pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

impl Default for CommitAuthor {
    fn default() -> Self {
        Self {
            name: "Grafana Dashboard Manager".to_string(),
            email: "dashboards@localhost".to_string(),
        }
    }
}

/// How a single path changed within one commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileChange {
    Added,
    Modified,
    Removed,
}

impl FileChange {
    /// Maps a `git --name-status` letter.
    pub fn from_status(status: &str) -> Option<Self> {
        match status.chars().next()? {
            'A' => Some(FileChange::Added),
            'M' | 'T' => Some(FileChange::Modified),
            'D' => Some(FileChange::Removed),
            _ => None,
        }
    }
}

/// Paths changed between two revisions, folded across commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangedPaths {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
}

impl ChangedPaths {
    /// Records a change. Changes must be recorded oldest first; the net
    /// effect across commits is kept:
    ///
    /// - added then modified stays added
    /// - added then removed disappears
    /// - removed then added becomes modified
    pub fn record(&mut self, path: &str, change: FileChange) {
        let was_added = take(&mut self.added, path);
        let was_removed = take(&mut self.removed, path);
        take(&mut self.modified, path);

        let net = match (change, was_added, was_removed) {
            (FileChange::Removed, true, _) => None,
            (FileChange::Modified, true, _) => Some(FileChange::Added),
            (FileChange::Added, _, true) => Some(FileChange::Modified),
            (change, _, _) => Some(change),
        };

        match net {
            Some(FileChange::Added) => self.added.push(path.to_string()),
            Some(FileChange::Modified) => self.modified.push(path.to_string()),
            Some(FileChange::Removed) => self.removed.push(path.to_string()),
            None => {}
        }
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}

fn take(list: &mut Vec<String>, path: &str) -> bool {
    let before = list.len();
    list.retain(|p| p != path);
    list.len() != before
}
