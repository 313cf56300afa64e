//! Repository changes handed to the push pass.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::repository::ChangedPaths;

/// Changed paths plus the bytes needed to act on them: post-change content
/// for added and modified paths, pre-change content for removed ones.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub contents: HashMap<String, Vec<u8>>,
}

impl ChangeSet {
    /// Takes added/modified content from `current` and removed content from
    /// `previous`. Paths missing from their snapshot get no content.
    pub fn merge_contents(
        paths: ChangedPaths,
        current: &BTreeMap<String, Vec<u8>>,
        previous: &BTreeMap<String, Vec<u8>>,
    ) -> Self {
        let mut contents = HashMap::new();
        for path in paths.added.iter().chain(&paths.modified) {
            if let Some(bytes) = current.get(path) {
                contents.insert(path.clone(), bytes.clone());
            }
        }
        for path in &paths.removed {
            if let Some(bytes) = previous.get(path) {
                contents.insert(path.clone(), bytes.clone());
            }
        }

        Self {
            added: paths.added,
            modified: paths.modified,
            removed: paths.removed,
            contents,
        }
    }

    /// Like [`merge_contents`](Self::merge_contents), but reads added and
    /// modified content from the working tree at `root`.
    pub async fn from_working_tree(
        paths: ChangedPaths,
        root: &Path,
        previous: &BTreeMap<String, Vec<u8>>,
    ) -> Self {
        let mut current = BTreeMap::new();
        for path in paths.added.iter().chain(&paths.modified) {
            match tokio::fs::read(root.join(path)).await {
                Ok(bytes) => {
                    current.insert(path.clone(), bytes);
                }
                Err(e) => tracing::debug!(path = %path, error = %e, "changed file not readable"),
            }
        }
        Self::merge_contents(paths, &current, previous)
    }

    pub fn content(&self, path: &str) -> Option<&[u8]> {
        self.contents.get(path).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }
}
