//! Version ledger: last-synced remote version per dashboard identifier.
//!
//! Persisted as a single JSON object at `versions.json` in the repository
//! root. A missing file is an empty ledger. Writes go to `<path>.tmp` and are
//! renamed into place.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::dashboard;

/// Name of the ledger file at the repository root.
pub const LEDGER_FILE: &str = "versions.json";

/// Errors reading or writing the ledger file.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Version ledger '{path}' is not readable: {reason}")]
    NotReadable { path: PathBuf, reason: String },

    #[error("Failed to write version ledger '{path}': {source}")]
    WriteFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize version ledger: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// One changed dashboard within a pull pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionDiff {
    pub identifier: String,
    pub old_version: u64,
    pub new_version: u64,
}

/// Mapping from identifier to last-synced version.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    versions: BTreeMap<String, u64>,
}

impl Ledger {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Path of the ledger file inside a repository root.
    pub fn path_in(repo_root: &Path) -> PathBuf {
        repo_root.join(LEDGER_FILE)
    }

    /// Loads the ledger from a repository root.
    ///
    /// An absent file yields an empty ledger, never an error.
    pub fn load(repo_root: &Path) -> Result<Self, LedgerError> {
        let path = Self::path_in(repo_root);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => {
                return Err(LedgerError::NotReadable {
                    path,
                    reason: e.to_string(),
                })
            }
        };

        let versions: BTreeMap<String, u64> =
            serde_json::from_slice(&raw).map_err(|e| LedgerError::NotReadable {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self { versions })
    }

    /// Writes the ledger to a repository root. Keys are sorted and the
    /// output is tab-indented like dashboard files.
    pub fn save(&self, repo_root: &Path) -> Result<(), LedgerError> {
        let path = Self::path_in(repo_root);
        let indented = dashboard::to_tab_indented(&self.versions)?;

        write_atomic(&path, &indented).map_err(|source| LedgerError::WriteFile { path, source })
    }

    /// Returns a new ledger with every diff applied. Entries not named by a
    /// diff are carried over unchanged.
    pub fn merge(&self, diffs: &[VersionDiff]) -> Self {
        let mut versions = self.versions.clone();
        for diff in diffs {
            versions.insert(diff.identifier.clone(), diff.new_version);
        }
        Self { versions }
    }

    /// Last-synced version, 0 when the identifier was never synced.
    pub fn version_of(&self, identifier: &str) -> u64 {
        self.versions.get(identifier).copied().unwrap_or(0)
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> {
        self.versions.iter().map(|(k, v)| (k.as_str(), *v))
    }
}

impl FromIterator<(String, u64)> for Ledger {
    fn from_iter<I: IntoIterator<Item = (String, u64)>>(iter: I) -> Self {
        Self {
            versions: iter.into_iter().collect(),
        }
    }
}

/// Writes `contents` to `<path>.tmp` then renames it over `path`.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, contents)?;
    std::fs::rename(&tmp, path)
}
