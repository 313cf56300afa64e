//! In-memory collaborators for engine and trigger tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::dashboard::{self, slugify, Dashboard};
use crate::engine::ChangeSet;
use crate::remote::{DashboardStore, RemoteError, WriteOutcome};
use crate::repository::{self, ChangedPaths, GitError, Repository, Revision};

/// Minimal dashboard document with the given title.
pub fn dashboard_json(title: &str) -> Vec<u8> {
    serde_json::to_vec(&serde_json::json!({ "title": title, "panels": [] })).unwrap_or_default()
}

#[derive(Default)]
struct StoreState {
    dashboards: BTreeMap<String, (u64, Vec<u8>)>,
    writes: Vec<Vec<u8>>,
    deletes: Vec<String>,
    get_calls: usize,
    fail_gets: HashSet<String>,
    fail_writes: HashSet<String>,
    time_out_writes: HashSet<String>,
    identifiers: HashMap<String, String>,
    unavailable: bool,
}

/// Dashboard store keyed by slug, with scriptable failures.
#[derive(Default)]
pub struct FakeStore {
    state: Mutex<StoreState>,
}

impl FakeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dashboard(self, title: &str, version: u64) -> Self {
        self.insert(title, version);
        self
    }

    pub fn insert(&self, title: &str, version: u64) {
        self.state()
            .dashboards
            .insert(slugify(title), (version, dashboard_json(title)));
    }

    /// Stores a dashboard under `key` whose reported identifier is `identifier`.
    pub fn with_keyed_dashboard(
        self,
        key: &str,
        identifier: &str,
        title: &str,
        version: u64,
    ) -> Self {
        {
            let mut state = self.state();
            state
                .dashboards
                .insert(key.to_string(), (version, dashboard_json(title)));
            state
                .identifiers
                .insert(key.to_string(), identifier.to_string());
        }
        self
    }

    pub fn fail_gets_for(&self, identifier: &str) {
        self.state().fail_gets.insert(identifier.to_string());
    }

    pub fn fail_writes_for(&self, identifier: &str) {
        self.state().fail_writes.insert(identifier.to_string());
    }

    pub fn time_out_writes_for(&self, identifier: &str) {
        self.state().time_out_writes.insert(identifier.to_string());
    }

    pub fn set_unavailable(&self, unavailable: bool) {
        self.state().unavailable = unavailable;
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state().writes.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.state().deletes.clone()
    }

    pub fn get_calls(&self) -> usize {
        self.state().get_calls
    }

    pub fn version_of(&self, identifier: &str) -> Option<u64> {
        self.state().dashboards.get(identifier).map(|(v, _)| *v)
    }

    fn state(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), RemoteError> {
        if self.state().unavailable {
            Err(RemoteError::Unavailable("connection refused".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl DashboardStore for FakeStore {
    async fn list(&self) -> Result<Vec<String>, RemoteError> {
        self.check_available()?;
        Ok(self.state().dashboards.keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Dashboard, RemoteError> {
        self.check_available()?;
        let mut state = self.state();
        state.get_calls += 1;
        if state.fail_gets.contains(key) {
            return Err(RemoteError::NotFound(format!("/api/dashboards/db/{}", key)));
        }
        let (version, content) = state
            .dashboards
            .get(key)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(key.to_string()))?;
        let identifier = state.identifiers.get(key).map_or(key, String::as_str);
        Dashboard::keyed(identifier, version, content)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn create_or_update(&self, content: &[u8]) -> Result<WriteOutcome, RemoteError> {
        self.check_available()?;
        let identifier = dashboard::identifier_of(content)
            .map_err(|e| RemoteError::InvalidRequest(e.to_string()))?;

        let mut state = self.state();
        if state.time_out_writes.contains(&identifier) {
            return Err(RemoteError::Unavailable("operation timed out".to_string()));
        }
        if state.fail_writes.contains(&identifier) {
            return Err(RemoteError::Rejected {
                status: 412,
                message: format!("Failed to update dashboard {}", identifier),
            });
        }

        state.writes.push(content.to_vec());
        let version = state.dashboards.get(&identifier).map_or(1, |(v, _)| v + 1);
        state
            .dashboards
            .insert(identifier, (version, content.to_vec()));

        Ok(WriteOutcome {
            status: "success".to_string(),
            version: Some(version),
            message: None,
        })
    }

    async fn delete(&self, identifier: &str) -> Result<(), RemoteError> {
        self.check_available()?;
        let mut state = self.state();
        state.deletes.push(identifier.to_string());
        match state.dashboards.remove(identifier) {
            Some(_) => Ok(()),
            None => Err(RemoteError::NotFound(identifier.to_string())),
        }
    }
}

#[derive(Default)]
struct RepoState {
    head: Option<Revision>,
    snapshots: HashMap<Revision, BTreeMap<String, Vec<u8>>>,
    changes: HashMap<Revision, ChangedPaths>,
    commits: Vec<(String, Vec<String>)>,
    syncs: Vec<bool>,
    pushes: usize,
    fail_sync: bool,
}

/// Repository over a real directory with scripted history.
///
/// [`advance`](FakeRepository::advance) plays the role of a remote push: it
/// moves the head and records the snapshot and the human changes since the
/// previous head.
pub struct FakeRepository {
    root: PathBuf,
    state: Mutex<RepoState>,
}

impl FakeRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            state: Mutex::new(RepoState::default()),
        }
    }

    pub fn advance(&self, revision: &str, files: &[(&str, Vec<u8>)], changes: ChangedPaths) {
        let revision = Revision::new(revision);
        let snapshot = files
            .iter()
            .map(|(path, content)| (path.to_string(), content.clone()))
            .collect();
        let mut state = self.state();
        state.snapshots.insert(revision.clone(), snapshot);
        state.changes.insert(revision.clone(), changes);
        state.head = Some(revision);
    }

    pub fn set_fail_sync(&self, fail: bool) {
        self.state().fail_sync = fail;
    }

    pub fn commits(&self) -> Vec<(String, Vec<String>)> {
        self.state().commits.clone()
    }

    pub fn syncs(&self) -> Vec<bool> {
        self.state().syncs.clone()
    }

    pub fn pushes(&self) -> usize {
        self.state().pushes
    }

    fn state(&self) -> MutexGuard<'_, RepoState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl Repository for FakeRepository {
    fn root(&self) -> &Path {
        &self.root
    }

    async fn sync(&self, allow_clone: bool) -> repository::Result<Option<Revision>> {
        let mut state = self.state();
        state.syncs.push(allow_clone);
        if state.fail_sync {
            return Err(GitError::Network("Could not resolve host: git.example.com".into()));
        }
        Ok(state.head.clone())
    }

    async fn push(&self) -> repository::Result<()> {
        self.state().pushes += 1;
        Ok(())
    }

    async fn commit(
        &self,
        message: &str,
        paths: &[String],
    ) -> repository::Result<Option<Revision>> {
        if paths.is_empty() {
            return Ok(None);
        }
        let mut state = self.state();
        state.commits.push((message.to_string(), paths.to_vec()));
        Ok(Some(Revision::new(format!("bot-{}", state.commits.len()))))
    }

    async fn latest_revision(&self) -> repository::Result<Option<Revision>> {
        Ok(self.state().head.clone())
    }

    async fn files_at(
        &self,
        revision: &Revision,
    ) -> repository::Result<BTreeMap<String, Vec<u8>>> {
        self.state()
            .snapshots
            .get(revision)
            .cloned()
            .ok_or_else(|| GitError::Operation(format!("bad revision '{}'", revision)))
    }

    async fn changed_paths(
        &self,
        _from: Option<&Revision>,
        to: &Revision,
        _exclude_author_email: &str,
    ) -> repository::Result<ChangedPaths> {
        Ok(self.state().changes.get(to).cloned().unwrap_or_default())
    }
}

/// Builds change sets without spelling out the content map.
#[derive(Default)]
pub struct ChangeSetBuilder {
    change_set: ChangeSet,
}

impl ChangeSetBuilder {
    pub fn added(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.change_set.added.push(path.to_string());
        self.with_content(path, content)
    }

    pub fn added_without_content(mut self, path: &str) -> Self {
        self.change_set.added.push(path.to_string());
        self
    }

    pub fn modified(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.change_set.modified.push(path.to_string());
        self.with_content(path, content)
    }

    pub fn removed(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.change_set.removed.push(path.to_string());
        self.with_content(path, content)
    }

    pub fn build(self) -> ChangeSet {
        self.change_set
    }

    fn with_content(mut self, path: &str, content: impl AsRef<[u8]>) -> Self {
        self.change_set
            .contents
            .insert(path.to_string(), content.as_ref().to_vec());
        self
    }
}
