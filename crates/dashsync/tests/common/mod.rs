//! Shared fixtures for dashsync integration tests.
//!
//! - `MemoryStore`: an in-process dashboard store
//! - `GitFixture`: a bare remote, the bot's clone path and a human clone

#![allow(dead_code)]

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;

use async_trait::async_trait;
use tempfile::TempDir;

use dashsync::config::GitSettings;
use dashsync::dashboard::{self, slugify};
use dashsync::repository::CommitAuthor;
use dashsync::{Dashboard, DashboardStore, GitRepository, RemoteError, WriteOutcome};

pub const BOT_NAME: &str = "Dashboard Bot";
pub const BOT_EMAIL: &str = "bot@example.com";

pub fn dashboard_json(title: &str, panels: usize) -> Vec<u8> {
    let panels: Vec<_> = (0..panels)
        .map(|i| serde_json::json!({ "id": i, "type": "graph" }))
        .collect();
    serde_json::to_vec(&serde_json::json!({ "title": title, "panels": panels })).unwrap()
}

#[derive(Default)]
struct StoreState {
    dashboards: BTreeMap<String, (u64, Vec<u8>)>,
    writes: Vec<String>,
    deletes: Vec<String>,
    rejected: HashSet<String>,
}

/// Dashboard store held in memory. Every write bumps the version.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, title: &str, version: u64, content: Vec<u8>) {
        self.state
            .lock()
            .unwrap()
            .dashboards
            .insert(slugify(title), (version, content));
    }

    pub fn reject_writes_for(&self, identifier: &str) {
        self.state
            .lock()
            .unwrap()
            .rejected
            .insert(identifier.to_string());
    }

    pub fn writes(&self) -> Vec<String> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.state.lock().unwrap().deletes.clone()
    }

    pub fn version_of(&self, identifier: &str) -> Option<u64> {
        self.state
            .lock()
            .unwrap()
            .dashboards
            .get(identifier)
            .map(|(v, _)| *v)
    }
}

#[async_trait]
impl DashboardStore for MemoryStore {
    async fn list(&self) -> Result<Vec<String>, RemoteError> {
        Ok(self.state.lock().unwrap().dashboards.keys().cloned().collect())
    }

    async fn get(&self, key: &str) -> Result<Dashboard, RemoteError> {
        let (version, content) = self
            .state
            .lock()
            .unwrap()
            .dashboards
            .get(key)
            .cloned()
            .ok_or_else(|| RemoteError::NotFound(key.to_string()))?;
        Dashboard::keyed(key, version, content)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))
    }

    async fn create_or_update(&self, content: &[u8]) -> Result<WriteOutcome, RemoteError> {
        let identifier = dashboard::identifier_of(content)
            .map_err(|e| RemoteError::InvalidRequest(e.to_string()))?;
        let mut state = self.state.lock().unwrap();
        if state.rejected.contains(&identifier) {
            return Err(RemoteError::Rejected {
                status: 400,
                message: "invalid dashboard".to_string(),
            });
        }
        let version = state.dashboards.get(&identifier).map_or(1, |(v, _)| v + 1);
        state
            .dashboards
            .insert(identifier.clone(), (version, content.to_vec()));
        state.writes.push(identifier);
        Ok(WriteOutcome {
            status: "success".to_string(),
            version: Some(version),
            message: None,
        })
    }

    async fn delete(&self, identifier: &str) -> Result<(), RemoteError> {
        let mut state = self.state.lock().unwrap();
        state.deletes.push(identifier.to_string());
        state
            .dashboards
            .remove(identifier)
            .map(|_| ())
            .ok_or_else(|| RemoteError::NotFound(identifier.to_string()))
    }
}

/// Runs git in `dir` as the human contributor and returns trimmed stdout.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .current_dir(dir)
        .args(["-c", "user.name=Dev", "-c", "user.email=dev@example.com"])
        .args(args)
        .output()
        .expect("git not runnable");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// A bare remote on `master`, plus the paths of the bot and human clones.
pub struct GitFixture {
    _dir: TempDir,
    pub remote: PathBuf,
    pub bot_path: PathBuf,
    pub human: PathBuf,
}

impl GitFixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let remote = dir.path().join("remote.git");
        std::fs::create_dir_all(&remote).unwrap();
        git(&remote, &["init", "--quiet", "--bare"]);
        git(&remote, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        git(
            dir.path(),
            &["clone", "--quiet", &remote.display().to_string(), "human"],
        );
        let human = dir.path().join("human");
        git(&human, &["symbolic-ref", "HEAD", "refs/heads/master"]);

        Self {
            bot_path: dir.path().join("bot"),
            human,
            remote,
            _dir: dir,
        }
    }

    pub fn settings(&self) -> GitSettings {
        GitSettings {
            url: self.remote.display().to_string(),
            clone_path: self.bot_path.display().to_string(),
            commits_author: CommitAuthor {
                name: BOT_NAME.to_string(),
                email: BOT_EMAIL.to_string(),
            },
            ..Default::default()
        }
    }

    pub fn repository(&self) -> GitRepository {
        GitRepository::from_settings(self.settings())
    }

    /// Writes files in the human clone, commits them and pushes.
    pub fn human_commit(
        &self,
        message: &str,
        files: &[(&str, Vec<u8>)],
        removed: &[&str],
    ) -> String {
        for (path, content) in files {
            std::fs::write(self.human.join(path), content).unwrap();
        }
        for path in removed {
            git(&self.human, &["rm", "--quiet", path]);
        }
        git(&self.human, &["add", "-A"]);
        git(&self.human, &["commit", "--quiet", "-m", message]);
        git(&self.human, &["push", "--quiet", "origin", "HEAD:refs/heads/master"]);
        git(&self.human, &["rev-parse", "HEAD"])
    }

    /// Brings the human clone up to date with the remote.
    pub fn human_pull(&self) {
        git(&self.human, &["pull", "--quiet", "--ff-only", "origin", "master"]);
    }
}
