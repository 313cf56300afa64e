//! Git working-tree operations through the `git` CLI.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use async_trait::async_trait;
use tokio::process::Command as TokioCommand;

use super::auth::{build_auth_env, AuthEnv};
use super::parse::{
    format_git_error, is_benign_push_error, is_empty_remote_error, parse_log, parse_ls_tree,
    LOG_FORMAT,
};
use crate::config::GitSettings;
use crate::repository::error::{classify_git_error, GitError, Result};
use crate::repository::types::{ChangedPaths, Revision};
use crate::repository::Repository;
use crate::sanitize::redact_repo_url;

/// A clone of the dashboard repository.
pub struct GitRepository {
    repo_path: PathBuf,
    settings: GitSettings,
}

impl GitRepository {
    pub fn new(repo_path: impl Into<PathBuf>, settings: GitSettings) -> Self {
        Self {
            repo_path: repo_path.into(),
            settings,
        }
    }

    /// Uses `settings.clone_path` as the working tree.
    pub fn from_settings(settings: GitSettings) -> Self {
        Self::new(settings.clone_path(), settings)
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    pub fn branch(&self) -> &str {
        &self.settings.branch
    }

    pub fn is_git_repo(&self) -> bool {
        self.repo_path.join(".git").exists()
    }

    /// Checks if the repository has any commits.
    pub fn has_commits(&self) -> bool {
        self.is_git_repo()
            && self
                .run_git(&["rev-parse", "--verify", "--quiet", "HEAD"])
                .map(|output| output.status.success())
                .unwrap_or(false)
    }

    async fn clone_remote(&self) -> Result<()> {
        let url = self.settings.remote_url();
        log::info!(
            "Cloning {} into {}",
            redact_repo_url(&url),
            self.repo_path.display()
        );

        if let Some(parent) = self.repo_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let path = self.repo_path.to_string_lossy().into_owned();
        let output = self
            .run_git_remote(None, &["clone", "--quiet", &url, &path])
            .await?;
        if !output.status.success() {
            return Err(classify_git_error(&format_git_error(&output)));
        }

        self.track_branch()
    }

    /// Points HEAD at the configured branch, tracking the remote one when it exists.
    fn track_branch(&self) -> Result<()> {
        let branch = &self.settings.branch;
        let remote_ref = format!("refs/remotes/origin/{}", branch);
        let has_remote_branch = self
            .run_git(&["rev-parse", "--verify", "--quiet", &remote_ref])?
            .status
            .success();

        if has_remote_branch {
            self.run_git_checked(&["checkout", "--quiet", "-B", branch, &remote_ref])?;
        } else {
            log::info!("Remote has no branch '{}' yet, starting it locally", branch);
            self.run_git_checked(&["symbolic-ref", "HEAD", &format!("refs/heads/{}", branch)])?;
        }
        Ok(())
    }

    async fn pull(&self) -> Result<()> {
        let output = self
            .run_git_remote(
                Some(&self.repo_path),
                &["pull", "--ff-only", "--quiet", "origin", &self.settings.branch],
            )
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let message = format_git_error(&output);
        if is_empty_remote_error(&message) {
            log::debug!("Remote branch '{}' is empty, nothing to pull", self.settings.branch);
            return Ok(());
        }

        let lower = message.to_lowercase();
        if lower.contains("not possible to fast-forward") || lower.contains("diverg") {
            return self.rebase_onto_remote();
        }

        Err(classify_git_error(&message))
    }

    /// Replays unpushed local commits on top of the fetched remote branch.
    fn rebase_onto_remote(&self) -> Result<()> {
        let remote_ref = format!("origin/{}", self.settings.branch);
        log::warn!("Local branch diverged from {}, rebasing", remote_ref);

        let output = self
            .bot_command(&["rebase", "--quiet", &remote_ref])
            .output()
            .map_err(|e| GitError::Operation(e.to_string()))?;
        if output.status.success() {
            return Ok(());
        }

        let message = format_git_error(&output);
        if let Err(e) = self.run_git_checked(&["rebase", "--abort"]) {
            log::warn!("Failed to abort rebase: {}", e);
        }
        Err(GitError::MergeConflict(message))
    }

    fn head(&self) -> Result<Option<Revision>> {
        if !self.is_git_repo() {
            return Err(GitError::NotInitialized(self.repo_path.clone()));
        }

        let output = self.run_git(&["rev-parse", "--verify", "--quiet", "HEAD"])?;
        if !output.status.success() {
            return Ok(None);
        }

        let hash = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok(Some(Revision::new(hash)))
    }

    /// Runs a networked git command with the auth environment applied.
    async fn run_git_remote(&self, dir: Option<&Path>, args: &[&str]) -> Result<Output> {
        let auth: AuthEnv = build_auth_env(&self.settings)?;

        let mut cmd = TokioCommand::new("git");
        if let Some(dir) = dir {
            cmd.current_dir(dir);
        }
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        for (key, value) in &auth.env_vars {
            cmd.env(key, value);
        }

        let output = cmd
            .output()
            .await
            .map_err(|e| GitError::Operation(e.to_string()))?;

        drop(auth);
        Ok(output)
    }

    fn run_git(&self, args: &[&str]) -> Result<Output> {
        self.git_command(args)
            .output()
            .map_err(|e| GitError::Operation(e.to_string()))
    }

    /// Like `run_git`, but a non-zero exit becomes an error.
    fn run_git_checked(&self, args: &[&str]) -> Result<Output> {
        let output = self.run_git(args)?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(classify_git_error(&format_git_error(&output)))
        }
    }

    /// A git command whose committer is the bot identity.
    fn bot_command(&self, args: &[&str]) -> Command {
        let author = &self.settings.commits_author;
        let mut cmd = self.git_command(args);
        cmd.env("GIT_COMMITTER_NAME", &author.name)
            .env("GIT_COMMITTER_EMAIL", &author.email);
        cmd
    }

    fn git_command(&self, args: &[&str]) -> Command {
        let mut cmd = Command::new("git");
        cmd.current_dir(&self.repo_path)
            .args(["-c", "core.quotePath=false"])
            .args(args)
            .stdin(Stdio::null());
        cmd
    }
}

#[async_trait]
impl Repository for GitRepository {
    fn root(&self) -> &Path {
        &self.repo_path
    }

    async fn sync(&self, allow_clone: bool) -> Result<Option<Revision>> {
        if self.is_git_repo() {
            self.pull().await?;
        } else if !allow_clone {
            return Err(GitError::NotInitialized(self.repo_path.clone()));
        } else if dir_has_entries(&self.repo_path)? {
            return Err(GitError::NotARepository(self.repo_path.clone()));
        } else {
            self.clone_remote().await?;
        }

        self.head()
    }

    async fn push(&self) -> Result<()> {
        if !self.is_git_repo() {
            return Err(GitError::NotInitialized(self.repo_path.clone()));
        }
        if !self.has_commits() {
            log::debug!("No local commits, nothing to push");
            return Ok(());
        }

        let refspec = format!("HEAD:refs/heads/{}", self.settings.branch);
        let output = self
            .run_git_remote(Some(&self.repo_path), &["push", "--quiet", "origin", &refspec])
            .await?;

        if output.status.success() {
            return Ok(());
        }

        let message = format_git_error(&output);
        if is_benign_push_error(&message) {
            log::warn!("Push skipped, the next pass will retry: {}", message);
            return Ok(());
        }

        Err(classify_git_error(&message))
    }

    async fn commit(&self, message: &str, paths: &[String]) -> Result<Option<Revision>> {
        if !self.is_git_repo() {
            return Err(GitError::NotInitialized(self.repo_path.clone()));
        }
        if paths.is_empty() {
            return Ok(None);
        }

        let mut add = vec!["add", "-A", "--"];
        add.extend(paths.iter().map(String::as_str));
        self.run_git_checked(&add)?;

        let staged = self.run_git(&["diff", "--cached", "--quiet"])?;
        if staged.status.success() {
            log::debug!("Nothing staged, skipping commit");
            return Ok(None);
        }

        let author = &self.settings.commits_author;
        let output = self
            .bot_command(&[
                "commit",
                "--quiet",
                "--no-verify",
                "-m",
                message,
                "--author",
                &format!("{} <{}>", author.name, author.email),
            ])
            .output()
            .map_err(|e| GitError::Operation(e.to_string()))?;

        if !output.status.success() {
            return Err(GitError::Operation(format_git_error(&output)));
        }

        let revision = self.head()?;
        if let Some(rev) = &revision {
            log::info!("Committed {} as {}", rev.short(), author.email);
        }
        Ok(revision)
    }

    async fn latest_revision(&self) -> Result<Option<Revision>> {
        self.head()
    }

    async fn files_at(&self, revision: &Revision) -> Result<BTreeMap<String, Vec<u8>>> {
        let listing = self.run_git_checked(&["ls-tree", "-r", "-z", revision.as_str()])?;

        let mut files = BTreeMap::new();
        for (object, path) in parse_ls_tree(&listing.stdout) {
            let blob = self.run_git_checked(&["cat-file", "blob", &object])?;
            files.insert(path, blob.stdout);
        }
        Ok(files)
    }

    async fn changed_paths(
        &self,
        from: Option<&Revision>,
        to: &Revision,
        exclude_author_email: &str,
    ) -> Result<ChangedPaths> {
        let mut changes = ChangedPaths::default();
        if from == Some(to) {
            return Ok(changes);
        }

        let range = match from {
            Some(from) => format!("{}..{}", from, to),
            None => to.to_string(),
        };
        let output = self.run_git_checked(&[
            "log",
            "--reverse",
            "--no-renames",
            "--name-status",
            LOG_FORMAT,
            &range,
        ])?;

        for entry in parse_log(&String::from_utf8_lossy(&output.stdout)) {
            if entry.author_email.eq_ignore_ascii_case(exclude_author_email) {
                log::debug!("Skipping commit {} by {}", entry.hash, entry.author_email);
                continue;
            }
            for (change, path) in &entry.changes {
                changes.record(path, *change);
            }
        }

        Ok(changes)
    }
}

fn dir_has_entries(path: &Path) -> Result<bool> {
    match std::fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_some()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(GitError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}
