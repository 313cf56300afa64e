//! Repository → remote reconciliation.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use super::changeset::ChangeSet;
use super::error::{Result, SyncError};
use super::ignore::IgnoreFilter;
use super::ledger::LEDGER_FILE;
use super::pull::PullReport;
use crate::dashboard::{self, identifier_from_path};
use crate::remote::DashboardStore;

/// A change-set entry the store did not accept.
#[derive(Debug)]
pub struct PushFailure {
    pub path: String,
    pub error: SyncError,
}

/// Outcome of pushing one change set.
#[derive(Debug, Default)]
pub struct PushReport {
    /// Identifiers created or updated.
    pub pushed: Vec<String>,
    /// Identifiers deleted.
    pub deleted: Vec<String>,
    /// Paths skipped by the ignore filter.
    pub ignored: Vec<String>,
    /// Paths that are not dashboards, or removals while deletion is disabled.
    pub skipped: Vec<String>,
    pub failures: Vec<PushFailure>,
}

impl PushReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// A push report plus the pull pass that always follows it.
#[derive(Debug)]
pub struct PushPass {
    pub report: PushReport,
    pub pull: Result<PullReport>,
}

#[derive(Debug, Clone, Copy)]
enum Action {
    Upsert,
    Delete,
}

/// Applies repository changes to the dashboard store.
pub struct PushReconciler {
    store: Arc<dyn DashboardStore>,
    filter: IgnoreFilter,
    delete_removed: bool,
}

impl PushReconciler {
    pub fn new(store: Arc<dyn DashboardStore>, filter: IgnoreFilter, delete_removed: bool) -> Self {
        Self {
            store,
            filter,
            delete_removed,
        }
    }

    /// Pushes a change set entry by entry. A failing entry, timeouts
    /// included, does not stop its siblings.
    pub async fn push(&self, change_set: &ChangeSet) -> PushReport {
        let span = info_span!("push_pass", changes = change_set.len());
        async {
            let mut report = PushReport::default();

            let entries = change_set
                .added
                .iter()
                .chain(&change_set.modified)
                .map(|path| (path, Action::Upsert))
                .chain(change_set.removed.iter().map(|path| (path, Action::Delete)));

            for (path, action) in entries {
                if let Err(error) = self.push_entry(change_set, path, action, &mut report).await {
                    warn!(
                        path = %path,
                        error = %error,
                        unreachable = error.is_connectivity(),
                        "failed to push dashboard"
                    );
                    report.failures.push(PushFailure {
                        path: path.clone(),
                        error,
                    });
                }
            }

            info!(
                pushed = report.pushed.len(),
                deleted = report.deleted.len(),
                failed = report.failures.len(),
                "push pass finished"
            );
            report
        }
        .instrument(span)
        .await
    }

    async fn push_entry(
        &self,
        change_set: &ChangeSet,
        path: &str,
        action: Action,
        report: &mut PushReport,
    ) -> Result<()> {
        if path == LEDGER_FILE || !path.ends_with(".json") {
            report.skipped.push(path.to_string());
            return Ok(());
        }

        if matches!(action, Action::Delete) && !self.delete_removed {
            debug!(path = %path, "removal kept, deletion disabled");
            report.skipped.push(path.to_string());
            return Ok(());
        }

        let content = change_set
            .content(path)
            .ok_or_else(|| SyncError::malformed(path, "content not available"))?;

        if self
            .filter
            .is_ignored_content(content)
            .map_err(|e| SyncError::malformed(path, e))?
        {
            debug!(path = %path, "ignored by prefix");
            report.ignored.push(path.to_string());
            return Ok(());
        }

        let identifier = resolve_identifier(path, content)?;

        match action {
            Action::Upsert => {
                let outcome = self.store.create_or_update(content).await?;
                info!(
                    path = %path,
                    identifier = %identifier,
                    version = ?outcome.version,
                    "dashboard pushed"
                );
                report.pushed.push(identifier);
            }
            Action::Delete => {
                self.store.delete(&identifier).await?;
                info!(path = %path, identifier = %identifier, "dashboard deleted");
                report.deleted.push(identifier);
            }
        }

        Ok(())
    }
}

/// The slug of the content's title, else the file stem.
fn resolve_identifier(path: &str, content: &[u8]) -> Result<String> {
    match dashboard::identifier_of(content) {
        Ok(identifier) => Ok(identifier),
        Err(e) => identifier_from_path(path)
            .filter(|stem| !stem.is_empty())
            .map(str::to_string)
            .ok_or_else(|| SyncError::malformed(path, e)),
    }
}
