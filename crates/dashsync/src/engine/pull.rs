//! Remote → repository reconciliation.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::Path;
use std::sync::Arc;

use futures_util::{stream, StreamExt, TryStreamExt};
use tracing::{debug, info, info_span, warn, Instrument};

use super::error::{Result, SyncError};
use super::ignore::IgnoreFilter;
use super::ledger::{write_atomic, Ledger, VersionDiff, LEDGER_FILE};
use crate::dashboard::{self, Dashboard};
use crate::remote::DashboardStore;
use crate::repository::{Repository, Revision};

/// Remote fetches in flight during a pull pass.
pub const FETCH_CONCURRENCY: usize = 4;

/// Outcome of one pull pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullReport {
    /// Dashboards written, sorted by identifier.
    pub diffs: Vec<VersionDiff>,
    /// Identifiers skipped by the ignore filter.
    pub ignored: Vec<String>,
    /// Commit recording the diffs, if one was made.
    pub commit: Option<Revision>,
}

/// Mirrors every remote dashboard whose version moved past the ledger.
pub struct PullReconciler {
    store: Arc<dyn DashboardStore>,
    repo: Arc<dyn Repository>,
    filter: IgnoreFilter,
}

impl PullReconciler {
    pub fn new(
        store: Arc<dyn DashboardStore>,
        repo: Arc<dyn Repository>,
        filter: IgnoreFilter,
    ) -> Self {
        Self {
            store,
            repo,
            filter,
        }
    }

    /// Runs one pull pass.
    ///
    /// Every dashboard is fetched before anything is written, so a remote
    /// failure leaves the working tree untouched.
    pub async fn pull(&self) -> Result<PullReport> {
        async {
            self.repo.sync(true).await?;
            let root = self.repo.root();
            let ledger = Ledger::load(root)?;

            let keys = self.store.list().await?;
            debug!(count = keys.len(), "listed remote dashboards");

            let dashboards: Vec<Dashboard> = stream::iter(keys)
                .map(|key| {
                    let store = Arc::clone(&self.store);
                    async move { store.get(&key).await }
                })
                .buffered(FETCH_CONCURRENCY)
                .try_collect()
                .await?;

            let mut report = PullReport::default();
            let mut pending = Vec::new();
            let mut claimed = HashSet::new();

            for dashboard in dashboards {
                if self.filter.is_ignored(&dashboard.identifier) {
                    debug!(identifier = %dashboard.identifier, "ignored by prefix");
                    report.ignored.push(dashboard.identifier);
                    continue;
                }

                let old_version = ledger.version_of(&dashboard.identifier);
                if dashboard.version <= old_version {
                    continue;
                }

                if !claimed.insert(dashboard.identifier.clone()) {
                    warn!(
                        identifier = %dashboard.identifier,
                        title = %dashboard.title,
                        "identifier already written in this pass, skipping"
                    );
                    continue;
                }

                let file_name = dashboard.file_name();
                let content = dashboard::indent(&dashboard.content)
                    .map_err(|e| SyncError::malformed(file_name.as_str(), e))?;

                pending.push((
                    VersionDiff {
                        identifier: dashboard.identifier,
                        old_version,
                        new_version: dashboard.version,
                    },
                    file_name,
                    content,
                ));
            }

            pending.sort_by(|a, b| a.0.identifier.cmp(&b.0.identifier));

            let mut paths = Vec::with_capacity(pending.len() + 1);
            for (diff, file_name, content) in pending {
                write_dashboard(root, &file_name, &content)?;
                info!(
                    identifier = %diff.identifier,
                    old_version = diff.old_version,
                    new_version = diff.new_version,
                    "dashboard updated"
                );
                paths.push(file_name);
                report.diffs.push(diff);
            }

            if !report.diffs.is_empty() {
                ledger.merge(&report.diffs).save(root)?;
                paths.push(LEDGER_FILE.to_string());

                report.commit = self
                    .repo
                    .commit(&commit_message(&report.diffs), &paths)
                    .await?;
            }

            self.repo.push().await?;

            info!(
                updated = report.diffs.len(),
                ignored = report.ignored.len(),
                "pull pass finished"
            );
            Ok(report)
        }
        .instrument(info_span!("pull_pass"))
        .await
    }
}

fn write_dashboard(root: &Path, file_name: &str, content: &[u8]) -> Result<()> {
    let path = root.join(file_name);
    write_atomic(&path, content).map_err(|source| SyncError::Io { path, source })
}

/// Commit message listing every version change, one per line.
pub fn commit_message(diffs: &[VersionDiff]) -> String {
    let mut message = String::from("Updated dashboards\n");
    for diff in diffs {
        let _ = writeln!(
            message,
            "{}: {} => {}",
            diff.identifier, diff.old_version, diff.new_version
        );
    }
    message
}
