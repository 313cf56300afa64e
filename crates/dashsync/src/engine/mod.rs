//! Reconciliation engine: pull and push passes over one working tree.

pub mod changeset;
pub mod error;
pub mod ignore;
pub mod ledger;
pub mod pull;
pub mod push;

use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::remote::DashboardStore;
use crate::repository::Repository;

pub use changeset::ChangeSet;
pub use error::{Result, SyncError};
pub use ignore::IgnoreFilter;
pub use ledger::{Ledger, LedgerError, VersionDiff, LEDGER_FILE};
pub use pull::{commit_message, PullReconciler, PullReport, FETCH_CONCURRENCY};
pub use push::{PushFailure, PushPass, PushReconciler, PushReport};

/// Owns the working tree: pull passes and push passes never overlap.
pub struct Engine {
    repo: Arc<dyn Repository>,
    pull: PullReconciler,
    push: PushReconciler,
    pass_lock: Mutex<()>,
}

impl Engine {
    pub fn new(
        store: Arc<dyn DashboardStore>,
        repo: Arc<dyn Repository>,
        filter: IgnoreFilter,
        delete_removed: bool,
    ) -> Self {
        Self {
            pull: PullReconciler::new(Arc::clone(&store), Arc::clone(&repo), filter.clone()),
            push: PushReconciler::new(store, filter, delete_removed),
            repo,
            pass_lock: Mutex::new(()),
        }
    }

    pub fn repository(&self) -> &Arc<dyn Repository> {
        &self.repo
    }

    /// Runs one pull pass.
    pub async fn pull_pass(&self) -> Result<PullReport> {
        let _guard = self.pass_lock.lock().await;
        self.pull.pull().await
    }

    /// Pushes a change set, then runs one pull pass under the same lock so
    /// the repository reflects whatever the store now holds.
    pub async fn push_pass(&self, change_set: &ChangeSet) -> PushPass {
        let _guard = self.pass_lock.lock().await;

        let report = self.push.push(change_set).await;
        if !report.is_success() {
            warn!(
                failures = report.failures.len(),
                "some changes were not pushed"
            );
        }

        let pull = self.pull.pull().await;
        match &pull {
            Ok(pulled) if !pulled.diffs.is_empty() => {
                info!(updated = pulled.diffs.len(), "pulled dashboards after push")
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "pull after push failed"),
        }

        PushPass { report, pull }
    }
}
