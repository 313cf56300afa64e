//! Periodic repository polling.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use tokio::sync::Notify;
use tracing::{debug, error, info, info_span, Instrument};

use crate::engine::{ChangeSet, Engine, PushPass, Result};
use crate::repository::Revision;

/// Last revision the poller acted on, with its file snapshot.
#[derive(Debug, Default)]
struct Observed {
    revision: Option<Revision>,
    files: BTreeMap<String, Vec<u8>>,
}

/// Polls the repository and pushes human changes to the dashboard store.
pub struct Poller {
    engine: Arc<Engine>,
    interval: Duration,
    bot_email: String,
    shutdown: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl Poller {
    pub fn new(engine: Arc<Engine>, interval: Duration, bot_email: impl Into<String>) -> Self {
        Self {
            engine,
            interval,
            bot_email: bot_email.into(),
            shutdown: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    /// Runs the poll loop on a background thread with its own runtime.
    pub fn start(self: Arc<Self>) -> std::io::Result<JoinHandle<Result<()>>> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(std::thread::spawn(move || rt.block_on(self.run())))
    }

    /// Takes the initial snapshot, then polls until stopped.
    ///
    /// Repository errors end the loop.
    pub async fn run(&self) -> Result<()> {
        let mut observed = self.initial_snapshot().await?;
        info!(
            revision = observed.revision.as_ref().map(Revision::short),
            interval_secs = self.interval.as_secs(),
            "poller started"
        );

        loop {
            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {},
                _ = self.wake.notified() => {},
            }

            if self.shutdown.load(Ordering::Acquire) {
                info!("poller stopped");
                return Ok(());
            }

            self.poll_once(&mut observed).await?;
        }
    }

    /// Signals the loop to stop before its next iteration.
    pub fn stop(&self) {
        self.shutdown.store(true, Ordering::Release);
        self.wake.notify_one();
    }

    async fn initial_snapshot(&self) -> Result<Observed> {
        let repo = self.engine.repository();
        let revision = repo.sync(true).await?;
        let files = match &revision {
            Some(revision) => repo.files_at(revision).await?,
            None => BTreeMap::new(),
        };
        Ok(Observed { revision, files })
    }

    async fn poll_once(&self, observed: &mut Observed) -> Result<Option<PushPass>> {
        let repo = self.engine.repository();
        async {
            repo.sync(false).await?;
            let Some(latest) = repo.latest_revision().await? else {
                debug!("repository has no commits yet");
                return Ok(None);
            };
            if observed.revision.as_ref() == Some(&latest) {
                return Ok(None);
            }

            let files = repo.files_at(&latest).await?;
            let paths = repo
                .changed_paths(observed.revision.as_ref(), &latest, &self.bot_email)
                .await?;
            let change_set = ChangeSet::merge_contents(paths, &files, &observed.files);

            let pass = if change_set.is_empty() {
                debug!(revision = latest.short(), "no changes to push");
                None
            } else {
                info!(
                    revision = latest.short(),
                    changes = change_set.len(),
                    "new commits found"
                );
                let pass = self.engine.push_pass(&change_set).await;
                if let Err(e) = &pass.pull {
                    error!(error = %e, "repository not refreshed after push");
                }
                Some(pass)
            };

            *observed = Observed {
                revision: Some(latest),
                files,
            };
            Ok(pass)
        }
        .instrument(info_span!("poll"))
        .await
    }
}
