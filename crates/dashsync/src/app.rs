//! Wires configuration into an engine and runs the long-lived modes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use crate::config::{Config, PusherConfig, SyncMode};
use crate::engine::{Engine, IgnoreFilter, PullReport};
use crate::error::{ConfigError, DashsyncError, Result};
use crate::remote::{DashboardStore, GrafanaClient};
use crate::repository::{GitRepository, LocalDirectory, Repository};
use crate::sanitize::{redact_path, redact_repo_url};
use crate::secrets::resolve_secret;
use crate::trigger::{self, Poller};

/// A configured engine plus the settings the triggers need.
pub struct App {
    config: Config,
    engine: Arc<Engine>,
    delete_removed: bool,
}

impl App {
    /// Builds the store and repository adapters from `config`.
    ///
    /// `delete_removed` is OR-ed with `pusher.delete_removed`.
    pub fn from_config(config: Config, delete_removed: bool) -> Result<Self> {
        let grafana = &config.grafana;
        let api_key = resolve_secret(
            grafana.api_key.as_deref(),
            grafana.api_key_file.as_deref(),
            grafana.api_key_env_var.as_deref(),
        )?;
        let store: Arc<dyn DashboardStore> =
            Arc::new(GrafanaClient::new(&grafana.base_url, api_key)?);

        let repo: Arc<dyn Repository> = match (&config.git, &config.simple_sync) {
            (Some(git), _) => {
                info!(
                    url = %redact_repo_url(&git.remote_url()),
                    path = %redact_path(&git.clone_path()),
                    branch = %git.branch,
                    "using git repository"
                );
                Arc::new(GitRepository::from_settings(git.clone()))
            }
            (None, Some(simple)) => {
                info!(path = %redact_path(&simple.sync_path()), "using plain directory");
                Arc::new(LocalDirectory::new(simple.sync_path()))
            }
            (None, None) => {
                return Err(ConfigError::Validation {
                    message: "either git or simple_sync must be configured".to_string(),
                }
                .into())
            }
        };

        let delete_removed =
            delete_removed || config.pusher.as_ref().is_some_and(|p| p.delete_removed);
        let filter = IgnoreFilter::new(grafana.ignore_prefix.as_deref());
        let engine = Arc::new(Engine::new(store, repo, filter, delete_removed));

        Ok(Self {
            config,
            engine,
            delete_removed,
        })
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn delete_removed(&self) -> bool {
        self.delete_removed
    }

    /// Runs one pull pass.
    pub async fn pull(&self) -> Result<PullReport> {
        Ok(self.engine.pull_pass().await?)
    }

    /// Runs a pull pass every `interval` until `shutdown` resolves.
    ///
    /// A failed pass is logged and the schedule continues.
    pub async fn pull_every<F>(&self, interval: Duration, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            match self.engine.pull_pass().await {
                Ok(report) => info!(updated = report.diffs.len(), "scheduled pull done"),
                Err(e) => error!(error = %e, "scheduled pull failed"),
            }

            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = &mut shutdown => {
                    info!("pull schedule stopped");
                    return Ok(());
                }
            }
        }
    }

    /// Runs the configured pusher until `shutdown` resolves or it fails.
    ///
    /// Returns immediately when git or pusher settings are missing.
    pub async fn push<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let (Some(git), Some(pusher)) = (&self.config.git, &self.config.pusher) else {
            info!("git or pusher settings missing, nothing to push");
            return Ok(());
        };
        let bot = &git.commits_author;

        match pusher.sync_mode {
            SyncMode::Webhook => {
                self.run_webhook(&pusher.config, &git.branch, &bot.email, shutdown)
                    .await
            }
            SyncMode::GitPull => {
                let poller = Arc::new(Poller::new(
                    Arc::clone(&self.engine),
                    pusher.config.interval(),
                    bot.email.clone(),
                ));
                let stopper = Arc::clone(&poller);
                tokio::spawn(async move {
                    shutdown.await;
                    stopper.stop();
                });
                Ok(poller.run().await?)
            }
        }
    }

    async fn run_webhook<F>(
        &self,
        settings: &PusherConfig,
        branch: &str,
        bot_email: &str,
        shutdown: F,
    ) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let secret = resolve_secret(
            settings.secret.as_deref(),
            settings.secret_file.as_deref(),
            settings.secret_env_var.as_deref(),
        )?;
        let listen = settings.listen_address();
        let addr: SocketAddr = listen.parse().map_err(|e| ConfigError::Validation {
            message: format!("invalid webhook listen address '{}': {}", listen, e),
        })?;

        let (router, events) = trigger::router(&settings.path, secret, branch);
        let worker = tokio::spawn(trigger::run_worker(
            Arc::clone(&self.engine),
            events,
            bot_email.to_string(),
        ));

        let served = trigger::serve(addr, router, shutdown).await;

        // The router owned the queue sender, so the worker ends once it
        // has drained what was accepted.
        if let Err(e) = worker.await {
            warn!(error = %e, "webhook worker ended abnormally");
        }
        served.map_err(DashsyncError::Server)
    }
}
