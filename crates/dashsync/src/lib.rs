pub mod app;
pub mod config;
pub mod dashboard;
pub mod engine;
pub mod error;
pub mod remote;
pub mod repository;
pub mod sanitize;
pub mod secrets;
pub mod telemetry;
pub mod trigger;

#[cfg(test)]
pub(crate) mod test_support;

pub use app::App;
pub use config::{load_config, Config, SyncMode};
pub use dashboard::{slugify, Dashboard};
pub use engine::{
    ChangeSet, Engine, IgnoreFilter, Ledger, PullReport, PushPass, PushReport, SyncError,
    VersionDiff,
};
pub use error::{ConfigError, DashsyncError, Result};
pub use remote::{DashboardStore, GrafanaClient, RemoteError, WriteOutcome};
pub use repository::{
    ChangedPaths, GitError, GitRepository, LocalDirectory, Repository, Revision,
};
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
pub use trigger::{Poller, PushEvent};
