use std::path::PathBuf;
use thiserror::Error;

use crate::engine::SyncError;
use crate::remote::RemoteError;
use crate::repository::GitError;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum DashsyncError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Secret error: {0}")]
    Secret(#[from] SecretError),

    #[error("Dashboard store error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Repository error: {0}")]
    Repository(#[from] GitError),

    #[error("Sync error: {0}")]
    Sync(#[from] SyncError),

    #[error("Webhook server error: {0}")]
    Server(#[source] std::io::Error),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },
}

pub type Result<T> = std::result::Result<T, DashsyncError>;
