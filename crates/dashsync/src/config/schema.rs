use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::repository::CommitAuthor;
use crate::secrets::expand_home;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub grafana: GrafanaSettings,

    #[serde(default)]
    pub git: Option<GitSettings>,

    #[serde(default)]
    pub simple_sync: Option<SimpleSyncSettings>,

    #[serde(default)]
    pub pusher: Option<PusherSettings>,

    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GrafanaSettings {
    pub base_url: String,

    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default)]
    pub api_key_file: Option<String>,

    #[serde(default)]
    pub api_key_env_var: Option<String>,

    /// Dashboards whose slug starts with this prefix are never synchronized.
    #[serde(default)]
    pub ignore_prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GitSettings {
    pub url: String,

    /// SSH user prepended to scp-style URLs (`git` for most forges).
    #[serde(default)]
    pub user: String,

    /// SSH private key. Takes precedence over token authentication.
    #[serde(default)]
    pub private_key: String,

    #[serde(default)]
    pub token: Option<String>,

    #[serde(default)]
    pub token_file: Option<String>,

    #[serde(default)]
    pub token_env_var: Option<String>,

    pub clone_path: String,

    #[serde(default = "default_branch")]
    pub branch: String,

    #[serde(default)]
    pub commits_author: CommitAuthor,
}

impl Default for GitSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: String::new(),
            private_key: String::new(),
            token: None,
            token_file: None,
            token_env_var: None,
            clone_path: String::new(),
            branch: default_branch(),
            commits_author: CommitAuthor::default(),
        }
    }
}

fn default_branch() -> String {
    "master".to_string()
}

impl GitSettings {
    /// Remote URL with the SSH user applied to scp-style addresses.
    pub fn remote_url(&self) -> String {
        if self.user.is_empty() || self.url.contains("://") || self.url.contains('@') {
            self.url.clone()
        } else {
            format!("{}@{}", self.user, self.url)
        }
    }

    pub fn clone_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.clone_path))
    }

    pub fn has_token(&self) -> bool {
        crate::secrets::has_secret_source(
            self.token.as_deref(),
            self.token_file.as_deref(),
            self.token_env_var.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SimpleSyncSettings {
    pub sync_path: String,
}

impl SimpleSyncSettings {
    pub fn sync_path(&self) -> PathBuf {
        PathBuf::from(expand_home(&self.sync_path))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    Webhook,
    GitPull,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PusherSettings {
    pub sync_mode: SyncMode,

    /// Propagate file removals as remote deletions.
    #[serde(default)]
    pub delete_removed: bool,

    #[serde(default)]
    pub config: PusherConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PusherConfig {
    // webhook
    #[serde(default)]
    pub interface: String,

    #[serde(default)]
    pub port: u16,

    #[serde(default)]
    pub path: String,

    #[serde(default)]
    pub secret: Option<String>,

    #[serde(default)]
    pub secret_file: Option<String>,

    #[serde(default)]
    pub secret_env_var: Option<String>,

    // git-pull, in seconds
    #[serde(default)]
    pub interval: u64,
}

impl PusherConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.interface, self.port)
    }

    pub fn has_secret(&self) -> bool {
        crate::secrets::has_secret_source(
            self.secret.as_deref(),
            self.secret_file.as_deref(),
            self.secret_env_var.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
