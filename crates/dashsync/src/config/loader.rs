use std::path::Path;

use crate::config::schema::{Config, SyncMode};
use crate::dashboard::slugify;
use crate::error::ConfigError;

pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_config_from_str(&content)
}

pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let mut config: Config = serde_yaml::from_str(content)?;

    normalize(&mut config);
    validate_config(&config)?;

    Ok(config)
}

fn normalize(config: &mut Config) {
    config.grafana.ignore_prefix = config
        .grafana
        .ignore_prefix
        .as_deref()
        .map(slugify)
        .filter(|prefix| !prefix.is_empty());
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.grafana.base_url.is_empty() {
        return Err(ConfigError::Validation {
            message: "grafana.base_url is required".to_string(),
        });
    }

    if config.git.is_none() && config.simple_sync.is_none() {
        return Err(ConfigError::Validation {
            message: "Invalid configuration: either git or simple_sync must be set".to_string(),
        });
    }

    if let Some(git) = &config.git {
        if git.url.is_empty() || git.clone_path.is_empty() {
            return Err(ConfigError::Validation {
                message: "git.url and git.clone_path are required".to_string(),
            });
        }
        if git.commits_author.email.is_empty() {
            return Err(ConfigError::Validation {
                message: "git.commits_author.email must not be empty".to_string(),
            });
        }
    }

    if let Some(pusher) = &config.pusher {
        let settings = &pusher.config;
        match pusher.sync_mode {
            SyncMode::Webhook => {
                if settings.interface.is_empty()
                    || settings.port == 0
                    || settings.path.is_empty()
                    || !settings.has_secret()
                {
                    return Err(ConfigError::Validation {
                        message: "Invalid pusher configuration: webhook mode requires interface, port, path and secret".to_string(),
                    });
                }
            }
            SyncMode::GitPull => {
                if settings.interval == 0 {
                    return Err(ConfigError::Validation {
                        message: "Invalid pusher configuration: git-pull mode requires interval > 0".to_string(),
                    });
                }
            }
        }
    }

    Ok(())
}
