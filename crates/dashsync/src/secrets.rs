//! Secret resolution for the Grafana API key, git token and webhook secret.
//!
//! Each secret can come from one of three places, tried in order:
//!
//! 1. **Direct value** in the config file (`api_key: ...`)
//! 2. **File reference** (`api_key_file: /run/secrets/grafana`)
//! 3. **Env var reference** (`api_key_env_var: GRAFANA_API_KEY`)

use secrecy::SecretString;
use std::fs;

/// Error type for secret resolution failures.
#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("No secret source provided (need one of: direct value, file path, or env var name)")]
    NoSourceProvided,

    #[error("Failed to read secret from file '{path}': {source}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Environment variable '{name}' not set")]
    EnvVarNotSet { name: String },

    #[error("Environment variable '{name}' contains invalid UTF-8")]
    EnvVarNotUnicode { name: String },
}

/// Result type for secret resolution.
pub type Result<T> = std::result::Result<T, SecretError>;

/// Resolves a secret from the first non-empty source.
///
/// File contents and env var values are trimmed.
pub fn resolve_secret(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<SecretString> {
    if let Some(value) = direct.filter(|v| !v.is_empty()) {
        return Ok(SecretString::from(value.to_string()));
    }

    if let Some(path) = file_path.filter(|p| !p.is_empty()) {
        let expanded = expand_home(path);
        return fs::read_to_string(&expanded)
            .map(|content| SecretString::from(content.trim().to_string()))
            .map_err(|e| SecretError::FileReadError {
                path: expanded,
                source: e,
            });
    }

    if let Some(var_name) = env_var.filter(|n| !n.is_empty()) {
        return match std::env::var(var_name) {
            Ok(value) => Ok(SecretString::from(value.trim())),
            Err(std::env::VarError::NotPresent) => Err(SecretError::EnvVarNotSet {
                name: var_name.to_string(),
            }),
            Err(std::env::VarError::NotUnicode(_)) => Err(SecretError::EnvVarNotUnicode {
                name: var_name.to_string(),
            }),
        };
    }

    Err(SecretError::NoSourceProvided)
}

/// Like [`resolve_secret`], but `Ok(None)` when nothing is configured.
pub fn resolve_secret_optional(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> Result<Option<SecretString>> {
    match resolve_secret(direct, file_path, env_var) {
        Ok(secret) => Ok(Some(secret)),
        Err(SecretError::NoSourceProvided) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Checks if at least one secret source is configured (non-empty).
pub fn has_secret_source(
    direct: Option<&str>,
    file_path: Option<&str>,
    env_var: Option<&str>,
) -> bool {
    direct.is_some_and(|s| !s.is_empty())
        || file_path.is_some_and(|s| !s.is_empty())
        || env_var.is_some_and(|s| !s.is_empty())
}

/// Expands a leading `~` to the user's home directory.
///
/// `~user/path` is not supported.
pub fn expand_home(path: &str) -> String {
    if path == "~" || path.starts_with("~/") {
        if let Some(home) = dirs::home_dir() {
            if path == "~" {
                return home.to_string_lossy().into_owned();
            }
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_direct_value_takes_priority() {
        std::env::set_var("DASHSYNC_TEST_DIRECT", "from-env");
        let secret = resolve_secret(Some("direct"), None, Some("DASHSYNC_TEST_DIRECT")).unwrap();
        assert_eq!(secret.expose_secret(), "direct");
        std::env::remove_var("DASHSYNC_TEST_DIRECT");
    }

    #[test]
    #[serial]
    fn test_file_takes_priority_over_env() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "  from-file  ").unwrap();
        std::env::set_var("DASHSYNC_TEST_FILE", "from-env");

        let secret = resolve_secret(
            None,
            Some(file.path().to_str().unwrap()),
            Some("DASHSYNC_TEST_FILE"),
        )
        .unwrap();
        assert_eq!(secret.expose_secret(), "from-file");
        std::env::remove_var("DASHSYNC_TEST_FILE");
    }

    #[test]
    #[serial]
    fn test_env_var_fallback() {
        std::env::set_var("DASHSYNC_TEST_ENV", "from-env\n");
        let secret = resolve_secret(Some(""), Some(""), Some("DASHSYNC_TEST_ENV")).unwrap();
        assert_eq!(secret.expose_secret(), "from-env");
        std::env::remove_var("DASHSYNC_TEST_ENV");
    }

    #[test]
    fn test_no_source_error() {
        let err = resolve_secret(None, None, None).unwrap_err();
        assert!(matches!(err, SecretError::NoSourceProvided));
    }

    #[test]
    fn test_file_not_found_error() {
        let err = resolve_secret(None, Some("/nonexistent/secret"), None).unwrap_err();
        assert!(matches!(err, SecretError::FileReadError { .. }));
    }

    #[test]
    #[serial]
    fn test_env_var_not_set_error() {
        std::env::remove_var("DASHSYNC_TEST_MISSING");
        let err = resolve_secret(None, None, Some("DASHSYNC_TEST_MISSING")).unwrap_err();
        assert!(err.to_string().contains("DASHSYNC_TEST_MISSING"));
    }

    #[test]
    fn test_has_secret_source() {
        assert!(!has_secret_source(None, None, None));
        assert!(!has_secret_source(Some(""), Some(""), Some("")));
        assert!(has_secret_source(None, Some("/run/secrets/x"), None));
    }

    #[test]
    fn test_resolve_secret_optional() {
        assert!(resolve_secret_optional(None, None, None).unwrap().is_none());
        assert!(resolve_secret_optional(Some("x"), None, None).unwrap().is_some());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/etc/dashsync"), "/etc/dashsync");
        if let Some(home) = dirs::home_dir() {
            let home = home.to_string_lossy().into_owned();
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/.ssh/id"), format!("{}/.ssh/id", home));
        }
    }
}
