//! Git authentication handling.

use std::path::PathBuf;

use secrecy::ExposeSecret;

use crate::config::GitSettings;
use crate::repository::error::{GitError, Result};

/// Escapes a token for use inside a single-quoted shell string.
pub fn shell_escape_token(token: &str) -> String {
    token.replace('\'', "'\\''")
}

/// Deletes the askpass script when dropped, so tokens never outlive the
/// git command that needed them.
#[derive(Debug)]
pub struct AskpassCleanup {
    path: Option<PathBuf>,
}

impl AskpassCleanup {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn empty() -> Self {
        Self { path: None }
    }
}

impl Drop for AskpassCleanup {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Failed to clean up askpass script: {}", e);
            }
        }
    }
}

/// Environment for a networked git command.
#[derive(Debug)]
pub struct AuthEnv {
    pub env_vars: Vec<(String, String)>,
    /// Must outlive the git command.
    pub _cleanup: AskpassCleanup,
}

impl AuthEnv {
    fn plain(env_vars: Vec<(String, String)>) -> Self {
        Self {
            env_vars,
            _cleanup: AskpassCleanup::empty(),
        }
    }
}

/// Builds the auth environment for the configured remote.
///
/// An SSH private key wins over token settings; with neither, git's own
/// credential setup is used unchanged.
pub fn build_auth_env(settings: &GitSettings) -> Result<AuthEnv> {
    let mut env = vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())];

    if !settings.private_key.is_empty() {
        env.push(("GIT_SSH_COMMAND".to_string(), ssh_command(&settings.private_key)?));
        return Ok(AuthEnv::plain(env));
    }

    if settings.has_token() {
        let token = crate::secrets::resolve_secret(
            settings.token.as_deref(),
            settings.token_file.as_deref(),
            settings.token_env_var.as_deref(),
        )
        .map_err(|e| GitError::AuthFailed(format!("Failed to resolve git token: {}", e)))?;

        let askpass_path =
            std::env::temp_dir().join(format!(".dashsync-askpass-{}.sh", uuid::Uuid::new_v4()));
        let script = format!(
            "#!/bin/sh\necho '{}'\n",
            shell_escape_token(token.expose_secret())
        );
        write_private_script(&askpass_path, &script)?;
        let cleanup = AskpassCleanup::new(askpass_path.clone());

        let askpass = askpass_path
            .to_str()
            .ok_or_else(|| {
                GitError::AuthFailed("Temp directory path contains non-UTF8 characters".to_string())
            })?
            .to_string();
        env.push(("GIT_ASKPASS".to_string(), askpass));

        return Ok(AuthEnv {
            env_vars: env,
            _cleanup: cleanup,
        });
    }

    Ok(AuthEnv::plain(env))
}

fn ssh_command(private_key: &str) -> Result<String> {
    let key_path = PathBuf::from(crate::secrets::expand_home(private_key));
    if !key_path.exists() {
        return Err(GitError::AuthFailed(format!(
            "SSH key file not found: {}",
            key_path.display()
        )));
    }

    let escaped = key_path.display().to_string().replace('\'', "'\\''");
    let quoted = if escaped.starts_with('-') {
        format!("'./{}'", escaped)
    } else {
        format!("'{}'", escaped)
    };

    Ok(format!(
        "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
        quoted
    ))
}

#[cfg(unix)]
fn write_private_script(path: &std::path::Path, script: &str) -> Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o700)
        .open(path)?;
    file.write_all(script.as_bytes())?;
    Ok(())
}

#[cfg(not(unix))]
fn write_private_script(path: &std::path::Path, script: &str) -> Result<()> {
    std::fs::write(path, script)?;
    Ok(())
}
