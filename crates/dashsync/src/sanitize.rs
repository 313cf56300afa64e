//! Helpers for keeping credentials out of log lines and span fields.

use std::path::Path;

/// Returns only the filename component of a path.
pub fn redact_path(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("<unknown>")
        .to_string()
}

/// Strips userinfo from a git remote URL.
///
/// - `https://token@gitlab.com/ops/dashboards` → `https://****@gitlab.com/ops/dashboards`
/// - `git@gitlab.com:ops/dashboards.git` is returned unchanged
pub fn redact_repo_url(url: &str) -> String {
    if let Some(scheme_end) = url.find("://") {
        let after_scheme = &url[scheme_end + 3..];
        let authority_end = after_scheme.find('/').unwrap_or(after_scheme.len());
        if let Some(at_pos) = after_scheme[..authority_end].rfind('@') {
            let scheme = &url[..scheme_end + 3];
            return format!("{}****@{}", scheme, &after_scheme[at_pos + 1..]);
        }
    }

    url.to_string()
}
