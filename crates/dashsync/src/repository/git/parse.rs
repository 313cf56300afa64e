//! Git output parsing helpers.

use std::process::Output;

use crate::repository::types::FileChange;

/// Separates commits in [`LOG_FORMAT`] output.
pub const RECORD_SEPARATOR: char = '\u{1e}';
/// Separates header fields in [`LOG_FORMAT`] output.
pub const FIELD_SEPARATOR: char = '\u{1f}';
/// `git log --format` producing `<RS><hash><US><author email>` headers.
pub const LOG_FORMAT: &str = "--format=%x1e%H%x1f%ae";

/// Formats a git error with both stdout and stderr.
pub fn format_git_error(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

    match (stderr.is_empty(), stdout.is_empty()) {
        (true, true) => format!(
            "Command failed with exit code {}",
            output.status.code().unwrap_or(-1)
        ),
        (true, false) => stdout,
        (false, true) => stderr,
        (false, false) => format!("{}\n{}", stderr, stdout),
    }
}

/// Push failures that leave nothing to do in this pass: the remote moved
/// ahead (the next pull catches up) or there is no local history yet.
pub fn is_benign_push_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("non-fast-forward")
        || lower.contains("fetch first")
        || (lower.contains("rejected") && lower.contains("behind"))
        || lower.contains("src refspec")
        || lower.contains("everything up-to-date")
}

/// Pull failures caused by a remote without any commit on the branch.
pub fn is_empty_remote_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("couldn't find remote ref") || lower.contains("remote repository is empty")
}

/// One commit of `git log --name-status` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub hash: String,
    pub author_email: String,
    pub changes: Vec<(FileChange, String)>,
}

/// Parses `git log` output produced with [`LOG_FORMAT`] and `--name-status`.
///
/// Status letters without a [`FileChange`] mapping are skipped.
pub fn parse_log(output: &str) -> Vec<LogEntry> {
    output
        .split(RECORD_SEPARATOR)
        .filter(|record| !record.trim().is_empty())
        .filter_map(|record| {
            let mut lines = record.lines();
            let header = lines.next()?;
            let (hash, author_email) = header.split_once(FIELD_SEPARATOR)?;

            let changes = lines
                .filter_map(|line| {
                    let (status, path) = line.split_once('\t')?;
                    Some((FileChange::from_status(status)?, path.to_string()))
                })
                .collect();

            Some(LogEntry {
                hash: hash.trim().to_string(),
                author_email: author_email.trim().to_string(),
                changes,
            })
        })
        .collect()
}

/// Parses `git ls-tree -r -z` output into `(object id, path)` pairs for blobs.
pub fn parse_ls_tree(output: &[u8]) -> Vec<(String, String)> {
    output
        .split(|b| *b == 0)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let entry = String::from_utf8_lossy(entry);
            let (meta, path) = entry.split_once('\t')?;
            let mut fields = meta.split_whitespace();
            let _mode = fields.next()?;
            let kind = fields.next()?;
            let object = fields.next()?;
            (kind == "blob").then(|| (object.to_string(), path.to_string()))
        })
        .collect()
}
