//! GitLab push webhook.
//!
//! The HTTP handler only authenticates and queues events. A single worker
//! drains the queue in arrival order and runs one push pass per event.

use std::collections::BTreeMap;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::engine::{ChangeSet, Engine, PushPass, Result};
use crate::repository::{ChangedPaths, FileChange, GitError, Repository, Revision};

/// Header carrying the shared secret.
pub const TOKEN_HEADER: &str = "X-Gitlab-Token";

/// Events waiting for the worker before new ones are refused.
pub const QUEUE_CAPACITY: usize = 32;

/// Push event body. Fields the trigger does not use are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushEvent {
    #[serde(default)]
    pub object_kind: String,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
    #[serde(default)]
    pub before: String,
    #[serde(default)]
    pub after: String,
    #[serde(default)]
    pub commits: Vec<PushCommit>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushCommit {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: CommitAuthorInfo,
    #[serde(default)]
    pub added: Vec<String>,
    #[serde(default)]
    pub modified: Vec<String>,
    #[serde(default)]
    pub removed: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommitAuthorInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl PushEvent {
    /// Net file changes of the commits not authored by `bot_email`, folded
    /// in commit order.
    pub fn changed_paths(&self, bot_email: &str) -> ChangedPaths {
        let mut paths = ChangedPaths::default();
        for commit in &self.commits {
            if commit.author.email == bot_email {
                debug!(commit = %commit.id, "skipping own commit");
                continue;
            }
            for path in &commit.added {
                paths.record(path, FileChange::Added);
            }
            for path in &commit.modified {
                paths.record(path, FileChange::Modified);
            }
            for path in &commit.removed {
                paths.record(path, FileChange::Removed);
            }
        }
        paths
    }
}

#[derive(Clone)]
struct WebhookState {
    secret: Arc<SecretString>,
    branch_ref: Arc<str>,
    queue: mpsc::Sender<PushEvent>,
}

/// Builds the webhook router and the receiving end of its event queue.
pub fn router(
    path: &str,
    secret: SecretString,
    branch: &str,
) -> (Router, mpsc::Receiver<PushEvent>) {
    let (queue, events) = mpsc::channel(QUEUE_CAPACITY);
    let state = WebhookState {
        secret: Arc::new(secret),
        branch_ref: Arc::from(format!("refs/heads/{}", branch)),
        queue,
    };
    let router = Router::new()
        .route(path, post(handle_push))
        .with_state(state);
    (router, events)
}

async fn handle_push(
    State(state): State<WebhookState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let token = headers
        .get(TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if token != Some(state.secret.expose_secret()) {
        warn!("webhook call rejected: bad or missing token");
        return StatusCode::UNAUTHORIZED;
    }

    let event: PushEvent = match serde_json::from_slice(&body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "webhook body is not a push event");
            return StatusCode::BAD_REQUEST;
        }
    };

    if event.object_kind != "push" {
        debug!(kind = %event.object_kind, "ignoring non-push event");
        return StatusCode::OK;
    }
    if event.git_ref != *state.branch_ref {
        debug!(git_ref = %event.git_ref, "ignoring push to another branch");
        return StatusCode::OK;
    }

    match state.queue.try_send(event) {
        Ok(()) => StatusCode::OK,
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!("webhook queue full, event refused");
            StatusCode::SERVICE_UNAVAILABLE
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            error!("webhook worker is gone, event refused");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Processes queued events one at a time until the queue closes.
pub async fn run_worker(
    engine: Arc<Engine>,
    mut events: mpsc::Receiver<PushEvent>,
    bot_email: String,
) {
    while let Some(event) = events.recv().await {
        let span = info_span!("webhook_event", after = %event.after);
        match process_event(&engine, &event, &bot_email)
            .instrument(span)
            .await
        {
            Ok(Some(pass)) if !pass.report.is_success() => warn!(
                failures = pass.report.failures.len(),
                "push event partially applied"
            ),
            Ok(_) => {}
            Err(e) => error!(error = %e, "push event not processed"),
        }
    }
    debug!("webhook queue closed");
}

/// Syncs the working tree and pushes the event's human changes.
///
/// Removed files are read from the event's `before` revision. The local head
/// seen before the sync stands in when the event has no usable `before`.
pub async fn process_event(
    engine: &Engine,
    event: &PushEvent,
    bot_email: &str,
) -> Result<Option<PushPass>> {
    let paths = event.changed_paths(bot_email);
    if paths.is_empty() {
        debug!("no human changes in push event");
        return Ok(None);
    }

    let repo = engine.repository();
    let local_head = match repo.latest_revision().await {
        Ok(revision) => revision,
        Err(GitError::NotInitialized(_)) => None,
        Err(e) => return Err(e.into()),
    };
    repo.sync(true).await?;

    let previous = snapshot_before(&**repo, &event.before, local_head.as_ref()).await?;
    let change_set = ChangeSet::from_working_tree(paths, repo.root(), &previous).await;

    info!(changes = change_set.len(), "pushing changes from webhook");
    Ok(Some(engine.push_pass(&change_set).await))
}

/// All-zero SHA GitLab sends when a branch is created.
fn is_null_revision(sha: &str) -> bool {
    sha.is_empty() || sha.bytes().all(|b| b == b'0')
}

async fn snapshot_before(
    repo: &dyn Repository,
    before: &str,
    local_head: Option<&Revision>,
) -> Result<BTreeMap<String, Vec<u8>>> {
    if !is_null_revision(before) {
        match repo.files_at(&Revision::new(before)).await {
            Ok(files) => return Ok(files),
            Err(e) => warn!(
                before = %before,
                error = %e,
                "event base revision unreadable, using local head"
            ),
        }
    }
    Ok(match local_head {
        Some(revision) => repo.files_at(revision).await?,
        None => BTreeMap::new(),
    })
}

/// Serves the router on `listener` until `shutdown` resolves.
pub async fn serve_on<F>(
    listener: TcpListener,
    router: Router,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "webhook listening");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
}

/// Binds `addr` and serves the router until `shutdown` resolves.
pub async fn serve<F>(addr: SocketAddr, router: Router, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, router, shutdown).await
}
