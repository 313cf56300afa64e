//! The dashboard store the engine mirrors.
//!
//! The engine only ever talks to a [`DashboardStore`]; the Grafana HTTP
//! client is one implementation of it.

pub mod error;
pub mod grafana;

use async_trait::async_trait;
use serde::Serialize;

use crate::dashboard::Dashboard;

pub use error::{RemoteError, Result};
pub use grafana::GrafanaClient;

/// Outcome of a successful create-or-update call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteOutcome {
    /// Status string reported by the store.
    pub status: String,
    /// Version the store assigned to the written dashboard.
    pub version: Option<u64>,
    /// Optional human-readable detail.
    pub message: Option<String>,
}

/// Remote dashboard store.
///
/// `list` returns the keys `get` accepts. Whether `create_or_update` creates
/// or updates is decided by the store from the content itself.
#[async_trait]
pub trait DashboardStore: Send + Sync {
    async fn list(&self) -> Result<Vec<String>>;

    async fn get(&self, key: &str) -> Result<Dashboard>;

    async fn create_or_update(&self, content: &[u8]) -> Result<WriteOutcome>;

    async fn delete(&self, identifier: &str) -> Result<()>;
}
