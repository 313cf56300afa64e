//! Grafana HTTP API client.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, info};
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::value::RawValue;

use super::error::{RemoteError, Result};
use super::{DashboardStore, WriteOutcome};
use crate::dashboard::{self, Dashboard};

/// Default connect timeout for API requests.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default request timeout for API requests.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum length of a response body quoted in an error.
const MAX_ERROR_BODY_LENGTH: usize = 200;

/// One entry of `GET /api/search`.
#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    uri: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
}

/// Body of `GET /api/dashboards/db/<slug>`.
#[derive(Debug, Deserialize)]
struct DashboardEnvelope<'a> {
    #[serde(borrow)]
    dashboard: &'a RawValue,
    meta: DashboardMeta,
}

#[derive(Debug, Deserialize)]
struct DashboardMeta {
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    version: u64,
}

/// Body of `POST /api/dashboards/db`.
#[derive(serde::Serialize)]
struct CreateOrUpdateRequest<'a> {
    dashboard: &'a RawValue,
    overwrite: bool,
}

/// Response of `POST /api/dashboards/db`, success or not.
#[derive(Debug, Default, Deserialize)]
struct CreateOrUpdateResponse {
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    version: Option<u64>,
    #[serde(default)]
    message: Option<String>,
}

/// Grafana dashboard store.
pub struct GrafanaClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

impl GrafanaClient {
    /// Creates a client for a Grafana instance.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .timeout(DEFAULT_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| RemoteError::Unavailable(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: normalize_base_url(base_url),
            api_key,
        })
    }

    /// Base URL without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Performs a request against `/api/<endpoint>` and returns the status and body.
    async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<Vec<u8>>,
    ) -> Result<(StatusCode, Vec<u8>)> {
        let route = format!("/api/{}", endpoint);
        debug!("Querying the Grafana HTTP API: {} {}", method, route);

        let mut request = self
            .client
            .request(method.clone(), format!("{}{}", self.base_url, route))
            .bearer_auth(self.api_key.expose_secret());

        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        debug!("The Grafana HTTP API responded: {} {} -> {}", method, route, status);

        if status == StatusCode::NOT_FOUND {
            return Err(RemoteError::NotFound(route));
        }

        Ok((status, bytes.to_vec()))
    }
}

#[async_trait]
impl DashboardStore for GrafanaClient {
    async fn list(&self) -> Result<Vec<String>> {
        let (status, body) = self.request(Method::GET, "search", None).await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }

        let hits: Vec<SearchHit> = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        Ok(hits
            .into_iter()
            .filter(|hit| hit.kind.as_deref().unwrap_or("dash-db") == "dash-db")
            .filter_map(|hit| key_from_uri(&hit.uri).map(str::to_string))
            .collect())
    }

    async fn get(&self, key: &str) -> Result<Dashboard> {
        let endpoint = format!("dashboards/db/{}", key);
        let (status, body) = self.request(Method::GET, &endpoint, None).await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }

        let envelope: DashboardEnvelope<'_> = serde_json::from_slice(&body)
            .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;
        let content = envelope.dashboard.get().as_bytes().to_vec();
        let identifier = envelope
            .meta
            .slug
            .filter(|slug| !slug.is_empty())
            .unwrap_or_else(|| key.to_string());

        Dashboard::keyed(identifier, envelope.meta.version, content)
            .map_err(|e| RemoteError::InvalidResponse(format!("dashboard '{}': {}", key, e)))
    }

    async fn create_or_update(&self, content: &[u8]) -> Result<WriteOutcome> {
        let raw: &RawValue = serde_json::from_slice(content)
            .map_err(|e| RemoteError::InvalidRequest(format!("dashboard is not valid JSON: {}", e)))?;
        let payload = serde_json::to_vec(&CreateOrUpdateRequest {
            dashboard: raw,
            overwrite: true,
        })
        .map_err(|e| RemoteError::InvalidResponse(e.to_string()))?;

        let (status, body) = match self
            .request(Method::POST, "dashboards/db", Some(payload))
            .await
        {
            Ok(response) => response,
            Err(RemoteError::NotFound(route)) => {
                return Err(RemoteError::Rejected {
                    status: StatusCode::NOT_FOUND.as_u16(),
                    message: format!("{} not found", route),
                })
            }
            Err(e) => return Err(e),
        };

        let parsed: CreateOrUpdateResponse = serde_json::from_slice(&body).unwrap_or_default();

        if !status.is_success() {
            let slug = dashboard::identifier_of(content).unwrap_or_else(|_| "<untitled>".into());
            return Err(RemoteError::Rejected {
                status: status.as_u16(),
                message: format!(
                    "Failed to update dashboard {} ({}): {}",
                    slug,
                    parsed.status.as_deref().unwrap_or("error"),
                    parsed
                        .message
                        .unwrap_or_else(|| truncate_body(&body)),
                ),
            });
        }

        info!(
            "Grafana accepted dashboard write (version {:?})",
            parsed.version
        );

        Ok(WriteOutcome {
            status: parsed.status.unwrap_or_else(|| "success".to_string()),
            version: parsed.version,
            message: parsed.message,
        })
    }

    async fn delete(&self, identifier: &str) -> Result<()> {
        let endpoint = format!("dashboards/db/{}", identifier);
        let (status, body) = self.request(Method::DELETE, &endpoint, None).await?;
        if !status.is_success() {
            return Err(rejected(status, &body));
        }
        Ok(())
    }
}

/// Grafana rejects double slashes in API routes.
fn normalize_base_url(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

/// Extracts the dashboard key from a search URI (`db/<slug>`).
fn key_from_uri(uri: &str) -> Option<&str> {
    let key = uri.strip_prefix("db/").unwrap_or(uri);
    if key.is_empty() {
        None
    } else {
        Some(key)
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
}

fn rejected(status: StatusCode, body: &[u8]) -> RemoteError {
    let message = serde_json::from_slice::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.message)
        .unwrap_or_else(|| truncate_body(body));
    RemoteError::Rejected {
        status: status.as_u16(),
        message,
    }
}

fn truncate_body(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    if text.len() > MAX_ERROR_BODY_LENGTH {
        let mut end = MAX_ERROR_BODY_LENGTH;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... (truncated)", &text[..end])
    } else {
        text.into_owned()
    }
}
