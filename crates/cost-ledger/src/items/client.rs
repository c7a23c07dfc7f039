use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::domain::{Item, StoredItem};
use super::stats::Stats;
use crate::config::{ClientConfig, ConfigError};

const REQUEST_FAILED: &str = "Request failed";
const DEFAULT_MESSAGE: &str = "saved";

/// Result of a successful bulk save: stats for this batch and for everything stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulkOutcome {
    pub message: String,
    pub batch: Stats,
    pub global: Stats,
}

impl BulkOutcome {
    /// Locates batch and global stats in any of the envelopes the server has used.
    pub fn from_envelope(raw: &Value) -> Result<Self, ClientError> {
        let batch = first_stats(raw, &["/batch", "/data/batch", "/stats/batch"])?;
        let global = first_stats(
            raw,
            &["/global", "/globalStats", "/data/global", "/stats/global"],
        )?;

        let (Some(batch), Some(global)) = (batch, global) else {
            warn!(response = %raw, "unexpected bulk response shape");
            return Err(ClientError::UnexpectedResponse);
        };

        let message = raw
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_MESSAGE)
            .to_string();

        Ok(Self {
            message,
            batch,
            global,
        })
    }
}

fn first_stats(raw: &Value, pointers: &[&str]) -> Result<Option<Stats>, ClientError> {
    let Some(found) = pointers
        .iter()
        .filter_map(|pointer| raw.pointer(pointer))
        .find(|value| !value.is_null())
    else {
        return Ok(None);
    };
    serde_json::from_value(found.clone())
        .map(Some)
        .map_err(|_| ClientError::UnexpectedResponse)
}

/// Seam between the draft session and the remote ledger.
#[async_trait]
pub trait ItemsGateway: Send + Sync {
    async fn save_and_calculate(&self, items: &[Item]) -> Result<BulkOutcome, ClientError>;
}

/// HTTP client for the items API.
#[derive(Debug, Clone)]
pub struct ItemsClient {
    base_url: String,
    http: Client,
}

impl ItemsClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let base_url = ClientConfig::normalize_base_url(base_url)?;
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(ClientError::Transport)?;
        Ok(Self { base_url, http })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        Self::new(&config.api_url)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// `POST /api/items/bulk`.
    pub async fn save(&self, items: &[Item]) -> Result<BulkOutcome, ClientError> {
        debug!(count = items.len(), "submitting bulk items");
        let response = self
            .http
            .post(self.url("/api/items/bulk"))
            .json(&json!({ "items": items }))
            .send()
            .await
            .map_err(ClientError::Transport)?;
        let raw: Value = read_json(response).await?;
        BulkOutcome::from_envelope(&raw)
    }

    /// `GET /api/items?limit=N`, newest first.
    pub async fn list_items(&self, limit: usize) -> Result<Vec<StoredItem>, ClientError> {
        let response = self
            .http
            .get(self.url("/api/items"))
            .query(&[("limit", limit)])
            .send()
            .await
            .map_err(ClientError::Transport)?;
        read_json(response).await
    }
}

#[async_trait]
impl ItemsGateway for ItemsClient {
    async fn save_and_calculate(&self, items: &[Item]) -> Result<BulkOutcome, ClientError> {
        self.save(items).await
    }
}

async fn read_json<T>(response: Response) -> Result<T, ClientError>
where
    T: for<'de> Deserialize<'de>,
{
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        let message = if body.trim().is_empty() {
            REQUEST_FAILED.to_string()
        } else {
            body
        };
        return Err(ClientError::Status {
            status: status.as_u16(),
            message,
        });
    }

    response.json::<T>().await.map_err(ClientError::Decode)
}

/// Failures talking to the items API.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),
    /// Non-2xx response; `message` is the body text the server sent.
    #[error("{message}")]
    Status { status: u16, message: String },
    #[error("response was not valid JSON: {0}")]
    Decode(#[source] reqwest::Error),
    #[error("Unexpected server response. Check bulk payload keys.")]
    UnexpectedResponse,
}
