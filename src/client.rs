//! HTTP client for warming requests against the backend

use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::BackendConfig;

/// Marker headers carried by every warming-originated request, so origin
/// logs can tell synthetic keep-alive load apart from real traffic.
pub const HEADER_WARMING_REQUEST: &str = "x-warming-request";
pub const HEADER_WARMING_SOURCE: &str = "x-warming-source";
const WARMING_SOURCE: &str = "keepwarm";

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Backend responded with status {0}")]
    BadStatus(StatusCode),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

pub type Result<T> = std::result::Result<T, ClientError>;

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout
        } else {
            ClientError::RequestFailed(err.to_string())
        }
    }
}

/// One content item as returned by the listing endpoint. Lenient on
/// purpose: only `id` is required, unknown fields are ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ItemId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,
    #[serde(default, alias = "coverImage", alias = "image_url")]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub views: Option<u64>,
}

/// The backend serves numeric ids; older records carry string ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    Number(u64),
    Text(String),
}

/// One fetched page of top content
#[derive(Debug, Clone)]
pub struct ContentPage {
    pub items: Vec<ContentItem>,
    pub total_available: u64,
}

/// Thin reqwest wrapper for all warming traffic
pub struct WarmingClient {
    client: Client,
    base_url: String,
    health_path: String,
    content_path: String,
}

impl WarmingClient {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_WARMING_REQUEST, HeaderValue::from_static("true"));
        headers.insert(HEADER_WARMING_SOURCE, HeaderValue::from_static(WARMING_SOURCE));

        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .timeout(config.request_timeout())
            .user_agent(&config.user_agent)
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            health_path: config.health_path.clone(),
            content_path: config.content_path.clone(),
        })
    }

    /// Probe the backend health endpoint. Any 2xx is success; the body is
    /// opportunistically inspected for a timestamp but never required.
    pub async fn probe_health(&self) -> Result<()> {
        let url = format!("{}{}", self.base_url, self.health_path);
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::BadStatus(status));
        }

        if let Ok(body) = response.json::<serde_json::Value>().await {
            if let Some(timestamp) = body.get("timestamp") {
                trace!(%timestamp, "backend health timestamp");
            }
        }

        Ok(())
    }

    /// Fetch one page of top content, sorted by popularity.
    ///
    /// Accepts either the nested `{data: {blogs, pagination: {total}}}`
    /// shape or flat top-level `blogs`/`total` keys.
    pub async fn fetch_top_content(&self, limit: usize) -> Result<ContentPage> {
        let url = format!(
            "{}{}?limit={}&sort=popular",
            self.base_url, self.content_path, limit
        );
        let response = self.client.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::BadStatus(status));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

        parse_content_page(&body)
    }

    /// Fetch an asset to pull it into intermediary caches. The body is
    /// drained and discarded.
    pub async fn prefetch_asset(&self, url: &str) -> Result<()> {
        let response = self.client.get(url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::BadStatus(status));
        }

        let bytes = response.bytes().await?;
        debug!(url, size = bytes.len(), "asset prefetched");
        Ok(())
    }
}

fn parse_content_page(body: &serde_json::Value) -> Result<ContentPage> {
    let blogs = body
        .pointer("/data/blogs")
        .or_else(|| body.get("blogs"))
        .ok_or_else(|| ClientError::MalformedResponse("no blogs field".to_string()))?;

    let items: Vec<ContentItem> = serde_json::from_value(blogs.clone())
        .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

    let total_available = body
        .pointer("/data/pagination/total")
        .or_else(|| body.get("total"))
        .and_then(|v| v.as_u64())
        .unwrap_or(items.len() as u64);

    Ok(ContentPage {
        items,
        total_available,
    })
}
