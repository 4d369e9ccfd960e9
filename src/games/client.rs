//! HTTP client for the RAWG game catalog.

use std::time::Duration;

use bytes::Bytes;
use reqwest::{Client, StatusCode, Url};
use thiserror::Error;
use tracing::{debug, error, info};

use super::dto::GamesQuery;
use crate::config::RawgConfig;

const DETAIL_PREVIEW_CHARS: usize = 200;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("RAWG API key is not configured")]
    MissingApiKey,

    #[error("The request to RAWG API timed out after {} seconds", .0.as_secs())]
    Timeout(Duration),

    #[error("RAWG API key is invalid or expired")]
    InvalidApiKey,

    #[error("RAWG API rate limit exceeded. Please try again later.")]
    RateLimited,

    #[error("RAWG API endpoint not found")]
    NotFound,

    #[error("RAWG API error: {0}")]
    Status(String),

    #[error("RAWG API request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("RAWG API returned invalid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),

    #[error("invalid RAWG URL: {0}")]
    InvalidUrl(String),
}

/// Thin proxy over RAWG: one upstream call per request, no retries.
#[derive(Debug, Clone)]
pub struct GamesClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl GamesClient {
    pub fn new(cfg: &RawgConfig) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(cfg.timeout())
            .user_agent(concat!("gamehub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        debug!(base_url = %cfg.base_url, timeout = ?cfg.timeout(), "RAWG client initialized");
        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    fn api_key(&self) -> Result<&str, UpstreamError> {
        self.api_key.as_deref().ok_or(UpstreamError::MissingApiKey)
    }

    fn games_url(&self) -> Result<Url, UpstreamError> {
        let raw = format!("{}/games", self.base_url);
        Url::parse(&raw).map_err(|e| UpstreamError::InvalidUrl(format!("{raw}: {e}")))
    }

    pub fn list_url(&self, query: &GamesQuery) -> Result<Url, UpstreamError> {
        let key = self.api_key()?;
        let mut url = self.games_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("key", key)
                .append_pair("page", &query.page.to_string())
                .append_pair("page_size", &query.page_size.to_string());
            if let Some(search) = query.search_term() {
                pairs.append_pair("search", search);
            }
        }
        Ok(url)
    }

    /// `id` becomes one path segment under `games/`. Ids that the URL parser
    /// would collapse (`.`, `..`, empty) name no game.
    pub fn detail_url(&self, id: &str) -> Result<Url, UpstreamError> {
        let key = self.api_key()?;
        if !is_game_id(id) {
            return Err(UpstreamError::NotFound);
        }
        let mut url = self.games_url()?;
        url.path_segments_mut()
            .map_err(|_| UpstreamError::InvalidUrl(self.base_url.clone()))?
            .push(id);
        url.query_pairs_mut().append_pair("key", key);
        Ok(url)
    }

    pub async fn list_games(&self, query: &GamesQuery) -> Result<Bytes, UpstreamError> {
        let url = self.list_url(query)?;
        self.fetch(url).await
    }

    pub async fn game_details(&self, id: &str) -> Result<Bytes, UpstreamError> {
        let url = self.detail_url(id)?;
        self.fetch(url).await
    }

    fn redact(&self, url: &Url) -> String {
        redact_key(url.as_str(), self.api_key.as_deref())
    }

    async fn fetch(&self, url: Url) -> Result<Bytes, UpstreamError> {
        let shown = self.redact(&url);
        info!(url = %shown, "fetching from RAWG API");

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".into());
            error!(status = status.as_u16(), body = %body, url = %shown, "RAWG API error");
            return Err(status_error(status, &body));
        }

        let bytes = response.bytes().await.map_err(|e| self.transport_error(e))?;
        serde_json::from_slice::<serde::de::IgnoredAny>(&bytes).map_err(UpstreamError::InvalidBody)?;
        debug!(url = %shown, len = bytes.len(), "RAWG API response");
        Ok(bytes)
    }

    fn transport_error(&self, e: reqwest::Error) -> UpstreamError {
        if e.is_timeout() {
            UpstreamError::Timeout(self.timeout)
        } else {
            // reqwest errors embed the URL; strip the key before it reaches logs or clients.
            UpstreamError::Transport(e.without_url())
        }
    }
}

pub fn is_game_id(id: &str) -> bool {
    !matches!(id.trim(), "" | "." | "..")
}

/// Replaces every occurrence of the API key in `url` with `***`.
pub fn redact_key(url: &str, key: Option<&str>) -> String {
    match key {
        Some(k) if !k.is_empty() => {
            let encoded: String = url::form_urlencoded::byte_serialize(k.as_bytes()).collect();
            url.replace(&encoded, "***").replace(k, "***")
        }
        _ => url.to_string(),
    }
}

fn status_error(status: StatusCode, body: &str) -> UpstreamError {
    match status {
        StatusCode::UNAUTHORIZED => UpstreamError::InvalidApiKey,
        StatusCode::TOO_MANY_REQUESTS => UpstreamError::RateLimited,
        StatusCode::NOT_FOUND => UpstreamError::NotFound,
        _ => UpstreamError::Status(error_detail(status, body)),
    }
}

/// Upstream `detail` field when the body is JSON, else a prefix of the body.
fn error_detail(status: StatusCode, body: &str) -> String {
    if body.trim().is_empty() {
        return status.as_u16().to_string();
    }
    match serde_json::from_str::<serde_json::Value>(body) {
        Ok(json) => match json.get("detail").and_then(|d| d.as_str()) {
            Some(detail) => detail.to_string(),
            None => body.chars().take(DETAIL_PREVIEW_CHARS).collect(),
        },
        Err(_) => body.chars().take(DETAIL_PREVIEW_CHARS).collect(),
    }
}
