//! HTTP client for the simulation backend
//!
//! Plain JSON request/response calls for audiences and history, plus the
//! streamed `POST /api/simulate` whose NDJSON body is fed through the
//! decoder chunk by chunk as it arrives.

mod error;

pub use error::ClientError;

use crate::config::Config;
use crate::decoder::{decode_stream, StreamSummary};
use crate::events::EventHandler;
use crate::models::{Audience, EmailDraft, HistoryItem, SimulationDetail, StatusReply};
use futures::StreamExt;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Longest error body kept in a `ClientError::Status`
const MAX_ERROR_BODY: usize = 500;

/// Client for one backend base URL
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(base_url: &str, request_timeout: Duration) -> Result<Self, ClientError> {
        let base = Url::parse(base_url).map_err(|e| ClientError::InvalidUrl {
            url: base_url.to_string(),
            reason: e.to_string(),
        })?;

        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(ClientError::InvalidUrl {
                url: base_url.to_string(),
                reason: "expected an http(s) base URL".to_string(),
            });
        }

        // No client-wide timeout: it would also cut off long simulation
        // streams. Plain calls set `request_timeout` per request instead.
        let mut builder = reqwest::Client::builder()
            .connect_timeout(request_timeout)
            .pool_max_idle_per_host(4);
        if matches!(base.host_str(), Some("localhost" | "127.0.0.1" | "[::1]")) {
            builder = builder.no_proxy();
        }
        let http = builder
            .build()
            .map_err(|source| ClientError::Request {
                url: base_url.to_string(),
                source,
            })?;

        Ok(Self {
            http,
            base,
            request_timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ClientError> {
        Self::new(&config.api_url, config.request_timeout)
    }

    /// Base URL joined with percent-encoded path segments
    pub fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    // ─────────────────────────────────────────────────────────────────────
    // REST endpoints
    // ─────────────────────────────────────────────────────────────────────

    pub async fn health(&self) -> Result<StatusReply, ClientError> {
        self.get_json(self.endpoint(&["health"])).await
    }

    pub async fn list_audiences(&self) -> Result<Vec<Audience>, ClientError> {
        self.get_json(self.endpoint(&["api", "audiences"])).await
    }

    /// Stored runs, newest first
    pub async fn list_history(&self) -> Result<Vec<HistoryItem>, ClientError> {
        self.get_json(self.endpoint(&["api", "history"])).await
    }

    pub async fn history_detail(&self, id: &str) -> Result<SimulationDetail, ClientError> {
        self.get_json(self.endpoint(&["api", "history", id])).await
    }

    /// Delete every stored run
    pub async fn clear_history(&self) -> Result<StatusReply, ClientError> {
        let url = self.endpoint(&["api", "history"]);
        let request = self.http.delete(url.clone()).timeout(self.request_timeout);
        let response = send(&url, request).await?;
        read_json(&url, response).await
    }

    // ─────────────────────────────────────────────────────────────────────
    // Streaming simulation
    // ─────────────────────────────────────────────────────────────────────

    /// Submit `draft` and decode the NDJSON reply into `handler`
    ///
    /// Events are dispatched as their lines arrive. `stream_timeout` bounds
    /// the whole exchange; hitting it drops the connection and stops any
    /// further dispatch.
    pub async fn simulate<H: EventHandler + ?Sized>(
        &self,
        draft: &EmailDraft,
        handler: &mut H,
        stream_timeout: Duration,
    ) -> Result<StreamSummary, ClientError> {
        let url = self.endpoint(&["api", "simulate"]);
        tracing::info!(
            audience = %draft.audience,
            sample_size = draft.sample_size,
            "Submitting draft for simulation"
        );

        let exchange = self.stream_simulation(&url, draft, handler);

        match tokio::time::timeout(stream_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => {
                tracing::warn!(timeout = ?stream_timeout, "Simulation stream timed out");
                Err(ClientError::Timeout(stream_timeout))
            }
        }
    }

    async fn stream_simulation<H: EventHandler + ?Sized>(
        &self,
        url: &Url,
        draft: &EmailDraft,
        handler: &mut H,
    ) -> Result<StreamSummary, ClientError> {
        let request = self.http.post(url.clone()).json(draft);
        let response = send(url, request).await?;

        if response.content_length() == Some(0) {
            return Err(ClientError::MissingBody(url.to_string()));
        }

        let chunks = response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::Stream));
        decode_stream(chunks, handler).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        let request = self.http.get(url.clone()).timeout(self.request_timeout);
        let response = send(&url, request).await?;
        read_json(&url, response).await
    }
}

/// Send a request and turn non-success statuses into `ClientError::Status`
async fn send(
    url: &Url,
    request: reqwest::RequestBuilder,
) -> Result<reqwest::Response, ClientError> {
    tracing::debug!(%url, "Sending request");

    let response = request.send().await.map_err(|source| ClientError::Request {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(ClientError::Status {
        url: url.to_string(),
        status,
        body: crate::util::truncate_utf8_safe(&body, MAX_ERROR_BODY).to_string(),
    })
}

async fn read_json<T: DeserializeOwned>(
    url: &Url,
    response: reqwest::Response,
) -> Result<T, ClientError> {
    let body = response.text().await.map_err(|source| ClientError::Request {
        url: url.to_string(),
        source,
    })?;

    serde_json::from_str(&body).map_err(|source| ClientError::Decode {
        url: url.to_string(),
        source,
    })
}
