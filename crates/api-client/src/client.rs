use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::debug;

use tutorchat_api::*;
use tutorchat_core::AuthContext;

use crate::error::{ApiError, Result};
use crate::retry::{retry_get, RetryConfig};

/// Typed HTTP client for the tutoring backend.
///
/// Credentials are not stored on the client: every method takes the caller's
/// [`AuthContext`] and forwards its bearer token, if any.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    retry: RetryConfig,
}

impl ApiClient {
    /// Create a new client for `base_url` (including the `/api` prefix).
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self::with_client(client, base_url))
    }

    /// Create from an existing `reqwest::Client` (e.g. shared in tests).
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            retry: RetryConfig::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorize(req: reqwest::RequestBuilder, auth: &AuthContext) -> reqwest::RequestBuilder {
        match auth.bearer_token() {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    // ── Sessions ──────────────────────────────────────────────────────────

    pub async fn list_sessions(&self, auth: &AuthContext) -> Result<SessionListResponse> {
        let url = self.url(paths::SESSIONS);
        debug!("listing sessions from {url}");
        let resp = retry_get(&self.client, &url, auth.bearer_token(), &self.retry).await?;
        parse_response(resp).await
    }

    pub async fn session_detail(
        &self,
        id: &str,
        auth: &AuthContext,
    ) -> Result<SessionDetailResponse> {
        let url = self.url(&paths::session_detail(id));
        let resp = retry_get(&self.client, &url, auth.bearer_token(), &self.retry).await?;
        parse_response(resp).await
    }

    pub async fn update_title(
        &self,
        id: &str,
        title: &str,
        auth: &AuthContext,
    ) -> Result<UpdateTitleResponse> {
        let req = self
            .client
            .patch(self.url(&paths::update_title(id)))
            .json(&UpdateTitleRequest {
                title: title.to_string(),
            });
        let resp = Self::authorize(req, auth).send().await?;
        parse_response(resp).await
    }

    /// Delete a session. Any response body is ignored.
    pub async fn delete_session(&self, id: &str, auth: &AuthContext) -> Result<()> {
        let req = self.client.delete(self.url(&paths::delete_session(id)));
        let resp = Self::authorize(req, auth).send().await?;
        check_status(resp).await.map(|_| ())
    }

    // ── Chat ──────────────────────────────────────────────────────────────

    pub async fn send_chat(&self, request: &ChatRequest, auth: &AuthContext) -> Result<ChatResponse> {
        let req = self.client.post(self.url(paths::CHAT)).json(request);
        let resp = Self::authorize(req, auth).send().await?;
        parse_response(resp).await
    }
}

/// Turn a non-2xx response into [`ApiError::Server`], keeping whatever error
/// body the server sent.
async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let bytes = resp.bytes().await.unwrap_or_default();
    Err(ApiError::Server {
        status: status.as_u16(),
        body: ServerErrorBody::from_bytes(&bytes),
    })
}

/// Parse an HTTP response: return the deserialized body on 2xx,
/// or [`ApiError::Server`] with the parsed error body.
async fn parse_response<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T> {
    let resp = check_status(resp).await?;
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
}
