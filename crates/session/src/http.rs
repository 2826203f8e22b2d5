//! `reqwest`-based [`AuthBackend`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;

use storegate_auth::Identity;

use crate::backend::{AuthBackend, Credentials, FetchError, LoginResponse};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
/// Upper bound on one auth request, connect through body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the storefront API's auth endpoints:
///
/// - `GET  /auth/me` (bearer) → identity
/// - `POST /auth/login` (email, password) → token + identity
/// - `POST /auth/logout` (bearer)
///
/// Every request is bounded by a timeout, so a backend that accepts the
/// connection but never answers still yields [`FetchError::Network`].
#[derive(Debug, Clone)]
pub struct HttpAuthClient {
    api_url: String,
    client: reqwest::Client,
}

impl HttpAuthClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self::with_timeout(api_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(api_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to build HTTP client; using defaults");
                reqwest::Client::new()
            });

        Self {
            api_url: api_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Reads `STOREGATE_API_URL` and `STOREGATE_API_TIMEOUT_SECS`, falling
    /// back to [`DEFAULT_API_URL`] and [`DEFAULT_TIMEOUT`].
    pub fn from_env() -> Self {
        let api_url = std::env::var("STOREGATE_API_URL").unwrap_or_else(|_| {
            tracing::debug!("STOREGATE_API_URL not set; using {DEFAULT_API_URL}");
            DEFAULT_API_URL.to_string()
        });
        let timeout = match std::env::var("STOREGATE_API_TIMEOUT_SECS") {
            Ok(raw) => parse_timeout(&raw).unwrap_or_else(|| {
                tracing::warn!(%raw, "invalid STOREGATE_API_TIMEOUT_SECS; using the default");
                DEFAULT_TIMEOUT
            }),
            Err(_) => DEFAULT_TIMEOUT,
        };
        Self::with_timeout(api_url, timeout)
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }
}

/// Whole seconds, at least one.
fn parse_timeout(raw: &str) -> Option<Duration> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn network_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        tracing::warn!(error = %e, "auth request timed out");
        FetchError::Network(format!("request timed out: {e}"))
    } else {
        FetchError::Network(e.to_string())
    }
}

fn body_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        network_error(e)
    } else {
        FetchError::Parse(e.to_string())
    }
}

async fn check_status(resp: reqwest::Response) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FetchError::Rejected(status.as_u16()));
    }
    if !status.is_success() {
        return Err(FetchError::Api(
            status.as_u16(),
            resp.text().await.unwrap_or_default(),
        ));
    }
    Ok(resp)
}

#[async_trait]
impl AuthBackend for HttpAuthClient {
    async fn fetch_identity(&self, token: &str) -> Result<Identity, FetchError> {
        let resp = self
            .client
            .get(self.url("/auth/me"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;

        check_status(resp)
            .await?
            .json()
            .await
            .map_err(body_error)
    }

    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, FetchError> {
        let resp = self
            .client
            .post(self.url("/auth/login"))
            .json(credentials)
            .send()
            .await
            .map_err(network_error)?;

        check_status(resp)
            .await?
            .json()
            .await
            .map_err(body_error)
    }

    async fn logout(&self, token: &str) -> Result<(), FetchError> {
        let resp = self
            .client
            .post(self.url("/auth/logout"))
            .bearer_auth(token)
            .send()
            .await
            .map_err(network_error)?;

        check_status(resp).await.map(|_| ())
    }
}
