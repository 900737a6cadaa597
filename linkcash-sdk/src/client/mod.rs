//! HTTP client for the LinkCash backend.
//!
//! Gated behind the `client` cargo feature so downstream crates that only
//! need the shared types do not pull in `reqwest`.

mod links;
mod transactions;

use reqwest::{Client, StatusCode};
use url::Url;

/// Errors produced by [`BackendClient`].
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level failure (DNS, TLS, connection reset, …).
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// The server returned a non-2xx status code.
    #[error("api error: status {status}, body: {body}")]
    Api { status: StatusCode, body: String },

    /// Response body could not be deserialized.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The base URL could not be joined with the endpoint path.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
}

impl ClientError {
    /// HTTP status of an [`ClientError::Api`] error.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }

    /// Raw response body of an [`ClientError::Api`] error.
    pub fn body(&self) -> Option<&str> {
        match self {
            ClientError::Api { body, .. } => Some(body.as_str()),
            _ => None,
        }
    }
}

/// Typed HTTP client for the payment-link backend.
///
/// One method per endpoint. Path parameters are percent-encoded before they
/// are joined onto `base_url`, so identifiers taken verbatim from a URL or a
/// QR code cannot escape their path segment.
#[derive(Debug, Clone)]
pub struct BackendClient {
    http: Client,
    base_url: Url,
}

impl BackendClient {
    /// Create a new `BackendClient`.
    ///
    /// * `base_url` – root URL of the backend (e.g. `http://localhost:8080`).
    pub fn new(base_url: Url) -> Self {
        Self {
            http: Client::new(),
            base_url,
        }
    }

    /// Replace the default `reqwest::Client` with a custom one (e.g. to
    /// configure timeouts or a proxy).
    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http = client;
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        Ok(self.base_url.join(path)?)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: Url) -> Result<T, ClientError> {
        tracing::debug!(%url, "GET");
        let resp = self.http.get(url).send().await?;
        parse_response(resp).await
    }
}

/// Percent-encode a single path segment.
fn segment(raw: &str) -> std::borrow::Cow<'_, str> {
    urlencoding::encode(raw)
}

async fn parse_response<T: serde::de::DeserializeOwned>(
    resp: reqwest::Response,
) -> Result<T, ClientError> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(ClientError::Api { status, body });
    }
    let bytes = resp.bytes().await?;
    serde_json::from_slice(&bytes).map_err(ClientError::Json)
}
