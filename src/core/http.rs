//! HTTP client utilities.
//!
//! Provides the shared HTTP client and the authenticated GET helpers used by
//! every balance probe, the async job poller and the asset fetcher.

use std::time::Duration;

use reqwest::{Client, ClientBuilder, RequestBuilder};
use serde::de::DeserializeOwned;

use crate::error::{RelayError, Result};

/// Default timeout for HTTP requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// How a vendor expects the channel key to be presented.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Auth {
    /// `Authorization: Bearer <token>`.
    Bearer(String),
    /// A vendor-specific header carrying the raw key.
    Header { name: &'static str, value: String },
}

impl Auth {
    /// Bearer auth from a channel key.
    pub fn bearer(token: impl Into<String>) -> Self {
        Self::Bearer(token.into())
    }

    fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        match self {
            Self::Bearer(token) => request.bearer_auth(token),
            Self::Header { name, value } => request.header(*name, value),
        }
    }
}

/// Build a configured HTTP client.
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn build_client(timeout: Duration) -> Result<Client> {
    ClientBuilder::new()
        .timeout(timeout)
        .user_agent(format!("relaybill/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| RelayError::Transport {
            url: String::new(),
            status: None,
            message: e.to_string(),
        })
}

/// Build a client with [`DEFAULT_TIMEOUT`].
///
/// # Errors
///
/// Returns error if client construction fails.
pub fn default_client() -> Result<Client> {
    build_client(DEFAULT_TIMEOUT)
}

fn transport_error(url: &str, e: &reqwest::Error) -> RelayError {
    let message = if e.is_timeout() {
        format!("request timed out: {e}")
    } else {
        e.to_string()
    };
    RelayError::Transport {
        url: url.to_string(),
        status: e.status().map(|s| s.as_u16()),
        message,
    }
}

/// Issue an authenticated GET and return the raw body.
///
/// Any non-2xx status is a transport error; the body is not inspected.
///
/// # Errors
///
/// Returns [`RelayError::Transport`] on network failure or non-2xx status.
pub async fn get_bytes(client: &Client, url: &str, auth: Option<&Auth>) -> Result<Vec<u8>> {
    let mut request = client.get(url);
    if let Some(auth) = auth {
        request = auth.apply(request);
    }

    let response = request.send().await.map_err(|e| transport_error(url, &e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(RelayError::Transport {
            url: url.to_string(),
            status: Some(status.as_u16()),
            message: format!("HTTP {status}"),
        });
    }

    let body = response.bytes().await.map_err(|e| transport_error(url, &e))?;
    Ok(body.to_vec())
}

/// Issue an authenticated GET and decode the JSON body.
///
/// # Errors
///
/// Returns [`RelayError::Transport`] on network failure or non-2xx status and
/// [`RelayError::Decode`] when the body is not the expected JSON shape.
pub async fn get_json<T: DeserializeOwned>(
    client: &Client,
    url: &str,
    auth: Option<&Auth>,
) -> Result<T> {
    let body = get_bytes(client, url, auth).await?;
    serde_json::from_slice(&body).map_err(|e| RelayError::decode(url, e))
}

/// Join a base URL and a path, tolerating a trailing slash on the base.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}{}", base.trim_end_matches('/'), path)
}

/// Append percent-encoded query parameters to a URL.
///
/// # Errors
///
/// Returns [`RelayError::Transport`] if `url` does not parse.
pub fn with_query(url: &str, params: &[(&str, &str)]) -> Result<String> {
    reqwest::Url::parse_with_params(url, params)
        .map(String::from)
        .map_err(|e| RelayError::Transport {
            url: url.to_string(),
            status: None,
            message: format!("invalid url: {e}"),
        })
}
