//! Client handle and HTTP plumbing shared by remote sources.

use std::time::Duration;

use reqwest::Client;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{Result, TagwatchError};

/// Maximum response body size in bytes (5MB).
pub const MAX_RESPONSE_SIZE: u64 = 5 * 1024 * 1024;

/// User agent string for outgoing requests.
const USER_AGENT: &str = concat!("tagwatch/", env!("CARGO_PKG_VERSION"));

/// Credentials and server address for one remote server.
///
/// The access token is obtained elsewhere (OAuth) and injected here; an
/// anonymous handle carries none.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientHandle {
    server: String,
    access_token: Option<String>,
}

impl ClientHandle {
    /// Anonymous handle for a server host or base URL.
    pub fn anonymous(server: &str) -> Self {
        Self {
            server: normalize_server(server),
            access_token: None,
        }
    }

    /// Attach an access token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        let token = token.into();
        self.access_token = if token.is_empty() { None } else { Some(token) };
        self
    }

    /// Base URL of the server, e.g. `https://mastodon.social`.
    pub fn server(&self) -> &str {
        &self.server
    }

    /// Access token, if any.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Whether requests will be authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    /// Build an endpoint URL under the server from path segments.
    ///
    /// Segments are percent-encoded, so tag names may contain any character.
    pub fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = Url::parse(&self.server)
            .map_err(|e| TagwatchError::Feed(format!("invalid server URL {}: {}", self.server, e)))?;
        url.path_segments_mut()
            .map_err(|_| TagwatchError::Feed(format!("server URL cannot be a base: {}", self.server)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }
}

impl std::fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientHandle")
            .field("server", &self.server)
            .field("authenticated", &self.is_authenticated())
            .finish()
    }
}

/// Turn `mastodon.social` into `https://mastodon.social`; URLs pass through.
pub fn normalize_server(server: &str) -> String {
    let server = server.trim().trim_end_matches('/');
    if server.starts_with("http://") || server.starts_with("https://") {
        server.to_string()
    } else {
        format!("https://{}", server)
    }
}

/// Build an HTTP client with the configured timeouts and redirect limit.
pub fn build_http_client(config: &FetchConfig) -> Result<Client> {
    Client::builder()
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .read_timeout(Duration::from_secs(config.read_timeout_secs))
        .timeout(Duration::from_secs(config.total_timeout_secs))
        .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| TagwatchError::Feed(format!("failed to create HTTP client: {}", e)))
}

/// Read a successful response body, enforcing [`MAX_RESPONSE_SIZE`].
pub async fn read_body(response: reqwest::Response) -> std::result::Result<Vec<u8>, String> {
    if !response.status().is_success() {
        return Err(format!("HTTP error: {}", response.status()));
    }

    if let Some(content_length) = response.content_length() {
        if content_length > MAX_RESPONSE_SIZE {
            return Err(format!(
                "response too large: {} bytes (max {} bytes)",
                content_length, MAX_RESPONSE_SIZE
            ));
        }
    }

    let bytes = response
        .bytes()
        .await
        .map_err(|e| format!("failed to read response: {}", e))?;

    if bytes.len() as u64 > MAX_RESPONSE_SIZE {
        return Err(format!(
            "response too large: {} bytes (max {} bytes)",
            bytes.len(),
            MAX_RESPONSE_SIZE
        ));
    }

    Ok(bytes.to_vec())
}
