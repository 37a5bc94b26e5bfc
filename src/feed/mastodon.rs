//! Mastodon hashtag timeline source.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::client::{build_http_client, read_body, ClientHandle};
use super::types::{FeedRecord, FeedSource, Status};
use crate::config::FetchConfig;
use crate::error::{Result, TagwatchError};

/// Largest page the timeline API serves.
const MAX_PAGE_SIZE: usize = 40;

/// Reads `GET /api/v1/timelines/tag/{tag}` from one server.
pub struct MastodonSource {
    handle: ClientHandle,
    client: Client,
    limit: usize,
}

impl MastodonSource {
    /// Create a source for the server behind `handle`.
    pub fn new(handle: ClientHandle, config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            handle,
            client: build_http_client(config)?,
            limit: config.max_items_per_fetch.clamp(1, MAX_PAGE_SIZE),
        })
    }

    /// The handle this source authenticates with.
    pub fn handle(&self) -> &ClientHandle {
        &self.handle
    }

    /// Timeline URL for a tag.
    pub fn timeline_url(&self, tag: &str) -> Result<Url> {
        let mut url = self.handle.endpoint(&["api", "v1", "timelines", "tag", tag])?;
        url.query_pairs_mut()
            .append_pair("limit", &self.limit.to_string());
        Ok(url)
    }

    fn fetch_error(&self, tag: &str, message: String) -> TagwatchError {
        TagwatchError::SourceFetch {
            source_name: self.handle.server().to_string(),
            tag: tag.to_string(),
            message,
        }
    }
}

#[async_trait]
impl FeedSource for MastodonSource {
    fn name(&self) -> &str {
        self.handle.server()
    }

    async fn fetch(&self, tag: &str) -> Result<Vec<FeedRecord>> {
        let url = self.timeline_url(tag)?;
        debug!("Fetching timeline for tag '{}': {}", tag, url);

        let mut request = self.client.get(url);
        if let Some(token) = self.handle.access_token() {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| self.fetch_error(tag, format!("request failed: {}", e)))?;
        let body = read_body(response)
            .await
            .map_err(|message| self.fetch_error(tag, message))?;

        let statuses: Vec<Status> = serde_json::from_slice(&body)
            .map_err(|e| self.fetch_error(tag, format!("invalid timeline JSON: {}", e)))?;

        Ok(statuses
            .into_iter()
            .map(|status| status.into_record(self.handle.server()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeline_url() {
        let source = MastodonSource::new(
            ClientHandle::anonymous("mastodon.social"),
            &FetchConfig::default(),
        )
        .unwrap();

        let url = source.timeline_url("outage").unwrap();
        assert_eq!(
            url.as_str(),
            "https://mastodon.social/api/v1/timelines/tag/outage?limit=40"
        );
    }

    #[test]
    fn test_limit_is_clamped() {
        let config = FetchConfig {
            max_items_per_fetch: 500,
            ..FetchConfig::default()
        };
        let source =
            MastodonSource::new(ClientHandle::anonymous("mastodon.social"), &config).unwrap();
        assert_eq!(source.limit, MAX_PAGE_SIZE);

        let config = FetchConfig {
            max_items_per_fetch: 0,
            ..FetchConfig::default()
        };
        let source =
            MastodonSource::new(ClientHandle::anonymous("mastodon.social"), &config).unwrap();
        assert_eq!(source.limit, 1);
    }

    #[test]
    fn test_name_is_server() {
        let source = MastodonSource::new(
            ClientHandle::anonymous("hachyderm.io").with_token("t"),
            &FetchConfig::default(),
        )
        .unwrap();
        assert_eq!(source.name(), "https://hachyderm.io");
        assert!(source.handle().is_authenticated());
    }
}
