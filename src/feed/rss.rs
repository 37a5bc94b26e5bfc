//! Per-tag RSS source.
//!
//! Mastodon publishes `GET /tags/{tag}.rss` without authentication. Items
//! carry the post link, HTML description, publication date and the post's
//! hashtags as categories.

use async_trait::async_trait;
use feed_rs::parser;
use reqwest::Client;
use tracing::debug;
use url::Url;

use super::client::{build_http_client, read_body, ClientHandle};
use super::types::{FeedRecord, FeedSource};
use crate::config::FetchConfig;
use crate::error::{Result, TagwatchError};

/// Reads the public tag RSS feed of one server.
pub struct RssTagSource {
    handle: ClientHandle,
    client: Client,
    max_items: usize,
}

impl RssTagSource {
    /// Create a source for the server behind `handle`.
    pub fn new(handle: ClientHandle, config: &FetchConfig) -> Result<Self> {
        Ok(Self {
            handle,
            client: build_http_client(config)?,
            max_items: config.max_items_per_fetch,
        })
    }

    /// Feed URL for a tag.
    pub fn feed_url(&self, tag: &str) -> Result<Url> {
        self.handle.endpoint(&["tags", &format!("{}.rss", tag)])
    }
}

#[async_trait]
impl FeedSource for RssTagSource {
    fn name(&self) -> &str {
        self.handle.server()
    }

    async fn fetch(&self, tag: &str) -> Result<Vec<FeedRecord>> {
        let url = self.feed_url(tag)?;
        debug!("Fetching tag feed '{}': {}", tag, url);

        let fetch_error = |message: String| TagwatchError::SourceFetch {
            source_name: self.handle.server().to_string(),
            tag: tag.to_string(),
            message,
        };

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| fetch_error(format!("request failed: {}", e)))?;
        let body = read_body(response).await.map_err(fetch_error)?;

        parse_tag_feed(&body, self.handle.server(), self.max_items).map_err(fetch_error)
    }
}

/// Parse a tag feed into records attributed to `origin_server`.
///
/// Entries without a publication date are dropped.
pub fn parse_tag_feed(
    bytes: &[u8],
    origin_server: &str,
    max_items: usize,
) -> std::result::Result<Vec<FeedRecord>, String> {
    let feed = parser::parse(bytes).map_err(|e| format!("failed to parse feed: {}", e))?;
    let language = feed.language.clone();

    let records = feed
        .entries
        .into_iter()
        .filter_map(|entry| {
            let created_at = entry.published.or(entry.updated)?;
            let link = entry
                .links
                .first()
                .map(|l| l.href.clone())
                .unwrap_or_else(|| entry.id.clone());
            let (account_id, external_id) = split_post_link(&link);
            let content = entry
                .summary
                .map(|t| t.content)
                .or(entry.content.and_then(|c| c.body))
                .unwrap_or_default();

            let mut record = FeedRecord::new(canonical_uri(&link), created_at)
                .with_external_id(external_id)
                .with_account_id(account_id)
                .with_origin_server(origin_server)
                .with_content(content)
                .with_tags(entry.categories.into_iter().map(|c| c.term));
            record.language = language.clone();
            Some(record)
        })
        .take(max_items)
        .collect();

    Ok(records)
}

/// Split `https://host/@alice/123` into `("alice", "123")`.
fn split_post_link(link: &str) -> (String, String) {
    let Ok(url) = Url::parse(link) else {
        return (String::new(), link.to_string());
    };
    let segments: Vec<&str> = url
        .path_segments()
        .map(|s| s.filter(|seg| !seg.is_empty()).collect())
        .unwrap_or_default();

    let account = segments
        .iter()
        .find_map(|seg| seg.strip_prefix('@'))
        .unwrap_or_default()
        .to_string();
    let id = segments.last().copied().unwrap_or_default().to_string();
    (account, id)
}

/// Rewrite a local web link (`/@alice/123`) to the ActivityPub URI form
/// (`/users/alice/statuses/123`) the timeline API reports, so both sources
/// dedup against each other. Other links are returned unchanged.
fn canonical_uri(link: &str) -> String {
    let Ok(mut url) = Url::parse(link) else {
        return link.to_string();
    };
    let segments: Vec<String> = match url.path_segments() {
        Some(s) => s.filter(|seg| !seg.is_empty()).map(str::to_string).collect(),
        None => return link.to_string(),
    };

    match segments.as_slice() {
        [account, id]
            if account.len() > 1
                && account.starts_with('@')
                && !account[1..].contains('@')
                && id.chars().all(|c| c.is_ascii_digit()) =>
        {
            let path = format!("/users/{}/statuses/{}", &account[1..], id);
            url.set_path(&path);
            url.to_string()
        }
        _ => link.to_string(),
    }
}
