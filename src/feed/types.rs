//! Feed source types for tagwatch.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::Result;

/// Language stored when a source does not report one.
pub const DEFAULT_LANGUAGE: &str = "en";

/// A post-like record produced by a feed source.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedRecord {
    /// Post id on the origin server.
    pub external_id: String,
    /// Author account id on the origin server.
    pub account_id: String,
    /// Server the record was fetched from.
    pub origin_server: String,
    /// Canonical URI of the post (dedup key).
    pub uri: String,
    /// Language code, if the source supplied one.
    pub language: Option<String>,
    /// Post body as HTML.
    pub content_html: String,
    /// When the post was created.
    pub created_at: DateTime<Utc>,
    /// Tag names attached to the post.
    pub tag_names: Vec<String>,
}

impl FeedRecord {
    /// Create a record with the required fields.
    pub fn new(uri: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            external_id: String::new(),
            account_id: String::new(),
            origin_server: String::new(),
            uri: uri.into(),
            language: None,
            content_html: String::new(),
            created_at,
            tag_names: Vec::new(),
        }
    }

    /// Set the post id on the origin server.
    pub fn with_external_id(mut self, id: impl Into<String>) -> Self {
        self.external_id = id.into();
        self
    }

    /// Set the author account id.
    pub fn with_account_id(mut self, id: impl Into<String>) -> Self {
        self.account_id = id.into();
        self
    }

    /// Set the origin server.
    pub fn with_origin_server(mut self, server: impl Into<String>) -> Self {
        self.origin_server = server.into();
        self
    }

    /// Set the language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    /// Set the HTML content.
    pub fn with_content(mut self, html: impl Into<String>) -> Self {
        self.content_html = html.into();
        self
    }

    /// Set the tag names.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tag_names = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Language to store, falling back to [`DEFAULT_LANGUAGE`].
    pub fn language_or_default(&self) -> &str {
        match self.language.as_deref() {
            Some(lang) if !lang.is_empty() => lang,
            _ => DEFAULT_LANGUAGE,
        }
    }
}

/// A provider of tagged post records.
///
/// Implementations may call a remote server or read local data; the
/// collector treats them alike.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Human-readable name used in logs and errors.
    fn name(&self) -> &str;

    /// Fetch the records currently listed for `tag`, in source order.
    async fn fetch(&self, tag: &str) -> Result<Vec<FeedRecord>>;
}

/// A status in the Mastodon REST wire format.
#[derive(Debug, Clone, Deserialize)]
pub struct Status {
    pub id: String,
    pub uri: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub account: StatusAccount,
    #[serde(default)]
    pub tags: Vec<StatusTag>,
}

/// Account section of a [`Status`].
#[derive(Debug, Clone, Deserialize)]
pub struct StatusAccount {
    pub id: String,
}

/// Tag section of a [`Status`].
#[derive(Debug, Clone, Deserialize)]
pub struct StatusTag {
    pub name: String,
}

impl Status {
    /// Convert into a feed record attributed to `origin_server`.
    pub fn into_record(self, origin_server: &str) -> FeedRecord {
        FeedRecord {
            external_id: self.id,
            account_id: self.account.id,
            origin_server: origin_server.to_string(),
            uri: self.uri,
            language: self.language,
            content_html: self.content,
            created_at: self.created_at,
            tag_names: self.tags.into_iter().map(|t| t.name).collect(),
        }
    }
}
