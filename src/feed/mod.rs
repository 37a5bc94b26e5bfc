//! Feed sources for tagwatch.
//!
//! A source answers "which posts currently carry this tag". Remote sources
//! talk to a Mastodon-compatible server; the file source replays local data.

pub mod client;
pub mod file;
pub mod html;
pub mod mastodon;
pub mod rss;
pub mod types;

pub use client::{build_http_client, normalize_server, ClientHandle, MAX_RESPONSE_SIZE};
pub use file::FileSource;
pub use html::strip_html;
pub use mastodon::MastodonSource;
pub use rss::{parse_tag_feed, RssTagSource};
pub use types::{FeedRecord, FeedSource, Status, StatusAccount, StatusTag, DEFAULT_LANGUAGE};

use std::sync::Arc;

use crate::config::{FetchConfig, SourceConfig, SourceKind};
use crate::error::{Result, TagwatchError};

/// Build the configured sources, preserving their order.
pub fn build_sources(
    configs: &[SourceConfig],
    fetch: &FetchConfig,
) -> Result<Vec<Arc<dyn FeedSource>>> {
    configs.iter().map(|config| build_source(config, fetch)).collect()
}

/// Build one source from its configuration.
pub fn build_source(config: &SourceConfig, fetch: &FetchConfig) -> Result<Arc<dyn FeedSource>> {
    let source: Arc<dyn FeedSource> = match config.kind {
        SourceKind::Mastodon => {
            let mut handle = ClientHandle::anonymous(&config.server);
            if let Some(token) = &config.access_token {
                handle = handle.with_token(token.as_str());
            }
            Arc::new(MastodonSource::new(handle, fetch)?)
        }
        SourceKind::Rss => Arc::new(RssTagSource::new(
            ClientHandle::anonymous(&config.server),
            fetch,
        )?),
        SourceKind::File => {
            let path = config
                .path
                .as_deref()
                .filter(|p| !p.is_empty())
                .ok_or_else(|| TagwatchError::Config("file source requires a path".to_string()))?;
            Arc::new(FileSource::new(path))
        }
    };
    Ok(source)
}
