//! Test helpers for integration tests.
//!
//! Provides in-process feed sources and helpers for building a store and
//! collector without network access.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use tagwatch::config::{CollectorConfig, SourceErrorPolicy};
use tagwatch::{Collector, Database, FeedRecord, FeedSource, Result, Store, TagwatchError};

/// Default timeout for test operations.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Open a store over a fresh in-memory database.
pub async fn memory_store() -> Store {
    Store::new(Database::open_in_memory().await.unwrap())
}

/// A record tagged with `tags`.
pub fn record(uri: &str, created_at: DateTime<Utc>, tags: &[&str]) -> FeedRecord {
    FeedRecord::new(uri, created_at)
        .with_external_id(uri.rsplit('/').next().unwrap_or_default())
        .with_account_id("42")
        .with_origin_server("https://test.example")
        .with_content(format!("<p>post {}</p>", uri))
        .with_tags(tags.iter().copied())
}

pub fn tags(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

/// Build a collector over `sources` with a short poll interval.
pub fn collector(
    store: Store,
    sources: Vec<Arc<dyn FeedSource>>,
    policy: SourceErrorPolicy,
    poll_interval: Duration,
) -> Collector {
    let config = CollectorConfig {
        on_source_error: policy,
        ..CollectorConfig::default()
    };
    Collector::new(store, sources, &config).with_poll_interval(poll_interval)
}

/// Returns the records registered for each tag.
pub struct StaticSource {
    name: String,
    records: Vec<FeedRecord>,
    calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(name: &str, records: Vec<FeedRecord>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            records,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for StaticSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, tag: &str) -> Result<Vec<FeedRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .records
            .iter()
            .filter(|r| r.tag_names.iter().any(|t| t == tag))
            .cloned()
            .collect())
    }
}

/// Fails every fetch.
pub struct FailingSource {
    name: String,
    calls: AtomicUsize,
}

impl FailingSource {
    pub fn new(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for FailingSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, tag: &str) -> Result<Vec<FeedRecord>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(TagwatchError::SourceFetch {
            source_name: self.name.clone(),
            tag: tag.to_string(),
            message: "HTTP error: 503 Service Unavailable".to_string(),
        })
    }
}

/// Sleeps before answering, simulating a hung request.
pub struct SlowSource {
    delay: Duration,
    started: AtomicUsize,
}

impl SlowSource {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            delay,
            started: AtomicUsize::new(0),
        })
    }

    pub fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FeedSource for SlowSource {
    fn name(&self) -> &str {
        "slow"
    }

    async fn fetch(&self, _tag: &str) -> Result<Vec<FeedRecord>> {
        self.started.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(Vec::new())
    }
}

/// Poll `condition` until it holds or [`DEFAULT_TIMEOUT`] elapses.
pub async fn eventually<F: Fn() -> bool>(condition: F) -> bool {
    let deadline = tokio::time::Instant::now() + DEFAULT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
