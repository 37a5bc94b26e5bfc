//! Post store for tagwatch.
//!
//! The store is the only component that touches the `tags`, `posts` and
//! `post_tags` tables. It is cheap to clone; clones share one pool.

mod repository;
mod types;

pub use repository::{PostRepository, TagRepository};
pub use types::{AggregatedPost, InsertOutcome, Report, StoreCounts};

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::datetime::to_db_datetime;
use crate::db::Database;
use crate::feed::FeedRecord;
use crate::{Result, TagwatchError};

/// Shared handle to the post store.
#[derive(Clone, Debug)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Return the id of the tag named `name`, creating it if needed.
    pub async fn upsert_tag(&self, name: &str) -> Result<i64> {
        if name.is_empty() {
            return Err(TagwatchError::Validation("tag name is empty".to_string()));
        }
        let mut conn = self.db.pool().acquire().await?;
        repository::upsert_tag_in(&mut *conn, name).await
    }

    /// Whether a post with this uri is stored.
    pub async fn exists(&self, uri: &str) -> Result<bool> {
        PostRepository::new(self.db.pool()).exists(uri).await
    }

    /// Store a record with its tags unless its uri is already known.
    ///
    /// The post row, tag rows and links are written in one transaction;
    /// on any failure nothing of this record is kept. Empty tag names are
    /// ignored and repeated names produce a single link.
    pub async fn insert_post(
        &self,
        record: &FeedRecord,
        tag_names: &[String],
    ) -> Result<InsertOutcome> {
        let mut tx = self.db.begin().await?;

        let Some(post_id) = repository::insert_post_row_in(&mut *tx, record).await? else {
            debug!("Skipping known post {}", record.uri);
            return Ok(InsertOutcome::Skipped);
        };

        let names: BTreeSet<&str> = tag_names
            .iter()
            .map(String::as_str)
            .filter(|name| !name.is_empty())
            .collect();
        for name in names {
            let tag_id = repository::upsert_tag_in(&mut *tx, name).await?;
            repository::link_in(&mut *tx, post_id, tag_id).await?;
        }

        tx.commit()
            .await
            .map_err(|e| TagwatchError::Database(e.to_string()))?;

        debug!("Stored post {} as #{}", record.uri, post_id);
        Ok(InsertOutcome::Inserted(post_id))
    }

    /// Posts tagged with any of `tag_names` newer than `now - window`.
    ///
    /// A window reaching before the representable date range is a
    /// validation error.
    pub async fn report(
        &self,
        tag_names: &[String],
        window: chrono::Duration,
    ) -> Result<Vec<AggregatedPost>> {
        let cutoff = Utc::now().checked_sub_signed(window).ok_or_else(|| {
            TagwatchError::Validation(format!("report window of {} is too large", window))
        })?;
        let cutoff = to_db_datetime(&cutoff);
        PostRepository::new(self.db.pool())
            .list_tagged_since(tag_names, &cutoff)
            .await
    }

    /// Row counts for status reporting.
    pub async fn counts(&self) -> Result<StoreCounts> {
        let posts = PostRepository::new(self.db.pool());
        Ok(StoreCounts {
            posts: posts.count().await?,
            tags: TagRepository::new(self.db.pool()).count().await?,
            links: posts.count_links().await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration};

    async fn setup() -> Store {
        Store::new(Database::open_in_memory().await.unwrap())
    }

    fn record(uri: &str, created_at: DateTime<Utc>) -> FeedRecord {
        FeedRecord::new(uri, created_at)
            .with_external_id("1")
            .with_account_id("42")
            .with_origin_server("https://mastodon.social")
            .with_content("<p>Power is <b>out</b></p>")
    }

    fn tags(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_upsert_tag_is_idempotent() {
        let store = setup().await;

        let first = store.upsert_tag("outage").await.unwrap();
        let second = store.upsert_tag("outage").await.unwrap();
        let other = store.upsert_tag("Outage").await.unwrap();

        assert_eq!(first, second);
        assert_ne!(first, other);
        assert_eq!(store.counts().await.unwrap().tags, 2);
    }

    #[tokio::test]
    async fn test_upsert_empty_tag_rejected() {
        let store = setup().await;
        assert!(matches!(
            store.upsert_tag("").await,
            Err(TagwatchError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_insert_same_uri_twice() {
        let store = setup().await;
        let rec = record("https://a.example/1", Utc::now());

        let first = store.insert_post(&rec, &tags(&["outage"])).await.unwrap();
        let second = store.insert_post(&rec, &tags(&["outage"])).await.unwrap();

        assert!(first.is_inserted());
        assert_eq!(second, InsertOutcome::Skipped);
        assert_eq!(
            store.counts().await.unwrap(),
            StoreCounts {
                posts: 1,
                tags: 1,
                links: 1
            }
        );
    }

    #[tokio::test]
    async fn test_exists() {
        let store = setup().await;
        assert!(!store.exists("https://a.example/1").await.unwrap());

        store
            .insert_post(&record("https://a.example/1", Utc::now()), &[])
            .await
            .unwrap();
        assert!(store.exists("https://a.example/1").await.unwrap());
    }

    #[tokio::test]
    async fn test_duplicate_tag_names_link_once() {
        let store = setup().await;
        store
            .insert_post(
                &record("https://a.example/1", Utc::now()),
                &tags(&["outage", "outage", ""]),
            )
            .await
            .unwrap();

        let counts = store.counts().await.unwrap();
        assert_eq!(counts.tags, 1);
        assert_eq!(counts.links, 1);
    }

    #[tokio::test]
    async fn test_stored_columns() {
        let store = setup().await;
        let rec = record("https://a.example/1", Utc::now());
        store.insert_post(&rec, &[]).await.unwrap();

        let (lang, text): (String, String) =
            sqlx::query_as("SELECT lang, content_text FROM posts WHERE uri = ?")
                .bind("https://a.example/1")
                .fetch_one(store.database().pool())
                .await
                .unwrap();
        assert_eq!(lang, "en");
        assert_eq!(text, "Power is out");
    }

    #[tokio::test]
    async fn test_report_both_tags_newest_first() {
        let store = setup().await;
        let now = Utc::now();
        store
            .insert_post(
                &record("https://a.example/old", now - Duration::hours(2)),
                &tags(&["outage"]),
            )
            .await
            .unwrap();
        store
            .insert_post(
                &record("https://a.example/new", now - Duration::hours(1)),
                &tags(&["traffic"]),
            )
            .await
            .unwrap();

        let posts = store
            .report(&tags(&["outage", "traffic"]), Duration::days(2))
            .await
            .unwrap();
        let uris: Vec<&str> = posts.iter().map(|p| p.uri.as_str()).collect();
        assert_eq!(uris, vec!["https://a.example/new", "https://a.example/old"]);
    }

    #[tokio::test]
    async fn test_report_excludes_old_posts() {
        let store = setup().await;
        store
            .insert_post(
                &record("https://a.example/1", Utc::now() - Duration::days(3)),
                &tags(&["outage"]),
            )
            .await
            .unwrap();

        let posts = store
            .report(&tags(&["outage"]), Duration::days(2))
            .await
            .unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_report_full_sorted_tag_list() {
        let store = setup().await;
        store
            .insert_post(
                &record("https://a.example/1", Utc::now()),
                &tags(&["b", "a"]),
            )
            .await
            .unwrap();

        let posts = store.report(&tags(&["a"]), Duration::days(2)).await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].tag_list, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_report_post_matching_two_tags_once() {
        let store = setup().await;
        store
            .insert_post(
                &record("https://a.example/1", Utc::now()),
                &tags(&["outage", "traffic"]),
            )
            .await
            .unwrap();

        let posts = store
            .report(&tags(&["outage", "traffic"]), Duration::days(2))
            .await
            .unwrap();
        assert_eq!(posts.len(), 1);
    }

    #[tokio::test]
    async fn test_report_ties_newest_row_first() {
        let store = setup().await;
        let at = Utc::now();
        for uri in ["https://a.example/1", "https://a.example/2"] {
            store
                .insert_post(&record(uri, at), &tags(&["outage"]))
                .await
                .unwrap();
        }

        let posts = store
            .report(&tags(&["outage"]), Duration::days(2))
            .await
            .unwrap();
        assert_eq!(posts[0].uri, "https://a.example/2");
        assert_eq!(posts[1].uri, "https://a.example/1");
    }

    #[tokio::test]
    async fn test_report_empty_tags() {
        let store = setup().await;
        store
            .insert_post(&record("https://a.example/1", Utc::now()), &tags(&["outage"]))
            .await
            .unwrap();

        let posts = store.report(&[], Duration::days(2)).await.unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_report_unmatched_tag() {
        let store = setup().await;
        store
            .insert_post(&record("https://a.example/1", Utc::now()), &tags(&["outage"]))
            .await
            .unwrap();

        let posts = store
            .report(&tags(&["weather"]), Duration::days(2))
            .await
            .unwrap();
        assert!(posts.is_empty());
    }

    #[tokio::test]
    async fn test_report_window_out_of_range() {
        let store = setup().await;

        let result = store
            .report(&tags(&["outage"]), Duration::days(1_000_000_000))
            .await;
        assert!(matches!(result, Err(TagwatchError::Validation(_))));
    }

    #[tokio::test]
    async fn test_failed_link_rolls_back_post() {
        let store = setup().await;
        sqlx::query(
            "CREATE TRIGGER reject_links BEFORE INSERT ON post_tags
             BEGIN SELECT RAISE(ABORT, 'link rejected'); END",
        )
        .execute(store.database().pool())
        .await
        .unwrap();

        let result = store
            .insert_post(&record("https://a.example/1", Utc::now()), &tags(&["outage"]))
            .await;

        assert!(matches!(result, Err(TagwatchError::Database(_))));
        assert!(!store.exists("https://a.example/1").await.unwrap());
        assert_eq!(store.counts().await.unwrap(), StoreCounts::default());
    }
}
