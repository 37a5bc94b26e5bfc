//! Table-level queries for tags, posts and links.
//!
//! Functions taking a `SqliteConnection` run inside the caller's
//! transaction; the repositories wrap the pool for standalone reads.

use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use super::types::{AggregatedPost, AggregatedPostRow, TAG_SEPARATOR};
use crate::datetime::to_db_datetime;
use crate::db::DbPool;
use crate::feed::{strip_html, FeedRecord};
use crate::Result;

/// Insert a tag if missing and return its id.
pub(crate) async fn upsert_tag_in(conn: &mut SqliteConnection, name: &str) -> Result<i64> {
    sqlx::query("INSERT INTO tags (name) VALUES (?) ON CONFLICT(name) DO NOTHING")
        .bind(name)
        .execute(&mut *conn)
        .await?;

    let id: i64 = sqlx::query_scalar("SELECT id FROM tags WHERE name = ?")
        .bind(name)
        .fetch_one(&mut *conn)
        .await?;
    Ok(id)
}

/// Insert a post row unless its uri is taken.
///
/// Returns the new row id, or `None` when a post with the uri exists.
pub(crate) async fn insert_post_row_in(
    conn: &mut SqliteConnection,
    record: &FeedRecord,
) -> Result<Option<i64>> {
    let id: Option<i64> = sqlx::query_scalar(
        "INSERT INTO posts (post_id, account_id, server, uri, lang, content_html, content_text, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)
         ON CONFLICT(uri) DO NOTHING
         RETURNING id",
    )
    .bind(&record.external_id)
    .bind(&record.account_id)
    .bind(&record.origin_server)
    .bind(&record.uri)
    .bind(record.language_or_default())
    .bind(&record.content_html)
    .bind(strip_html(&record.content_html))
    .bind(to_db_datetime(&record.created_at))
    .fetch_optional(&mut *conn)
    .await?;
    Ok(id)
}

/// Link a post to a tag. Repeated links are ignored.
pub(crate) async fn link_in(conn: &mut SqliteConnection, post_id: i64, tag_id: i64) -> Result<()> {
    sqlx::query("INSERT OR IGNORE INTO post_tags (post_id, tag_id) VALUES (?, ?)")
        .bind(post_id)
        .bind(tag_id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Repository for tag reads.
pub struct TagRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> TagRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Count tags.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tags")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// Repository for post reads.
pub struct PostRepository<'a> {
    pool: &'a DbPool,
}

impl<'a> PostRepository<'a> {
    pub fn new(pool: &'a DbPool) -> Self {
        Self { pool }
    }

    /// Check whether a post with this uri is stored.
    pub async fn exists(&self, uri: &str) -> Result<bool> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM posts WHERE uri = ?)")
            .bind(uri)
            .fetch_one(self.pool)
            .await?;
        Ok(exists)
    }

    /// Count posts.
    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM posts")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Count post-tag links.
    pub async fn count_links(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM post_tags")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Posts carrying any of `tag_names` created after `cutoff`, newest first.
    ///
    /// `cutoff` is a timestamp in storage format. Each post appears once
    /// with every tag it carries.
    pub async fn list_tagged_since(
        &self,
        tag_names: &[String],
        cutoff: &str,
    ) -> Result<Vec<AggregatedPost>> {
        if tag_names.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(
            "SELECT p.id, p.uri, p.lang, p.content_html AS content, p.created_at,
                    (SELECT group_concat(t.name, ",
        );
        query.push_bind(TAG_SEPARATOR.to_string());
        query.push(
            ")
                     FROM post_tags pt JOIN tags t ON t.id = pt.tag_id
                     WHERE pt.post_id = p.id) AS tag_list
             FROM posts p
             WHERE p.created_at > ",
        );
        query.push_bind(cutoff.to_string());
        query.push(
            " AND p.id IN (SELECT pt.post_id FROM post_tags pt
                           JOIN tags t ON t.id = pt.tag_id
                           WHERE t.name IN (",
        );
        let mut separated = query.separated(", ");
        for name in tag_names {
            separated.push_bind(name.clone());
        }
        separated.push_unseparated("))");
        query.push(" ORDER BY p.created_at DESC, p.id DESC");

        let rows: Vec<AggregatedPostRow> = query.build_query_as().fetch_all(self.pool).await?;
        rows.into_iter().map(AggregatedPost::try_from).collect()
    }
}
