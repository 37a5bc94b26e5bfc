//! Store value types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::datetime::parse_datetime;
use crate::Result;
use crate::TagwatchError;

/// Result of offering a record to the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// A new post row was written, with its row id.
    Inserted(i64),
    /// A post with the same uri already exists.
    Skipped,
}

impl InsertOutcome {
    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Row counts of the three tables.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub posts: i64,
    pub tags: i64,
    pub links: i64,
}

/// A post together with every tag attached to it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedPost {
    /// Row id, used only as an ordering tie-break.
    #[serde(skip)]
    pub id: i64,
    pub uri: String,
    pub lang: String,
    /// Post body as HTML.
    pub content: String,
    /// Tag names, sorted.
    pub tag_list: Vec<String>,
    pub created_at: DateTime<Utc>,
}

/// Separator used when concatenating tag names in SQL.
pub(crate) const TAG_SEPARATOR: char = '\u{1f}';

#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct AggregatedPostRow {
    pub id: i64,
    pub uri: String,
    pub lang: String,
    pub content: Option<String>,
    pub tag_list: Option<String>,
    pub created_at: String,
}

impl TryFrom<AggregatedPostRow> for AggregatedPost {
    type Error = TagwatchError;

    fn try_from(row: AggregatedPostRow) -> Result<Self> {
        let created_at = parse_datetime(&row.created_at).ok_or_else(|| {
            TagwatchError::Database(format!(
                "invalid created_at '{}' for post {}",
                row.created_at, row.id
            ))
        })?;

        let mut tag_list: Vec<String> = row
            .tag_list
            .as_deref()
            .unwrap_or_default()
            .split(TAG_SEPARATOR)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        tag_list.sort();
        tag_list.dedup();

        Ok(AggregatedPost {
            id: row.id,
            uri: row.uri,
            lang: row.lang,
            content: row.content.unwrap_or_default(),
            tag_list,
            created_at,
        })
    }
}

/// The output of a report query.
///
/// Serializes as a bare JSON array of posts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Report {
    pub posts: Vec<AggregatedPost>,
}

impl Report {
    pub fn new(posts: Vec<AggregatedPost>) -> Self {
        Self { posts }
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    /// Pretty JSON with two-space indentation.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| TagwatchError::Validation(format!("failed to encode report: {}", e)))
    }
}

impl From<Vec<AggregatedPost>> for Report {
    fn from(posts: Vec<AggregatedPost>) -> Self {
        Self::new(posts)
    }
}
