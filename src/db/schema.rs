//! Database schema and migrations for tagwatch.
//!
//! Migrations are applied in order when the database is opened; the
//! `schema_version` table records which ones have run.

/// Database migrations.
pub const MIGRATIONS: &[&str] = &[
    // v1: tags, posts and the link table between them
    r#"
CREATE TABLE tags (
    id      INTEGER PRIMARY KEY AUTOINCREMENT,
    name    TEXT NOT NULL
);

CREATE UNIQUE INDEX idx_tags_name ON tags(name);

CREATE TABLE posts (
    id              INTEGER PRIMARY KEY AUTOINCREMENT,
    post_id         TEXT NOT NULL,              -- id on the origin server
    account_id      TEXT NOT NULL,
    server          TEXT NOT NULL,
    uri             TEXT NOT NULL,              -- dedup key
    lang            TEXT NOT NULL DEFAULT 'en',
    content_html    TEXT,
    content_text    TEXT,
    created_at      TEXT NOT NULL               -- UTC, YYYY-MM-DD HH:MM:SS.mmm
);

CREATE UNIQUE INDEX idx_posts_uri ON posts(uri);
CREATE INDEX idx_posts_created_at ON posts(created_at);

CREATE TABLE post_tags (
    post_id     INTEGER NOT NULL REFERENCES posts(id) ON DELETE CASCADE,
    tag_id      INTEGER NOT NULL REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (post_id, tag_id)
);

CREATE INDEX idx_post_tags_tag_id ON post_tags(tag_id);
"#,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_not_empty() {
        assert!(!MIGRATIONS.is_empty());
    }

    #[test]
    fn test_first_migration_contains_tables() {
        let first = MIGRATIONS[0];
        assert!(first.contains("CREATE TABLE tags"));
        assert!(first.contains("CREATE TABLE posts"));
        assert!(first.contains("CREATE TABLE post_tags"));
        assert!(first.contains("PRIMARY KEY (post_id, tag_id)"));
    }

    #[test]
    fn test_dedup_indexes_are_unique() {
        let first = MIGRATIONS[0];
        assert!(first.contains("CREATE UNIQUE INDEX idx_tags_name ON tags(name)"));
        assert!(first.contains("CREATE UNIQUE INDEX idx_posts_uri ON posts(uri)"));
    }
}
