//! Error types for tagwatch.

use thiserror::Error;

/// Common error type for tagwatch.
#[derive(Error, Debug)]
pub enum TagwatchError {
    /// Database error.
    ///
    /// Raised for failed reads and writes against the store. Errors from
    /// sqlx are converted automatically.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A feed source failed to return data for a tag.
    #[error("source {source_name} failed for tag '{tag}': {message}")]
    SourceFetch {
        /// Name of the failing source.
        source_name: String,
        /// Tag that was being fetched.
        tag: String,
        /// Underlying failure.
        message: String,
    },

    /// Every configured source failed during one cycle.
    #[error("all {0} source(s) failed during collection")]
    AllSourcesFailed(usize),

    /// Feed construction or parse error.
    #[error("feed error: {0}")]
    Feed(String),

    /// Lifecycle operation called in the wrong state.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Validation error for user input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for TagwatchError {
    fn from(e: sqlx::Error) -> Self {
        TagwatchError::Database(e.to_string())
    }
}

/// Result type alias for tagwatch operations.
pub type Result<T> = std::result::Result<T, TagwatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_fetch_display() {
        let err = TagwatchError::SourceFetch {
            source_name: "https://mastodon.social".to_string(),
            tag: "outage".to_string(),
            message: "HTTP error: 503".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "source https://mastodon.social failed for tag 'outage': HTTP error: 503"
        );
    }

    #[test]
    fn test_all_sources_failed_display() {
        let err = TagwatchError::AllSourcesFailed(2);
        assert_eq!(err.to_string(), "all 2 source(s) failed during collection");
    }

    #[test]
    fn test_invalid_state_display() {
        let err = TagwatchError::InvalidState("collector is already running".to_string());
        assert_eq!(
            err.to_string(),
            "invalid state: collector is already running"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: TagwatchError = io_err.into();
        assert!(matches!(err, TagwatchError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: TagwatchError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, TagwatchError::Database(_)));
    }
}
