//! Local JSON source.
//!
//! Reads a file holding an array of statuses in the timeline wire format.
//! Useful for offline runs and replaying captured timelines.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use super::types::{FeedRecord, FeedSource, Status};
use crate::error::{Result, TagwatchError};

/// Origin recorded for records read from a file.
const FILE_ORIGIN: &str = "file";

/// Serves the records of a JSON file.
///
/// The file is re-read on every fetch and every record is returned for
/// every tag; tag filtering happens at query time.
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = format!("file:{}", path.display());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl FeedSource for FileSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, tag: &str) -> Result<Vec<FeedRecord>> {
        debug!("Reading {} for tag '{}'", self.path.display(), tag);

        let fetch_error = |message: String| TagwatchError::SourceFetch {
            source_name: self.name.clone(),
            tag: tag.to_string(),
            message,
        };

        let bytes = tokio::fs::read(&self.path)
            .await
            .map_err(|e| fetch_error(format!("failed to read file: {}", e)))?;
        let statuses: Vec<Status> = serde_json::from_slice(&bytes)
            .map_err(|e| fetch_error(format!("invalid status JSON: {}", e)))?;

        Ok(statuses
            .into_iter()
            .map(|status| status.into_record(FILE_ORIGIN))
            .collect())
    }
}
