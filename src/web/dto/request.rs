//! Request DTOs for the stats service.

use serde::Deserialize;

use crate::config::MAX_WINDOW_HOURS;
use crate::{Result, TagwatchError};

/// Query string of `GET /report`.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    /// Comma-separated tag names.
    #[serde(default)]
    pub tags: Option<String>,
    /// Trailing window in hours; the configured window when absent.
    #[serde(default)]
    pub window_hours: Option<u64>,
}

impl ReportQuery {
    /// Tag names in request order, trimmed, without empties.
    pub fn tag_names(&self) -> Result<Vec<String>> {
        let names: Vec<String> = self
            .tags
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();

        if names.is_empty() {
            return Err(TagwatchError::Validation(
                "query parameter 'tags' is required".to_string(),
            ));
        }
        Ok(names)
    }

    /// Requested window, falling back to `default`.
    pub fn window(&self, default: chrono::Duration) -> Result<chrono::Duration> {
        match self.window_hours {
            None => Ok(default),
            Some(0) => Err(TagwatchError::Validation(
                "window_hours must be greater than zero".to_string(),
            )),
            Some(hours) if hours > MAX_WINDOW_HOURS => Err(TagwatchError::Validation(format!(
                "window_hours must be at most {}",
                MAX_WINDOW_HOURS
            ))),
            Some(hours) => Ok(chrono::Duration::hours(hours as i64)),
        }
    }
}
