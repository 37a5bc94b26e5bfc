//! Response DTOs for the stats service.

use serde::Serialize;

use crate::collector::CollectorState;

/// Body of `GET /`.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    /// Always `"ok"` when the service answers.
    pub stats: &'static str,
    pub collector: CollectorState,
    pub posts: i64,
    pub tags: i64,
}

impl StatusResponse {
    pub fn new(collector: CollectorState, posts: i64, tags: i64) -> Self {
        Self {
            stats: "ok",
            collector,
            posts,
            tags,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_json() {
        let body = serde_json::to_value(StatusResponse::new(CollectorState::Running, 3, 2)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({"stats": "ok", "collector": "running", "posts": 3, "tags": 2})
        );
    }
}
