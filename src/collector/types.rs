//! Collector state and outcome types.

use serde::Serialize;

/// Lifecycle state of a collector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CollectorState {
    /// No background activity.
    #[default]
    Stopped,
    /// The poll loop is running.
    Running,
    /// A stop was requested and the loop has not exited yet.
    Draining,
}

impl CollectorState {
    /// Lowercase name, as served by the status endpoint.
    pub fn as_str(&self) -> &'static str {
        match self {
            CollectorState::Stopped => "stopped",
            CollectorState::Running => "running",
            CollectorState::Draining => "draining",
        }
    }
}

impl std::fmt::Display for CollectorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a stop or shutdown request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    /// The background task exited within the grace period.
    Stopped,
    /// The grace period elapsed first; the task is still winding down.
    TimedOut,
    /// There was nothing to stop.
    NotRunning,
}

/// Counters for one collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Records stored as new posts.
    pub inserted: usize,
    /// Records whose uri was already stored.
    pub skipped: usize,
    /// (source, tag) fetches that failed.
    pub failed_fetches: usize,
    /// The cycle ended early on a stop request.
    pub interrupted: bool,
}

impl CycleSummary {
    /// Records seen in total.
    pub fn records(&self) -> usize {
        self.inserted + self.skipped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_names() {
        assert_eq!(CollectorState::Stopped.to_string(), "stopped");
        assert_eq!(CollectorState::Running.as_str(), "running");
        assert_eq!(
            serde_json::to_string(&CollectorState::Draining).unwrap(),
            "\"draining\""
        );
    }

    #[test]
    fn test_default_state_is_stopped() {
        assert_eq!(CollectorState::default(), CollectorState::Stopped);
    }

    #[test]
    fn test_summary_records() {
        let summary = CycleSummary {
            inserted: 2,
            skipped: 3,
            ..CycleSummary::default()
        };
        assert_eq!(summary.records(), 5);
        assert!(!summary.interrupted);
    }
}
