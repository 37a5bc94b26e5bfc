//! API handlers for the stats service.

pub mod stats;

pub use stats::*;

use tokio::sync::watch;

use crate::collector::CollectorState;
use crate::store::Store;

/// State shared by all handlers.
///
/// Handlers only read: the store for counts and reports, the collector
/// state through a watch receiver.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub collector: watch::Receiver<CollectorState>,
    pub default_window: chrono::Duration,
}

impl AppState {
    pub fn new(
        store: Store,
        collector: watch::Receiver<CollectorState>,
        default_window: chrono::Duration,
    ) -> Self {
        Self {
            store,
            collector,
            default_window,
        }
    }

    /// State for a server running without a collector.
    pub fn without_collector(store: Store, default_window: chrono::Duration) -> Self {
        let (_, collector) = watch::channel(CollectorState::Stopped);
        Self::new(store, collector, default_window)
    }

    pub fn collector_state(&self) -> CollectorState {
        *self.collector.borrow()
    }
}
