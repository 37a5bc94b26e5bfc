//! Tag collector for tagwatch.
//!
//! The collector polls every configured source for every tag and hands the
//! records to the [`Store`]. It runs either once ([`Collector::collect_once`])
//! or as a background loop controlled by [`Collector::start`] and
//! [`Collector::stop`].

mod types;

pub use types::{CollectorState, CycleSummary, StopOutcome};

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::{CollectorConfig, SourceErrorPolicy};
use crate::feed::FeedSource;
use crate::store::{InsertOutcome, Store};
use crate::{Result, TagwatchError};

/// Background run of the poll loop.
struct RunHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// State shared with the poll loop task.
struct Inner {
    store: Store,
    sources: Vec<Arc<dyn FeedSource>>,
    policy: SourceErrorPolicy,
    state: watch::Sender<CollectorState>,
}

/// Polls feed sources and stores what they return.
pub struct Collector {
    inner: Arc<Inner>,
    poll_interval: Duration,
    stop_grace: Duration,
    run: Mutex<Option<RunHandle>>,
}

impl Collector {
    /// Create a collector over `sources`, visited in the given order.
    pub fn new(store: Store, sources: Vec<Arc<dyn FeedSource>>, config: &CollectorConfig) -> Self {
        let (state, _) = watch::channel(CollectorState::Stopped);
        Self {
            inner: Arc::new(Inner {
                store,
                sources,
                policy: config.on_source_error,
                state,
            }),
            poll_interval: config.poll_interval(),
            stop_grace: config.stop_grace(),
            run: Mutex::new(None),
        }
    }

    /// Override the poll interval.
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Override how long [`Collector::stop`] waits.
    pub fn with_stop_grace(mut self, stop_grace: Duration) -> Self {
        self.stop_grace = stop_grace;
        self
    }

    /// The store records are written to.
    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    /// Current lifecycle state.
    pub fn state(&self) -> CollectorState {
        *self.inner.state.borrow()
    }

    /// Watch lifecycle transitions.
    pub fn subscribe(&self) -> watch::Receiver<CollectorState> {
        self.inner.state.subscribe()
    }

    /// Wait until the collector is stopped.
    ///
    /// Returns immediately if it already is.
    pub async fn wait_stopped(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|state| *state == CollectorState::Stopped).await;
    }

    /// Start polling `tags` in the background.
    ///
    /// The first cycle runs immediately and later cycles every poll
    /// interval. Fails with [`TagwatchError::InvalidState`] unless the
    /// collector is stopped.
    pub async fn start(&self, tags: Vec<String>) -> Result<()> {
        let mut run = self.run.lock().await;

        let state = self.state();
        if state != CollectorState::Stopped {
            return Err(TagwatchError::InvalidState(format!(
                "cannot start collector while {}",
                state
            )));
        }

        let cancel = CancellationToken::new();
        self.inner.state.send_replace(CollectorState::Running);
        info!(
            "Collector started for {} tag(s) across {} source(s), polling every {}s",
            tags.len(),
            self.inner.sources.len(),
            self.poll_interval.as_secs()
        );

        let inner = Arc::clone(&self.inner);
        let token = cancel.clone();
        let period = self.poll_interval;
        let task = tokio::spawn(async move { inner.run_loop(tags, period, token).await });

        *run = Some(RunHandle { cancel, task });
        Ok(())
    }

    /// Ask the poll loop to exit and wait up to the stop grace period.
    ///
    /// A fetch already in flight is not interrupted. If it outlasts the
    /// grace period the result is [`StopOutcome::TimedOut`], the collector
    /// stays draining, and a later call waits again.
    pub async fn stop(&self) -> StopOutcome {
        let mut run = self.run.lock().await;

        let Some(handle) = run.as_mut() else {
            return StopOutcome::NotRunning;
        };
        if self.state() == CollectorState::Stopped {
            // the loop already ended on its own
            run.take();
            return StopOutcome::NotRunning;
        }

        handle.cancel.cancel();
        self.inner.state.send_if_modified(|state| {
            if *state == CollectorState::Running {
                *state = CollectorState::Draining;
                true
            } else {
                false
            }
        });
        info!("Stopping collector");

        let waited = tokio::time::timeout(self.stop_grace, &mut handle.task).await;
        match waited {
            Ok(joined) => {
                if let Err(e) = joined {
                    error!("Collector task ended abnormally: {}", e);
                }
                run.take();
                self.inner.state.send_replace(CollectorState::Stopped);
                StopOutcome::Stopped
            }
            Err(_) => {
                warn!(
                    "Collector did not stop within {}ms; still draining",
                    self.stop_grace.as_millis()
                );
                StopOutcome::TimedOut
            }
        }
    }

    /// Run one cycle over every source and tag.
    ///
    /// Usable whether or not the background loop is running.
    pub async fn collect_once(&self, tags: &[String]) -> Result<CycleSummary> {
        self.inner.run_cycle(tags, &CancellationToken::new()).await
    }
}

impl Inner {
    async fn run_loop(
        self: Arc<Self>,
        tags: Vec<String>,
        period: Duration,
        cancel: CancellationToken,
    ) {
        let _stopped = MarkStopped(&self.state);

        let Some(first_tick) = Instant::now().checked_add(period) else {
            error!(
                "Poll interval of {}s is out of range, stopping collector",
                period.as_secs()
            );
            return;
        };
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            match self.run_cycle(&tags, &cancel).await {
                Ok(summary) if summary.interrupted => break,
                Ok(summary) => {
                    if summary.inserted > 0 {
                        info!(
                            "Collected {} new post(s) ({} known, {} failed fetch(es))",
                            summary.inserted, summary.skipped, summary.failed_fetches
                        );
                    } else {
                        debug!(
                            "No new posts ({} known, {} failed fetch(es))",
                            summary.skipped, summary.failed_fetches
                        );
                    }
                }
                Err(e) => {
                    error!("Collection cycle failed, stopping collector: {}", e);
                    break;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
        }
    }

    async fn run_cycle(&self, tags: &[String], cancel: &CancellationToken) -> Result<CycleSummary> {
        let mut summary = CycleSummary::default();
        let mut failed_sources = 0;

        for source in &self.sources {
            let mut succeeded = 0;
            let mut failed = 0;

            for tag in tags {
                if cancel.is_cancelled() {
                    summary.interrupted = true;
                    return Ok(summary);
                }

                let records = match source.fetch(tag).await {
                    Ok(records) => records,
                    Err(e) => {
                        summary.failed_fetches += 1;
                        failed += 1;
                        warn!("Fetch from {} for '{}' failed: {}", source.name(), tag, e);
                        if self.policy == SourceErrorPolicy::Abort {
                            return Err(as_fetch_error(e, source.name(), tag));
                        }
                        continue;
                    }
                };
                succeeded += 1;

                debug!(
                    "{} returned {} record(s) for '{}'",
                    source.name(),
                    records.len(),
                    tag
                );
                for record in &records {
                    match self.store.insert_post(record, &record.tag_names).await? {
                        InsertOutcome::Inserted(_) => summary.inserted += 1,
                        InsertOutcome::Skipped => summary.skipped += 1,
                    }
                }
            }

            if succeeded == 0 && failed > 0 {
                failed_sources += 1;
            }
        }

        if !self.sources.is_empty() && failed_sources == self.sources.len() {
            return Err(TagwatchError::AllSourcesFailed(failed_sources));
        }
        Ok(summary)
    }
}

/// Publishes [`CollectorState::Stopped`] when the poll loop ends, including
/// by panic.
struct MarkStopped<'a>(&'a watch::Sender<CollectorState>);

impl Drop for MarkStopped<'_> {
    fn drop(&mut self) {
        self.0.send_replace(CollectorState::Stopped);
        info!("Collector stopped");
    }
}

/// Wrap a source error as [`TagwatchError::SourceFetch`] unless it is one.
fn as_fetch_error(e: TagwatchError, source_name: &str, tag: &str) -> TagwatchError {
    match e {
        TagwatchError::SourceFetch { .. } => e,
        other => TagwatchError::SourceFetch {
            source_name: source_name.to_string(),
            tag: tag.to_string(),
            message: other.to_string(),
        },
    }
}
