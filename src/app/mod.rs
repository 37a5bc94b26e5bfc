//! Wiring for the `collect` command.
//!
//! Builds the database, store, sources and collector from a [`Config`] and
//! runs either a single pass or the long-running service.

use std::io::Write;
use std::sync::Arc;

use tracing::{info, warn};

use crate::collector::{Collector, StopOutcome};
use crate::config::Config;
use crate::db::Database;
use crate::feed::build_sources;
use crate::store::{Report, Store};
use crate::web::{AppState, StatsServer};
use crate::{Result, TagwatchError};

/// Components shared by both run modes.
pub struct App {
    config: Config,
    store: Store,
    collector: Arc<Collector>,
}

impl App {
    /// Open the database and build the collector.
    pub async fn new(config: Config) -> Result<Self> {
        let db = Database::open(&config.database.path).await?;
        let store = Store::new(db);
        let sources = build_sources(&config.sources, &config.fetch)?;
        let collector = Collector::new(store.clone(), sources, &config.collector);

        Ok(Self {
            config,
            store,
            collector: Arc::new(collector),
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn collector(&self) -> &Arc<Collector> {
        &self.collector
    }

    fn tags(&self) -> Result<Vec<String>> {
        let tags = self.config.collector.tags.clone();
        if tags.is_empty() {
            return Err(TagwatchError::Validation(
                "no tags to collect; pass -t TAG or set collector.tags".to_string(),
            ));
        }
        Ok(tags)
    }

    /// Collect once and return the report for the configured tags.
    pub async fn collect_and_report(&self) -> Result<Report> {
        let tags = self.tags()?;
        let summary = self.collector.collect_once(&tags).await?;
        info!(
            "Collection pass done: {} new, {} known, {} failed fetch(es)",
            summary.inserted, summary.skipped, summary.failed_fetches
        );

        let posts = self.store.report(&tags, self.config.report.window()).await?;
        Ok(Report::new(posts))
    }

    /// Collect once and print the report as JSON to stdout.
    ///
    /// An empty report prints `no results` to stderr instead.
    pub async fn run_once(&self) -> Result<()> {
        let report = self.collect_and_report().await?;
        if report.is_empty() {
            eprintln!("no results");
            return Ok(());
        }

        let json = report.to_json_pretty()?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        Ok(())
    }

    /// Run the collector loop and the stats server until a shutdown signal
    /// arrives or the collector stops on its own.
    pub async fn run_service(&self) -> Result<()> {
        let tags = self.tags()?;

        let state = AppState::new(
            self.store.clone(),
            self.collector.subscribe(),
            self.config.report.window(),
        );
        let server = StatsServer::new(&self.config.web, state)?;
        server.start().await?;
        self.collector.start(tags).await?;

        tokio::select! {
            _ = shutdown_signal() => info!("Shutdown signal received"),
            _ = self.collector.wait_stopped() => warn!("Collector stopped unexpectedly"),
        }

        if self.collector.stop().await == StopOutcome::TimedOut {
            warn!("Collector still draining at exit");
        }
        if server.shutdown().await == StopOutcome::TimedOut {
            warn!("Stats server closed with requests in flight");
        }
        Ok(())
    }
}

/// Resolve on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceConfig;
    use std::io::Write as _;
    use tempfile::NamedTempFile;

    fn statuses_file() -> NamedTempFile {
        let created_at = chrono::Utc::now().to_rfc3339();
        let json = format!(
            r#"[
                {{
                    "id": "1",
                    "uri": "https://a.example/users/x/statuses/1",
                    "content": "<p>Power is out</p>",
                    "created_at": "{created_at}",
                    "account": {{ "id": "10" }},
                    "tags": [{{ "name": "outage" }}, {{ "name": "city" }}]
                }},
                {{
                    "id": "2",
                    "uri": "https://a.example/users/y/statuses/2",
                    "content": "<p>Sunny</p>",
                    "created_at": "{created_at}",
                    "account": {{ "id": "11" }},
                    "tags": [{{ "name": "weather" }}]
                }}
            ]"#
        );
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    fn config_for(file: &NamedTempFile, tags: &[&str]) -> Config {
        let mut config = Config::default();
        config.database.path = String::new();
        config.collector.tags = tags.iter().map(|s| s.to_string()).collect();
        config.sources = vec![SourceConfig::file(file.path().to_string_lossy())];
        config
    }

    #[tokio::test]
    async fn test_collect_and_report() {
        let file = statuses_file();
        let app = App::new(config_for(&file, &["outage"])).await.unwrap();

        let report = app.collect_and_report().await.unwrap();
        assert_eq!(report.len(), 1);
        assert_eq!(report.posts[0].tag_list, vec!["city", "outage"]);
        assert_eq!(app.store().counts().await.unwrap().posts, 2);
    }

    #[tokio::test]
    async fn test_no_tags() {
        let file = statuses_file();
        let app = App::new(config_for(&file, &[])).await.unwrap();
        assert!(matches!(
            app.collect_and_report().await,
            Err(TagwatchError::Validation(_))
        ));
    }
}
