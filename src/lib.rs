//! tagwatch - hashtag feed collector
//!
//! Polls Mastodon-compatible servers for posts carrying a set of tags,
//! stores each post once in SQLite, and reports recent posts per tag on the
//! command line or over HTTP.

pub mod app;
pub mod cli;
pub mod collector;
pub mod config;
pub mod datetime;
pub mod db;
pub mod error;
pub mod feed;
pub mod logging;
pub mod store;
pub mod web;

pub use collector::{Collector, CollectorState, CycleSummary, StopOutcome};
pub use config::Config;
pub use db::Database;
pub use error::{Result, TagwatchError};
pub use feed::{ClientHandle, FeedRecord, FeedSource, FileSource, MastodonSource, RssTagSource};
pub use store::{AggregatedPost, InsertOutcome, Report, Store, StoreCounts};
pub use web::StatsServer;
