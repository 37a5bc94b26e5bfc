//! Command line interface for tagwatch.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::config::{Config, SourceConfig};
use crate::Result;

/// Config file read when `--config` is not given. A missing default file
/// means built-in defaults.
pub const DEFAULT_CONFIG_PATH: &str = "tagwatch.toml";

/// Server polled when neither the config nor the command line names one.
pub const DEFAULT_SERVER: &str = "mastodon.social";

#[derive(Debug, Parser)]
#[command(name = "tagwatch", version, about = "Collects and aggregates tagged posts over time")]
pub struct Cli {
    /// Path to config TOML file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose (debug) logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Collect posts for the given tags and report on them.
    ///
    /// Without --http, runs one collection pass and prints the report as
    /// JSON. With --http, keeps collecting and serves stats until
    /// interrupted.
    Collect(CollectArgs),
}

#[derive(Debug, Clone, Default, Args)]
pub struct CollectArgs {
    /// Tag to collect (repeatable)
    #[arg(short, long = "tag", value_name = "TAG")]
    pub tags: Vec<String>,

    /// Server to poll anonymously (repeatable); replaces configured sources
    #[arg(short, long = "server", value_name = "SERVER")]
    pub servers: Vec<String>,

    /// Database file
    #[arg(short, long = "database", value_name = "DB")]
    pub database: Option<String>,

    /// Poll interval in minutes
    #[arg(short, long = "interval", value_name = "MINUTES")]
    pub interval: Option<u64>,

    /// Also read statuses from a local JSON file
    #[arg(long, value_name = "PATH")]
    pub file: Option<String>,

    /// Keep collecting and serve stats over HTTP
    #[arg(long)]
    pub http: bool,
}

impl Cli {
    /// Load the config file, apply environment and command line overrides,
    /// and validate the result.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None if std::path::Path::new(DEFAULT_CONFIG_PATH).exists() => {
                Config::load(DEFAULT_CONFIG_PATH)?
            }
            None => Config::default(),
        };
        config.apply_env_overrides();
        self.apply(&mut config);
        config.validate()?;
        Ok(config)
    }

    /// Apply command line overrides to `config`.
    pub fn apply(&self, config: &mut Config) {
        if self.verbose {
            config.logging.level = "debug".to_string();
        }
        match &self.command {
            Command::Collect(args) => args.apply(config),
        }
    }
}

impl CollectArgs {
    /// Apply collect flags to `config`.
    pub fn apply(&self, config: &mut Config) {
        if !self.tags.is_empty() {
            config.collector.tags = self.tags.clone();
        }
        if let Some(db) = &self.database {
            config.database.path = db.clone();
        }
        if let Some(minutes) = self.interval {
            config.collector.poll_interval_secs = minutes.saturating_mul(60);
        }

        if !self.servers.is_empty() {
            config.sources = self
                .servers
                .iter()
                .map(|server| SourceConfig::mastodon(server.as_str()))
                .collect();
        }
        if let Some(path) = &self.file {
            config.sources.push(SourceConfig::file(path.as_str()));
        }
        if config.sources.is_empty() {
            config.sources.push(SourceConfig::mastodon(DEFAULT_SERVER));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SourceKind;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    fn collect_args(cli: &Cli) -> &CollectArgs {
        match &cli.command {
            Command::Collect(args) => args,
        }
    }

    #[test]
    fn test_parse_collect() {
        let cli = parse(&[
            "tagwatch", "collect", "-t", "outage", "-t", "traffic", "-s", "hachyderm.io", "-d",
            "stats.db", "-i", "2", "--http",
        ]);
        let args = collect_args(&cli);
        assert_eq!(args.tags, vec!["outage", "traffic"]);
        assert_eq!(args.servers, vec!["hachyderm.io"]);
        assert_eq!(args.database.as_deref(), Some("stats.db"));
        assert_eq!(args.interval, Some(2));
        assert!(args.http);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["tagwatch", "collect", "-v", "-c", "other.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("other.toml")));
    }

    #[test]
    fn test_apply_overrides() {
        let cli = parse(&[
            "tagwatch", "-v", "collect", "-t", "outage", "-s", "hachyderm.io", "-i", "2", "--file",
            "statuses.json",
        ]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.collector.tags, vec!["outage"]);
        assert_eq!(config.collector.poll_interval_secs, 120);
        assert_eq!(config.sources.len(), 2);
        assert_eq!(config.sources[0].kind, SourceKind::Mastodon);
        assert_eq!(config.sources[0].server, "hachyderm.io");
        assert_eq!(config.sources[1].kind, SourceKind::File);
    }

    #[test]
    fn test_default_server() {
        let cli = parse(&["tagwatch", "collect", "-t", "outage"]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].server, DEFAULT_SERVER);
    }

    #[test]
    fn test_file_only() {
        let cli = parse(&["tagwatch", "collect", "--file", "statuses.json"]);
        let mut config = Config::default();
        cli.apply(&mut config);

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].kind, SourceKind::File);
    }

    #[test]
    fn test_configured_sources_kept() {
        let cli = parse(&["tagwatch", "collect"]);
        let mut config = Config::default();
        config.sources.push(SourceConfig::mastodon("fosstodon.org"));
        cli.apply(&mut config);

        assert_eq!(config.sources.len(), 1);
        assert_eq!(config.sources[0].server, "fosstodon.org");
    }
}
