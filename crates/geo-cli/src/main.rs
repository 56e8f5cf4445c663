//! Geo subgraph CLI entrypoint.
//!
//! - `geo triples` - query triples as a table or JSON
//! - `geo schema` - list the object types the subgraph exposes

#![forbid(unsafe_code)]

mod schema;
mod triples;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use geo_data::GeoDataConfig;
use geo_data::telemetry::init_logging;
use tracing::debug;

/// Query the Geo knowledge-graph subgraph.
#[derive(Parser)]
#[command(name = "geo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(long, short = 'c', global = true)]
    config: Option<PathBuf>,

    /// Subgraph URL (overrides the configuration file).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Schema load attempts before giving up.
    #[arg(long, global = true)]
    attempts: Option<u32>,

    /// Log level for this tool (`error`, `warn`, `info`, `debug`, `trace`).
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query triples.
    ///
    /// Prints a tab-separated table (header first) or a JSON array of
    /// `{entity, attribute, stringValue}` objects.
    ///
    /// Example: geo triples --first 10 --attribute Description --format json
    Triples(triples::TriplesArgs),

    /// List the object types exposed by the subgraph.
    Schema(schema::SchemaArgs),
}

impl Cli {
    /// Configuration file (or defaults) with command-line overrides applied.
    fn settings(&self) -> Result<GeoDataConfig> {
        let mut config = match &self.config {
            Some(path) => GeoDataConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => GeoDataConfig::default(),
        };
        if let Some(url) = &self.url {
            config.url.clone_from(url);
        }
        if let Some(attempts) = self.attempts {
            config.max_attempts = attempts;
        }
        if let Some(level) = &self.log_level {
            config.logging.level.clone_from(level);
        }
        if self.json_logs {
            config.logging.json = true;
        }
        config.validate()?;
        Ok(config)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.settings()?;

    // Logs go to stderr so stdout is clean for table and JSON output.
    init_logging(&config.logging)?;
    debug!(url = %config.url, attempts = config.max_attempts, "resolved configuration");

    match cli.command {
        Commands::Triples(args) => triples::run(&config, &args).await,
        Commands::Schema(args) => schema::run(&config, &args).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn overrides_win_over_defaults() {
        let cli = Cli::parse_from([
            "geo",
            "--url",
            "http://localhost:8000/subgraphs/name/geo",
            "--attempts",
            "5",
            "--log-level",
            "debug",
            "schema",
        ]);
        let config = cli.settings().expect("settings");
        assert_eq!(config.url, "http://localhost:8000/subgraphs/name/geo");
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);
    }

    #[test]
    fn first_must_be_positive() {
        assert!(Cli::try_parse_from(["geo", "triples", "--first", "0"]).is_err());
        let cli = Cli::try_parse_from(["geo", "triples", "--first", "1"]).expect("parse");
        match cli.command {
            Commands::Triples(args) => assert_eq!(args.first, 1),
            Commands::Schema(_) => panic!("expected triples"),
        }
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let cli = Cli::parse_from(["geo", "--attempts", "0", "schema"]);
        assert!(cli.settings().is_err());
    }
}
