//! Process-wide logging setup.

use std::sync::OnceLock;

use tracing_subscriber::{
    EnvFilter,
    fmt::{self, format::FmtSpan},
    prelude::*,
};

use crate::config::LoggingConfig;
use crate::error::{GeoDataError, GeoDataResult};

static INSTALLED: OnceLock<Result<(), String>> = OnceLock::new();

/// Filter directives used when `RUST_LOG` is not set.
///
/// The query engine crate is capped at `engine_level` so page-level chatter
/// stays out of normal output.
#[must_use]
pub fn default_directives(config: &LoggingConfig) -> String {
    format!("{},geo_graphql={}", config.level, config.engine_level)
}

/// Install the global subscriber, writing to stderr.
///
/// Only the first call does anything; later calls return the first outcome.
pub fn init_logging(config: &LoggingConfig) -> GeoDataResult<()> {
    INSTALLED
        .get_or_init(|| install(config))
        .clone()
        .map_err(GeoDataError::Logging)
}

fn install(config: &LoggingConfig) -> Result<(), String> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_directives(config)))
        .map_err(|e| e.to_string())?;

    let subscriber = tracing_subscriber::registry().with(env_filter);

    if config.json {
        let json_layer = fmt::layer()
            .json()
            .with_current_span(true)
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_span_events(FmtSpan::CLOSE);
        subscriber.with(json_layer).try_init().map_err(|e| e.to_string())
    } else {
        let pretty_layer = fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr);
        subscriber
            .with(pretty_layer)
            .try_init()
            .map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_level_is_capped_separately() {
        let config = LoggingConfig {
            level: "debug".into(),
            ..LoggingConfig::default()
        };
        assert_eq!(default_directives(&config), "debug,geo_graphql=warn");
    }

    #[test]
    fn second_call_is_a_no_op() {
        let config = LoggingConfig::default();
        let first = init_logging(&config).is_ok();
        let second = init_logging(&LoggingConfig {
            json: true,
            ..config
        })
        .is_ok();
        assert_eq!(first, second);
    }
}
