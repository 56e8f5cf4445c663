//! Geo data configuration.

use std::path::Path;
use std::time::Duration;

use geo_graphql::Pagination;
use serde::{Deserialize, Serialize};

use crate::error::{GeoDataError, GeoDataResult};

/// Public Geo subgraph on the hosted service.
pub const DEFAULT_SUBGRAPH_URL: &str = "https://api.thegraph.com/subgraphs/name/baiirun/geo";

/// Configuration for [`GeoData`](crate::GeoData).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoDataConfig {
    /// Subgraph URL
    #[serde(default = "default_url")]
    pub url: String,

    /// Schema load attempts during bootstrap
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport attempts per GraphQL request (1 disables transport retry)
    #[serde(default = "default_transport_attempts")]
    pub transport_attempts: u32,

    /// Validate triple responses against their JSON Schema
    #[serde(default)]
    pub validate_responses: bool,

    /// Optional bearer token for gateway endpoints
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Default pagination for triple queries
    #[serde(default)]
    pub pagination: Pagination,

    /// Logging setup
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_url() -> String {
    DEFAULT_SUBGRAPH_URL.into()
}

const fn default_max_attempts() -> u32 {
    3
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_transport_attempts() -> u32 {
    1
}

impl Default for GeoDataConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            max_attempts: default_max_attempts(),
            timeout_secs: default_timeout_secs(),
            transport_attempts: default_transport_attempts(),
            validate_responses: false,
            api_key: None,
            pagination: Pagination::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl GeoDataConfig {
    /// Defaults pointed at `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(input: &str) -> GeoDataResult<Self> {
        let config: Self = toml::from_str(input)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> GeoDataResult<Self> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| GeoDataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&input)
    }

    /// Check value ranges and the URL.
    pub fn validate(&self) -> GeoDataResult<()> {
        if self.max_attempts == 0 {
            return Err(GeoDataError::Config(
                "max_attempts must be at least 1".into(),
            ));
        }
        if self.transport_attempts == 0 {
            return Err(GeoDataError::Config(
                "transport_attempts must be at least 1".into(),
            ));
        }
        if self.timeout_secs == 0 {
            return Err(GeoDataError::Config(
                "timeout_secs must be at least 1".into(),
            ));
        }
        if self.pagination.page_size == 0 {
            return Err(GeoDataError::Config(
                "pagination.page_size must be at least 1".into(),
            ));
        }
        crate::bootstrap::parse_url(&self.url)?;
        Ok(())
    }

    /// Request timeout.
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level for everything but the query engine
    #[serde(default = "default_level")]
    pub level: String,

    /// Level for the query engine crate
    #[serde(default = "default_engine_level")]
    pub engine_level: String,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

fn default_level() -> String {
    "info".into()
}

fn default_engine_level() -> String {
    "warn".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            engine_level: default_engine_level(),
            json: false,
        }
    }
}
