//! Geo data error types.

use std::path::PathBuf;

use arrow::error::ArrowError;
use geo_graphql::{GraphqlClientError, PaginationError};
use thiserror::Error;

/// Result type for Geo data operations.
pub type GeoDataResult<T> = Result<T, GeoDataError>;

/// Errors raised while connecting to or querying the Geo subgraph.
#[derive(Debug, Error)]
pub enum GeoDataError {
    /// Every bootstrap attempt failed.
    #[error("subgraph_url: {url} failed to load properly after {attempts} attempts")]
    Connection {
        /// Subgraph URL
        url: String,
        /// Attempts made
        attempts: u32,
        /// Failure of the final attempt
        #[source]
        last_error: Option<GraphqlClientError>,
    },

    /// The subgraph answered but does not expose the expected entity.
    #[error("subgraph at {url} does not expose entity `{entity}` with fields {fields:?}")]
    MissingEntity {
        /// Subgraph URL
        url: String,
        /// Entity type name
        entity: String,
        /// Required fields
        fields: Vec<String>,
    },

    /// The subgraph URL does not parse.
    #[error("invalid subgraph url `{url}`: {reason}")]
    InvalidUrl {
        /// Offending value
        url: String,
        /// Parser message
        reason: String,
    },

    /// Invalid configuration value.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Config file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML.
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Client construction failed.
    #[error(transparent)]
    Client(#[from] GraphqlClientError),

    /// Query execution failed in the engine.
    #[error(transparent)]
    Query(#[from] PaginationError),

    /// Unrecognized output format.
    #[error("invalid output format `{0}`, accepted values are: table, json")]
    InvalidFormat(String),

    /// Table construction failed.
    #[error("table construction failed: {0}")]
    Table(#[from] ArrowError),

    /// JSON serialization failed.
    #[error("JSON serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Logging could not be installed.
    #[error("logging initialization failed: {0}")]
    Logging(String),
}

impl GeoDataError {
    /// Returns `true` for failures that happened before any data was fetched
    /// and that retrying cannot fix.
    #[must_use]
    pub const fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::InvalidUrl { .. } | Self::Config(_) | Self::Io { .. } | Self::Toml(_)
        )
    }
}
