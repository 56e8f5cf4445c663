//! Geo Data - triple access for the Geo knowledge-graph subgraph.
//!
//! [`GeoData`] bootstraps a handle to a subgraph (loading and checking its
//! schema, with a bounded number of immediate retries) and then serves
//! triple queries, normalized either into an Arrow-backed [`Table`] with columns
//! `entity_name`, `attribute_name`, `string_value` or into a JSON array of
//! `{entity, attribute, stringValue}` objects.
//!
//! ```no_run
//! use geo_data::{GeoData, TripleQueryOptions};
//!
//! # async fn run() -> geo_data::GeoDataResult<()> {
//! let geo = GeoData::connect("https://api.thegraph.com/subgraphs/name/baiirun/geo").await?;
//! let output = geo
//!     .query_triples(&TripleQueryOptions::new().first(10).attribute_name("Description"))
//!     .await?;
//! if let Some(output) = output {
//!     print!("{output}");
//! }
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod bootstrap;
mod config;
mod error;
mod geo;
mod output;
mod table;
pub mod telemetry;
mod triple;

pub use bootstrap::{DEFAULT_CONNECT_ATTEMPTS, DataSourceHandle, initialize};
pub use config::{DEFAULT_SUBGRAPH_URL, GeoDataConfig, LoggingConfig};
pub use error::{GeoDataError, GeoDataResult};
pub use geo::{GeoData, TripleQueryOptions};
pub use output::{OutputFormat, QueryOutput};
pub use table::Table;
pub use triple::{
    DEFAULT_FIRST, FieldProjection, JsonTriple, ResultRecord, TRIPLE_ENTITY, TRIPLES_FIELD,
    TripleEntity, TripleQuerySpec,
};

pub use geo_graphql::{Pagination, PaginationStrategy, QueryEngine};
