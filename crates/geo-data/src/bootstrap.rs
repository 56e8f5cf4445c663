//! Connection bootstrap: load and validate the remote schema.

use geo_graphql::{QueryEngine, SubgraphSchema};
use tracing::{debug, info};
use url::Url;

use crate::error::{GeoDataError, GeoDataResult};
use crate::triple::{REQUIRED_FIELDS, TRIPLE_ENTITY};

/// Schema load attempts when the caller does not choose.
pub const DEFAULT_CONNECT_ATTEMPTS: u32 = 3;

/// A reachable subgraph whose schema has been loaded and checked.
#[derive(Debug)]
pub struct DataSourceHandle<E> {
    url: String,
    engine: E,
    schema: SubgraphSchema,
}

impl<E: QueryEngine> DataSourceHandle<E> {
    /// Subgraph URL.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query engine bound to the subgraph.
    #[must_use]
    pub const fn engine(&self) -> &E {
        &self.engine
    }

    /// Schema loaded during bootstrap.
    #[must_use]
    pub const fn schema(&self) -> &SubgraphSchema {
        &self.schema
    }
}

/// Parse an absolute subgraph URL.
pub fn parse_url(url: &str) -> GeoDataResult<Url> {
    let parsed = Url::parse(url).map_err(|err| GeoDataError::InvalidUrl {
        url: url.to_string(),
        reason: err.to_string(),
    })?;
    if parsed.cannot_be_a_base() {
        return Err(GeoDataError::InvalidUrl {
            url: url.to_string(),
            reason: "not a hierarchical URL".to_string(),
        });
    }
    Ok(parsed)
}

/// Load the schema behind `engine`, retrying immediately on failure.
///
/// Makes at most `max_attempts` tries and stops at the first success. The
/// loaded schema must expose the `Triple` entity; a schema without it is
/// rejected without further attempts.
pub async fn initialize<E: QueryEngine>(
    engine: E,
    max_attempts: u32,
) -> GeoDataResult<DataSourceHandle<E>> {
    let url = engine.endpoint().to_string();
    parse_url(&url)?;
    if max_attempts == 0 {
        return Err(GeoDataError::Config(
            "max_attempts must be at least 1".into(),
        ));
    }

    let mut last_error = None;
    for attempt in 1..=max_attempts {
        match engine.load_schema().await {
            Ok(schema) => {
                validate_schema(&url, &schema)?;
                info!(url = %url, attempt, "subgraph loaded");
                return Ok(DataSourceHandle {
                    url,
                    engine,
                    schema,
                });
            }
            Err(err) => {
                debug!(url = %url, attempt, max_attempts, error = %err, "Exception loading subgraph");
                last_error = Some(err);
            }
        }
    }

    Err(GeoDataError::Connection {
        url,
        attempts: max_attempts,
        last_error,
    })
}

fn validate_schema(url: &str, schema: &SubgraphSchema) -> GeoDataResult<()> {
    if schema.has_entity_fields(TRIPLE_ENTITY, &REQUIRED_FIELDS) {
        Ok(())
    } else {
        Err(GeoDataError::MissingEntity {
            url: url.to_string(),
            entity: TRIPLE_ENTITY.to_string(),
            fields: REQUIRED_FIELDS.iter().map(|field| (*field).to_string()).collect(),
        })
    }
}
