//! The `GeoData` facade over one Geo subgraph.

use std::collections::BTreeMap;

use geo_graphql::{
    GraphqlClient, GraphqlClientBuilder, Pagination, QueryEngine, RetryPolicy,
    SchemaValidationMode, SubgraphSchema,
};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::bootstrap::{self, DataSourceHandle};
use crate::config::GeoDataConfig;
use crate::error::{GeoDataError, GeoDataResult};
use crate::output::{OutputFormat, QueryOutput};
use crate::triple::{DEFAULT_FIRST, TripleEntity};

/// Arguments of [`GeoData::query_triples`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TripleQueryOptions {
    /// Maximum number of triples.
    pub first: u64,
    /// Exact-match filter on the attribute name.
    pub attribute_name: Option<String>,
    /// `"table"` (or `"pd"`) or `"json"`; anything else yields no result.
    pub output_format: String,
    /// Column renames for the table output, replacing the defaults.
    pub column_renames: Option<BTreeMap<String, String>>,
    /// Pagination override for this call.
    pub pagination: Option<Pagination>,
}

impl Default for TripleQueryOptions {
    fn default() -> Self {
        Self {
            first: DEFAULT_FIRST,
            attribute_name: None,
            output_format: OutputFormat::Table.to_string(),
            column_renames: None,
            pagination: None,
        }
    }
}

impl TripleQueryOptions {
    /// Defaults: every triple, no filter, table output.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result limit.
    #[must_use]
    pub const fn first(mut self, first: u64) -> Self {
        self.first = first;
        self
    }

    /// Filter on attribute name.
    #[must_use]
    pub fn attribute_name(mut self, name: impl Into<String>) -> Self {
        self.attribute_name = Some(name.into());
        self
    }

    /// Set the output format.
    #[must_use]
    pub fn output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    /// Add a column rename.
    #[must_use]
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.column_renames
            .get_or_insert_with(BTreeMap::new)
            .insert(from.into(), to.into());
        self
    }

    /// Override pagination.
    #[must_use]
    pub const fn pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }
}

/// Access to the Geo subgraph.
#[derive(Debug)]
pub struct GeoData<E = GraphqlClient> {
    handle: DataSourceHandle<E>,
    triple: TripleEntity,
    pagination: Pagination,
    validate_responses: bool,
}

impl GeoData<GraphqlClient> {
    /// Connect to `url` with default settings.
    pub async fn connect(url: &str) -> GeoDataResult<Self> {
        Self::from_config(&GeoDataConfig::new(url)).await
    }

    /// Connect using a full configuration.
    pub async fn from_config(config: &GeoDataConfig) -> GeoDataResult<Self> {
        config.validate()?;

        let mut builder = GraphqlClientBuilder::new(config.url.as_str())
            .with_service_name("geo")
            .with_timeout(config.timeout())
            .with_retry_policy(transport_policy(config.transport_attempts));
        if config.validate_responses {
            builder = builder.with_validation_mode(SchemaValidationMode::ResponseOnly);
        }
        if let Some(key) = &config.api_key {
            builder = builder.with_bearer_token(key);
        }

        let mut geo = Self::with_engine(builder.build()?, config.max_attempts).await?;
        geo.pagination = config.pagination;
        geo.validate_responses = config.validate_responses;
        Ok(geo)
    }
}

fn transport_policy(attempts: u32) -> RetryPolicy {
    if attempts <= 1 {
        RetryPolicy::never()
    } else {
        RetryPolicy::with_max_attempts(usize::try_from(attempts).unwrap_or(usize::MAX))
    }
}

impl<E: QueryEngine> GeoData<E> {
    /// Bootstrap over an existing engine.
    pub async fn with_engine(engine: E, max_attempts: u32) -> GeoDataResult<Self> {
        let handle = bootstrap::initialize(engine, max_attempts).await?;
        Ok(Self {
            handle,
            triple: TripleEntity::new(),
            pagination: Pagination::default(),
            validate_responses: false,
        })
    }

    /// Subgraph URL.
    #[must_use]
    pub fn url(&self) -> &str {
        self.handle.url()
    }

    /// Schema loaded at bootstrap.
    #[must_use]
    pub const fn schema(&self) -> &SubgraphSchema {
        self.handle.schema()
    }

    /// Data source handle.
    #[must_use]
    pub const fn handle(&self) -> &DataSourceHandle<E> {
        &self.handle
    }

    /// Triple helper.
    #[must_use]
    pub const fn triple(&self) -> &TripleEntity {
        &self.triple
    }

    /// Default pagination for queries.
    #[must_use]
    pub const fn pagination(&self) -> Pagination {
        self.pagination
    }

    /// Query triples and normalize them.
    ///
    /// Returns `Ok(None)` when the output format is not recognized or the
    /// JSON output cannot be serialized; both are logged. A `first` of zero
    /// is a configuration error. Engine failures are returned as errors and
    /// never retried here.
    pub async fn query_triples(
        &self,
        options: &TripleQueryOptions,
    ) -> GeoDataResult<Option<QueryOutput>> {
        if options.first == 0 {
            return Err(GeoDataError::Config("first must be at least 1".into()));
        }
        let format = match options.output_format.parse::<OutputFormat>() {
            Ok(format) => format,
            Err(err) => {
                error!(
                    format = %options.output_format,
                    accepted = %OutputFormat::ACCEPTED.join(", "),
                    "{err}"
                );
                return Ok(None);
            }
        };

        let spec = self
            .triple
            .build_query(options.first, options.attribute_name.as_deref());
        let query = spec.into_entity_query(self.triple.fields(), self.validate_responses);
        let pagination = options.pagination.unwrap_or(self.pagination);
        let rows = self.handle.engine().query_rows(&query, pagination).await?;
        info!(
            url = %self.url(),
            rows = rows.len(),
            format = %format,
            attribute = options.attribute_name.as_deref().unwrap_or(""),
            "queried triples"
        );

        match format {
            OutputFormat::Table => Ok(Some(QueryOutput::Table(
                self.triple
                    .to_table(&rows, options.column_renames.as_ref())?,
            ))),
            OutputFormat::Json => Ok(json_output(&TripleEntity::to_json_records(&rows))),
        }
    }
}

/// Serialize JSON records; failures are logged and yield no output.
fn json_output<T: Serialize + ?Sized>(records: &T) -> Option<QueryOutput> {
    match serde_json::to_string(records).map_err(GeoDataError::from) {
        Ok(json) => Some(QueryOutput::Json(json)),
        Err(err) => {
            warn!(
                error = %err,
                "Failed when attempting to convert restructured data back to json format"
            );
            None
        }
    }
}
