//! Geo GraphQL - query engine for Graph-protocol subgraphs.
//!
//! This crate provides:
//! - A GraphQL HTTP client with typed operations and transport retry.
//! - Schema introspection and JSON Schema response validation.
//! - Runtime-built entity queries (`triples(first, skip, where, ...)`).
//! - Cursor and offset pagination strategies.
//! - The [`QueryEngine`] trait that data-access layers depend on.

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::return_self_not_must_use)]
#![allow(clippy::doc_markdown)]

mod client;
mod engine;
mod error;
mod operation;
mod pagination;
mod query;
mod retry;
mod schema;

pub use client::{
    GraphqlClient, GraphqlClientBuilder, GraphqlClientConfig, GraphqlClientMetrics,
    GraphqlClientMetricsSnapshot, SchemaValidationMode,
};
pub use engine::QueryEngine;
pub use error::{
    GraphqlClientError, GraphqlError, GraphqlErrorLocation, GraphqlPathSegment, HttpErrorInfo,
};
pub use operation::{GraphqlOperation, GraphqlQuery, GraphqlRequest, GraphqlResponse, NoVariables};
pub use pagination::{
    CursorPage, CursorPageInfo, DEFAULT_PAGE_SIZE, OffsetPage, PageLimit, Pagination,
    PaginationError, PaginationStrategy, paginate_cursor, paginate_offset,
};
pub use query::{EntityQuery, FieldPath, PageWindow};
pub use retry::{RetryDecision, RetryPolicy, RetryStrategy};
pub use schema::{IntrospectSchema, IntrospectionData, ObjectType, SchemaCache, SubgraphSchema};
