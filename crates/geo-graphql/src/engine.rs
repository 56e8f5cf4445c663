//! The query engine seam consumed by data-access layers.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::client::GraphqlClient;
use crate::error::GraphqlClientError;
use crate::pagination::{
    CursorPage, CursorPageInfo, OffsetPage, PageLimit, Pagination, PaginationError,
    PaginationStrategy, paginate_cursor, paginate_offset,
};
use crate::query::{EntityQuery, PageWindow};
use crate::schema::SubgraphSchema;

/// Loads schemas and runs paginated entity queries against one endpoint.
#[async_trait]
pub trait QueryEngine: Send + Sync {
    /// Endpoint this engine talks to.
    fn endpoint(&self) -> &str;

    /// Load the remote schema.
    async fn load_schema(&self) -> Result<SubgraphSchema, GraphqlClientError>;

    /// Run `query` to completion and return the raw nested rows in id order.
    async fn query_rows(
        &self,
        query: &EntityQuery,
        pagination: Pagination,
    ) -> Result<Vec<Value>, PaginationError>;
}

#[async_trait]
impl QueryEngine for GraphqlClient {
    fn endpoint(&self) -> &str {
        Self::endpoint(self)
    }

    async fn load_schema(&self) -> Result<SubgraphSchema, GraphqlClientError> {
        self.introspect().await
    }

    async fn query_rows(
        &self,
        query: &EntityQuery,
        pagination: Pagination,
    ) -> Result<Vec<Value>, PaginationError> {
        let page_size = pagination.page_size.max(1);
        let limit = Some(PageLimit::from_first(query.first()));
        let rows = match pagination.strategy {
            PaginationStrategy::Shallow => {
                paginate_cursor(None, limit, move |cursor, remaining| {
                    self.cursor_page(query, cursor, page_len(page_size, remaining))
                })
                .await?
            }
            PaginationStrategy::Skip => {
                paginate_offset(0, limit, move |skip, remaining| {
                    self.offset_page(query, skip, page_len(page_size, remaining))
                })
                .await?
            }
            PaginationStrategy::Disabled => {
                self.fetch_entities(query, &PageWindow::offset(query.first(), 0))
                    .await?
            }
        };
        debug!(
            endpoint = %self.endpoint(),
            field = query.field(),
            strategy = ?pagination.strategy,
            rows = rows.len(),
            "entity query complete"
        );
        Ok(rows)
    }
}

fn page_len(page_size: usize, remaining: Option<usize>) -> usize {
    remaining.map_or(page_size, |remaining| remaining.min(page_size))
}

fn as_first(len: usize) -> u64 {
    u64::try_from(len).unwrap_or(u64::MAX)
}

impl GraphqlClient {
    async fn cursor_page(
        &self,
        query: &EntityQuery,
        cursor: Option<String>,
        len: usize,
    ) -> Result<CursorPage<Value>, GraphqlClientError> {
        let rows = self
            .fetch_entities(query, &PageWindow::cursor(as_first(len), cursor))
            .await?;
        let end_cursor = rows
            .last()
            .and_then(|row| row.get("id"))
            .and_then(Value::as_str)
            .map(str::to_string);
        let has_next_page = rows.len() >= len && end_cursor.is_some();
        Ok(CursorPage {
            items: rows,
            page_info: CursorPageInfo {
                has_next_page,
                end_cursor,
            },
        })
    }

    async fn offset_page(
        &self,
        query: &EntityQuery,
        skip: u64,
        len: usize,
    ) -> Result<OffsetPage<Value>, GraphqlClientError> {
        let rows = self
            .fetch_entities(query, &PageWindow::offset(as_first(len), skip))
            .await?;
        let next_offset = (rows.len() >= len).then(|| skip.saturating_add(as_first(rows.len())));
        Ok(OffsetPage {
            items: rows,
            next_offset,
        })
    }
}
