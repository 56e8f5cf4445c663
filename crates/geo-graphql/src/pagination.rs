//! Pagination helpers and strategies for subgraph entity queries.

use std::future::Future;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::GraphqlClientError;

/// Largest page most subgraph indexers serve without complaint.
pub const DEFAULT_PAGE_SIZE: usize = 900;

/// Cursor-based page info.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPageInfo {
    /// Whether there is another page.
    pub has_next_page: bool,
    /// Cursor for the next page.
    pub end_cursor: Option<String>,
}

/// Cursor-based page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorPage<T> {
    /// Items in the page.
    pub items: Vec<T>,
    /// Pagination info.
    pub page_info: CursorPageInfo,
}

/// Offset-based page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetPage<T> {
    /// Items in the page.
    pub items: Vec<T>,
    /// Offset of the next page.
    pub next_offset: Option<u64>,
}

/// Upper bound on the number of items collected across pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimit {
    /// Maximum number of items to fetch.
    pub max_items: usize,
}

impl PageLimit {
    /// Create a new limit.
    #[must_use]
    pub const fn new(max_items: usize) -> Self {
        Self { max_items }
    }

    /// Limit from a GraphQL `first` argument.
    #[must_use]
    pub fn from_first(first: u64) -> Self {
        Self::new(usize::try_from(first).unwrap_or(usize::MAX))
    }
}

/// How an entity query is split into requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaginationStrategy {
    /// Page through `id_gt` cursors ordered by id.
    #[default]
    Shallow,
    /// Page through `skip` offsets.
    Skip,
    /// Send a single request with the caller's `first`.
    Disabled,
}

/// Strategy plus page size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// Paging strategy.
    pub strategy: PaginationStrategy,
    /// Items requested per page.
    pub page_size: usize,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            strategy: PaginationStrategy::Shallow,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl Pagination {
    /// Same page size, different strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: PaginationStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Same strategy, different page size. Zero is treated as one.
    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }
}

/// Pagination error type.
#[derive(Debug, Error)]
pub enum PaginationError {
    /// Underlying client error.
    #[error("pagination fetch failed: {0}")]
    Client(#[from] GraphqlClientError),

    /// The server handed back the same position twice.
    #[error("pagination stalled: {0}")]
    Stalled(String),
}

/// Paginate a cursor-based API.
///
/// `fetch_page` receives the cursor and the number of items still wanted
/// (`None` when unbounded). Collection stops at the limit, on the last page,
/// or when no cursor is returned.
pub async fn paginate_cursor<T, F, Fut>(
    mut cursor: Option<String>,
    limit: Option<PageLimit>,
    mut fetch_page: F,
) -> Result<Vec<T>, PaginationError>
where
    F: FnMut(Option<String>, Option<usize>) -> Fut,
    Fut: Future<Output = Result<CursorPage<T>, GraphqlClientError>>,
{
    let mut out = Vec::new();
    loop {
        let remaining = limit.map(|limit| limit.max_items.saturating_sub(out.len()));
        if remaining == Some(0) {
            break;
        }

        let page = fetch_page(cursor.clone(), remaining).await?;
        match remaining {
            Some(remaining) => out.extend(page.items.into_iter().take(remaining)),
            None => out.extend(page.items),
        }

        if !page.page_info.has_next_page {
            break;
        }
        let Some(next) = page.page_info.end_cursor else {
            break;
        };
        if cursor.as_deref() == Some(next.as_str()) {
            return Err(PaginationError::Stalled(format!(
                "cursor {next} did not advance"
            )));
        }
        cursor = Some(next);
    }

    Ok(out)
}

/// Paginate an offset-based API.
pub async fn paginate_offset<T, F, Fut>(
    mut offset: u64,
    limit: Option<PageLimit>,
    mut fetch_page: F,
) -> Result<Vec<T>, PaginationError>
where
    F: FnMut(u64, Option<usize>) -> Fut,
    Fut: Future<Output = Result<OffsetPage<T>, GraphqlClientError>>,
{
    let mut out = Vec::new();
    loop {
        let remaining = limit.map(|limit| limit.max_items.saturating_sub(out.len()));
        if remaining == Some(0) {
            break;
        }

        let page = fetch_page(offset, remaining).await?;
        match remaining {
            Some(remaining) => out.extend(page.items.into_iter().take(remaining)),
            None => out.extend(page.items),
        }

        match page.next_offset {
            Some(next) if next <= offset => {
                return Err(PaginationError::Stalled(format!(
                    "offset {next} did not advance past {offset}"
                )));
            }
            Some(next) => offset = next,
            None => break,
        }
    }

    Ok(out)
}
