//! Page fetching with two total-count strategies.
//!
//! Both strategies return the same content and the same total for the same
//! query and request. They differ only in how many round trips reach the
//! engine:
//!
//! - [`PageStrategy::Simple`] asks the engine for the window and the total
//!   together ([`QueryEngine::query_many_with_count`]).
//! - [`PageStrategy::Optimized`] fetches the window first and only runs the
//!   count query when the window alone cannot prove the total (see
//!   [`is_single_complete_page`]).
//!
//! ```rust
//! use squad_query::pager::is_single_complete_page;
//!
//! // First page, not full: nothing lies beyond it.
//! assert!(is_single_complete_page(0, 2, 3));
//! // A full first page may have successors.
//! assert!(!is_single_complete_page(0, 3, 3));
//! // A later page says nothing about what came before.
//! assert!(!is_single_complete_page(3, 1, 3));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::QueryResult;
use crate::pagination::{Page, PageRequest};
use crate::query::SelectQuery;
use crate::row::{FromRow, Row};
use crate::traits::QueryEngine;

/// How a page's total count is obtained.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageStrategy {
    /// Window and total in one logical round trip; always counts.
    Simple,
    /// Window first; count only when the page may not be the only one.
    #[default]
    Optimized,
}

impl PageStrategy {
    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Optimized => "optimized",
        }
    }
}

impl fmt::Display for PageStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Single-page completeness rule.
///
/// A window starting at offset 0 that came back shorter than its limit
/// holds every match, so its length is the total.
pub fn is_single_complete_page(offset: u64, len: usize, limit: u64) -> bool {
    offset == 0 && (len as u64) < limit
}

/// Fetch one page of `query`.
///
/// The request's window replaces any window on `query`; a non-empty
/// request sort replaces its ordering. Invalid queries fail before any
/// engine call is made.
pub async fn fetch_page<E, T>(
    engine: &E,
    query: &SelectQuery,
    request: &PageRequest,
    strategy: PageStrategy,
) -> QueryResult<Page<T>>
where
    E: QueryEngine,
    T: FromRow,
{
    let mut windowed = query.clone().paginate(request.to_pagination());
    if !request.sort().is_empty() {
        windowed = windowed.order_by(request.sort().clone());
    }
    windowed.validate()?;

    let (rows, total) = match strategy {
        PageStrategy::Simple => engine.query_many_with_count(&windowed).await?,
        PageStrategy::Optimized => {
            let rows = engine.query_many(&windowed).await?;
            if is_single_complete_page(request.offset(), rows.len(), request.page_size()) {
                debug!(
                    strategy = %strategy,
                    rows = rows.len(),
                    "Count query elided: single complete page"
                );
                let total = rows.len() as u64;
                (rows, total)
            } else {
                let total = engine.count(&windowed.count_query()).await?;
                (rows, total)
            }
        }
    };

    debug!(
        strategy = %strategy,
        page = request.page_index(),
        size = request.page_size(),
        rows = rows.len(),
        total,
        "Fetched page"
    );

    let content = map_rows(&rows)?;
    Ok(Page::new(content, request, total))
}

/// Fetch every row of `query` without a window.
pub async fn fetch_all<E, T>(engine: &E, query: &SelectQuery) -> QueryResult<Vec<T>>
where
    E: QueryEngine,
    T: FromRow,
{
    query.validate()?;
    let rows = engine.query_many(query).await?;
    map_rows(&rows)
}

/// Map rows to typed values, failing on the first row that does not fit.
pub fn map_rows<T: FromRow>(rows: &[Row]) -> QueryResult<Vec<T>> {
    rows.iter().map(T::from_row).collect()
}
