//! Pagination types: offset windows, page requests and result pages.
//!
//! ```rust
//! use squad_query::{Page, PageRequest, Pagination};
//!
//! // Skip 10, take 20
//! let pagination = Pagination::new().skip(10).take(20);
//! assert_eq!(pagination.to_sql(), "LIMIT 20 OFFSET 10");
//!
//! // Zero-based page requests
//! let request = PageRequest::of(2, 25).unwrap();
//! assert_eq!(request.offset(), 50);
//! assert_eq!(request.to_pagination(), Pagination::new().skip(50).take(25));
//!
//! let page = Page::new(vec!["member1", "member2"], &PageRequest::of(0, 3).unwrap(), 2);
//! assert_eq!(page.total_pages(), 1);
//! assert!(page.is_last());
//! ```

use serde::Serialize;
use std::fmt::Write;

use crate::error::{QueryError, QueryResult};
use crate::sql::MAX_WINDOW_BOUND;
use crate::types::OrderBy;

/// Offset/limit window for queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    /// Number of records to skip.
    pub skip: Option<u64>,
    /// Maximum number of records to take.
    pub take: Option<u64>,
}

impl Pagination {
    /// Create a new pagination with no limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records to skip.
    pub fn skip(mut self, skip: u64) -> Self {
        self.skip = Some(skip);
        self
    }

    /// Set the maximum number of records to take.
    pub fn take(mut self, take: u64) -> Self {
        self.take = Some(take);
        self
    }

    /// Check if pagination is specified.
    pub fn is_empty(&self) -> bool {
        self.skip.is_none() && self.take.is_none()
    }

    /// Effective offset (0 when unset).
    pub fn offset(&self) -> u64 {
        self.skip.unwrap_or(0)
    }

    /// Generate a generic SQL LIMIT/OFFSET clause.
    pub fn to_sql(&self) -> String {
        let mut sql = String::new();

        if let Some(take) = self.take {
            let _ = write!(sql, "LIMIT {}", take.min(MAX_WINDOW_BOUND));
        }

        if let Some(skip) = self.skip {
            if !sql.is_empty() {
                sql.push(' ');
            }
            let _ = write!(sql, "OFFSET {}", skip.min(MAX_WINDOW_BOUND));
        }

        sql
    }

    /// Apply the window to an already materialised sequence.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        let skip = usize::try_from(self.offset()).unwrap_or(usize::MAX);
        let take = self
            .take
            .map(|t| usize::try_from(t).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        items.into_iter().skip(skip).take(take).collect()
    }
}

/// A request for one page of results.
///
/// Pages are zero-based: page 0 starts at offset 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    page_index: u64,
    page_size: u64,
    sort: OrderBy,
}

impl PageRequest {
    /// Request page `page_index` of `page_size` records.
    ///
    /// Fails with an invalid pagination error when `page_size` is zero.
    pub fn of(page_index: u64, page_size: u64) -> QueryResult<Self> {
        if page_size == 0 {
            return Err(QueryError::invalid_pagination(format!(
                "page size must be greater than zero (page {})",
                page_index
            )));
        }
        Ok(Self {
            page_index,
            page_size,
            sort: OrderBy::none(),
        })
    }

    /// Request a sorted page.
    pub fn sorted(page_index: u64, page_size: u64, sort: impl Into<OrderBy>) -> QueryResult<Self> {
        Ok(Self::of(page_index, page_size)?.with_sort(sort))
    }

    /// Replace the sort.
    pub fn with_sort(mut self, sort: impl Into<OrderBy>) -> Self {
        self.sort = sort.into();
        self
    }

    /// Zero-based page index.
    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    /// Page size (always > 0).
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Requested sort; empty means store-defined order.
    pub fn sort(&self) -> &OrderBy {
        &self.sort
    }

    /// Offset of the first record of this page.
    pub fn offset(&self) -> u64 {
        self.page_index.saturating_mul(self.page_size)
    }

    /// The request for the following page.
    pub fn next(&self) -> Self {
        Self {
            page_index: self.page_index.saturating_add(1),
            page_size: self.page_size,
            sort: self.sort.clone(),
        }
    }

    /// The offset/limit window for this page.
    pub fn to_pagination(&self) -> Pagination {
        Pagination::new().skip(self.offset()).take(self.page_size)
    }
}

/// A bounded slice of results plus the total count of all matches.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    content: Vec<T>,
    total: u64,
    page_index: u64,
    page_size: u64,
}

impl<T> Page<T> {
    /// Create a page for `request`.
    ///
    /// `total` is raised to cover the content actually returned, so
    /// `total >= offset + content.len()` always holds.
    pub fn new(content: Vec<T>, request: &PageRequest, total: u64) -> Self {
        let seen = request.offset().saturating_add(content.len() as u64);
        let total = if content.is_empty() { total } else { total.max(seen) };
        Self {
            content,
            total,
            page_index: request.page_index(),
            page_size: request.page_size(),
        }
    }

    /// An empty page.
    pub fn empty(request: &PageRequest) -> Self {
        Self::new(Vec::new(), request, 0)
    }

    /// Records on this page.
    pub fn content(&self) -> &[T] {
        &self.content
    }

    /// Consume the page, returning its records.
    pub fn into_content(self) -> Vec<T> {
        self.content
    }

    /// Total number of matching records across all pages.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Zero-based page index.
    pub fn page_index(&self) -> u64 {
        self.page_index
    }

    /// Requested page size.
    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    /// Number of records on this page.
    pub fn number_of_elements(&self) -> usize {
        self.content.len()
    }

    /// Whether the page has no records.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    /// Number of pages needed for `total` records.
    pub fn total_pages(&self) -> u64 {
        self.total.div_ceil(self.page_size.max(1))
    }

    /// Whether a later page exists.
    pub fn has_next(&self) -> bool {
        self.page_index.saturating_add(1) < self.total_pages()
    }

    /// Whether an earlier page exists.
    pub fn has_previous(&self) -> bool {
        self.page_index > 0
    }

    /// Whether this is the first page.
    pub fn is_first(&self) -> bool {
        !self.has_previous()
    }

    /// Whether this is the last page.
    pub fn is_last(&self) -> bool {
        !self.has_next()
    }

    /// Map the records, keeping the paging metadata.
    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            content: self.content.into_iter().map(f).collect(),
            total: self.total,
            page_index: self.page_index,
            page_size: self.page_size,
        }
    }
}

impl<T> IntoIterator for Page<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.content.into_iter()
    }
}
