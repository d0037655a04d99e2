/// Page/limit handling shared by every listing endpoint
///
/// `page` starts at 1 and defaults to 1, `limit` defaults to 10 and is capped
/// at 100. Values below 1 are rejected rather than corrected.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid page or limit")]
pub struct PaginationError;

/// Validated page request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i64,
    pub limit: i64,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl PageRequest {
    /// Builds a page request from optional query values
    ///
    /// # Errors
    ///
    /// `PaginationError` when `page < 1` or `limit < 1`
    pub fn new(page: Option<i64>, limit: Option<i64>) -> Result<Self, PaginationError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);

        if page < 1 || limit < 1 {
            return Err(PaginationError);
        }

        Ok(Self {
            page,
            limit: limit.min(MAX_LIMIT),
        })
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }
}

/// One page of results plus the total row count for the filter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, total: i64, request: PageRequest) -> Self {
        Self {
            total,
            page: request.page,
            limit: request.limit,
            items,
        }
    }

    /// Transforms every item, keeping the paging metadata
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            page: self.page,
            limit: self.limit,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}
