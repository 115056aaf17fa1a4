use serde::Serialize;

use crate::error::{Error, Result};

/// `max(1, ceil(total / page_size))`. A zero page size counts as one.
pub fn page_count(total_count: u64, page_size: u64) -> u64 {
    total_count.div_ceil(page_size.max(1)).max(1)
}

/// Check a requested page against the row count; never clamps.
pub fn validate_page(page: u64, page_size: u64, total_count: u64) -> Result<PageWindow> {
    if page_size == 0 {
        return Err(Error::InvalidPageSize);
    }
    let count = page_count(total_count, page_size);
    if page < 1 || page > count {
        return Err(Error::InvalidPage {
            page,
            page_count: count,
        });
    }
    Ok(PageWindow { page, page_size })
}

/// A validated 1-based page.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageWindow {
    page: u64,
    page_size: u64,
}

impl PageWindow {
    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1) * self.page_size
    }

    pub fn limit(&self) -> u64 {
        self.page_size
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PaginatedResult<T> {
    pub items: Vec<T>,
    pub page: u64,
    pub page_size: u64,
    pub total_count: u64,
}

impl<T> PaginatedResult<T> {
    pub fn new(items: Vec<T>, window: PageWindow, total_count: u64) -> Self {
        Self {
            items,
            page: window.page,
            page_size: window.page_size,
            total_count,
        }
    }

    pub fn page_count(&self) -> u64 {
        page_count(self.total_count, self.page_size)
    }

    pub fn has_next(&self) -> bool {
        self.page < self.page_count()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }

    /// Map items while keeping the paging numbers.
    pub fn map_items<U>(self, f: impl FnMut(T) -> U) -> PaginatedResult<U> {
        PaginatedResult {
            items: self.items.into_iter().map(f).collect(),
            page: self.page,
            page_size: self.page_size,
            total_count: self.total_count,
        }
    }
}
