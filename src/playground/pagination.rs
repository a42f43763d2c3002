//! # Pagination Planner
//!
//! Page-number pagination. Sizes are always clamped into
//! [`MIN_PAGE_SIZE`, `MAX_PAGE_SIZE`]; page numbers are floored at 1.

use serde::{Deserialize, Serialize};

/// Smallest page a client can get
pub const MIN_PAGE_SIZE: i64 = 1;

/// Largest page a client can get
pub const MAX_PAGE_SIZE: i64 = 50;

/// Page size when neither the model nor the request sets one
pub const DEFAULT_PAGE_SIZE: i64 = 15;

/// Clamp a requested or configured page size into the allowed range
pub fn clamp_page_size(size: i64) -> usize {
    size.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE) as usize
}

/// Normalized pagination policy of a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub enabled: bool,
    pub page_size: usize,
    pub total_count: bool,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: DEFAULT_PAGE_SIZE as usize,
            total_count: true,
        }
    }
}

impl PaginationConfig {
    /// Pagination switched off: lists return every matching record
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// Raw `page[...]` parameters, still unvalidated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageParams {
    pub number: Option<i64>,
    pub size: Option<i64>,
}

/// The offset/limit window of one list request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PagePlan {
    pub page_number: usize,
    pub page_size: usize,
    pub offset: usize,
    pub limit: usize,
}

/// Compute the window for a list request.
///
/// A requested size is clamped; without one the model's configured size is
/// used, which was clamped at registration.
pub fn plan_pagination(raw: &PageParams, config: &PaginationConfig) -> PagePlan {
    let page_number = raw.number.unwrap_or(1).max(1) as usize;
    let page_size = match raw.size {
        Some(size) => clamp_page_size(size),
        None => config.page_size,
    };

    PagePlan {
        page_number,
        page_size,
        offset: (page_number - 1).saturating_mul(page_size),
        limit: page_size,
    }
}

/// Number of pages for `total_count` records, 0 when there are none
pub fn total_pages(total_count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 0;
    }
    total_count.div_ceil(page_size)
}
