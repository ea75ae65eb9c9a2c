//! Page window computation for list screens.

use serde::Serialize;

pub const DEFAULT_ITEMS_PER_PAGE: usize = 20;

/// Page numbers to render, `None` marking an ellipsis gap.
fn page_window(
    total_pages: usize,
    current: usize,
    left_edge: usize,
    left_current: usize,
    right_current: usize,
    right_edge: usize,
) -> Vec<Option<usize>> {
    if total_pages == 0 {
        return Vec::new();
    }

    let mut pages = Vec::new();

    let head_end = (1 + left_edge).min(total_pages + 1);
    pages.extend((1..head_end).map(Some));

    let middle_start = head_end.max(current.saturating_sub(left_current));
    let middle_end = (current + right_current + 1).min(total_pages + 1);
    if middle_start > head_end {
        pages.push(None);
    }
    pages.extend((middle_start..middle_end).map(Some));

    let tail_start = middle_end.max(total_pages.saturating_sub(right_edge) + 1);
    if tail_start > middle_end {
        pages.push(None);
    }
    pages.extend((tail_start..=total_pages).map(Some));

    pages
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pages: Vec<Option<usize>>,
    pub page: usize,
    pub total: usize,
}

impl<T> Paginated<T> {
    /// Wraps one page of `items` out of `total` matching rows.
    pub fn new(items: Vec<T>, page: usize, total: usize, per_page: usize) -> Self {
        let page = page.max(1);
        let total_pages = total.div_ceil(per_page.max(1));
        Self {
            items,
            pages: page_window(total_pages, page, 2, 2, 4, 2),
            page,
            total,
        }
    }
}

/// Offset/limit pair for a one-based page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: usize,
    pub per_page: usize,
}

impl Pagination {
    pub fn new(page: usize, per_page: usize) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1),
        }
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) * self.per_page) as i64
    }
}
