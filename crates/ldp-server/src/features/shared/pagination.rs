//! Shared pagination utilities
//!
//! Common pagination types used by list queries. Defaults to page 1 with
//! 20 items; per-page is clamped to 1-100.

use serde::{Deserialize, Serialize};

/// Common pagination request parameters
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PaginationParams {
    /// Page number (1-indexed). Defaults to 1.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<i64>,

    /// Items per page. Defaults to 20, clamped to 1-100.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<i64>,
}

impl PaginationParams {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Self {
        Self { page, per_page }
    }

    /// Page number (1-indexed), defaulting to 1
    pub fn page(&self) -> i64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Items per page, defaulting to 20 and clamped to 1-100
    pub fn per_page(&self) -> i64 {
        self.per_page.unwrap_or(20).clamp(1, 100)
    }

    /// Offset for the SQL OFFSET clause
    pub fn offset(&self) -> i64 {
        (self.page() - 1) * self.per_page()
    }
}

/// Pagination metadata for list responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationMeta {
    pub page: i64,
    pub per_page: i64,
    pub total: i64,
    pub pages: i64,
}

impl PaginationMeta {
    pub fn new(page: i64, per_page: i64, total: i64) -> Self {
        let pages = if total == 0 {
            0
        } else {
            (total + per_page - 1) / per_page
        };
        Self {
            page,
            per_page,
            total,
            pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = PaginationParams::default();
        assert_eq!(params.page(), 1);
        assert_eq!(params.per_page(), 20);
        assert_eq!(params.offset(), 0);
    }

    #[test]
    fn test_offset_calculation() {
        let params = PaginationParams::new(Some(3), Some(25));
        assert_eq!(params.offset(), 50);
    }

    #[test]
    fn test_per_page_clamped() {
        assert_eq!(PaginationParams::new(None, Some(1000)).per_page(), 100);
        assert_eq!(PaginationParams::new(None, Some(0)).per_page(), 1);
        assert_eq!(PaginationParams::new(Some(-5), None).page(), 1);
    }

    #[test]
    fn test_meta_page_count() {
        assert_eq!(PaginationMeta::new(1, 20, 0).pages, 0);
        assert_eq!(PaginationMeta::new(1, 20, 20).pages, 1);
        assert_eq!(PaginationMeta::new(1, 20, 21).pages, 2);
    }
}
