//! Pagination envelope shared by all list endpoints.

use serde::{Deserialize, Serialize};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// Pagination metadata. `page` is 1-based.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub page: u32,
    pub page_size: u32,
    pub pages: u32,
    pub total: i64,
}

/// A page of results together with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct Paginated<T: Serialize> {
    pub meta: PageMeta,
    pub result: Vec<T>,
}

impl<T: Serialize> Paginated<T> {
    pub fn new(page: u32, page_size: u32, total: i64, result: Vec<T>) -> Self {
        let pages = if total <= 0 {
            0
        } else {
            ((total as u64).div_ceil(page_size as u64)) as u32
        };
        Self {
            meta: PageMeta {
                page,
                page_size,
                pages,
                total,
            },
            result,
        }
    }
}

/// Query parameters for pagination, `?page=1&pageSize=10`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

impl PageQuery {
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.page_size() as i64
    }
}
