//! Page-based pagination shared by every list endpoint.

use serde::{Deserialize, Serialize};

pub const DEFAULT_PER_PAGE: u32 = 12;
pub const MAX_PER_PAGE: u32 = 100;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub fn page(&self) -> u32 { self.page.unwrap_or(1).max(1) }
    pub fn per_page(&self) -> u32 { self.per_page.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE) }
    pub fn limit(&self) -> i64 { i64::from(self.per_page()) }
    pub fn offset(&self) -> i64 { i64::from(self.page() - 1) * self.limit() }
}

#[derive(Debug, Serialize)]
pub struct PaginatedResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: u32,
    pub per_page: u32,
    pub total_pages: i64,
}

impl<T> PaginatedResponse<T> {
    pub fn new(data: Vec<T>, total: i64, params: &ListParams) -> Self {
        let per_page = params.limit();
        Self {
            data,
            total,
            page: params.page(),
            per_page: params.per_page(),
            total_pages: (total + per_page - 1) / per_page,
        }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> PaginatedResponse<U> {
        PaginatedResponse {
            data: self.data.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            per_page: self.per_page,
            total_pages: self.total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_and_clamping() {
        let p = ListParams::default();
        assert_eq!((p.page(), p.per_page(), p.offset()), (1, DEFAULT_PER_PAGE, 0));

        let p = ListParams { page: Some(0), per_page: Some(1000) };
        assert_eq!((p.page(), p.per_page()), (1, MAX_PER_PAGE));

        let p = ListParams { page: Some(3), per_page: Some(10) };
        assert_eq!(p.offset(), 20);
    }

    #[test]
    fn test_total_pages() {
        let p = ListParams { page: Some(1), per_page: Some(10) };
        assert_eq!(PaginatedResponse::new(Vec::<u8>::new(), 0, &p).total_pages, 0);
        assert_eq!(PaginatedResponse::new(vec![1u8], 10, &p).total_pages, 1);
        assert_eq!(PaginatedResponse::new(vec![1u8], 11, &p).total_pages, 2);
    }
}
