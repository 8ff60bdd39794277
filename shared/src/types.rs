use serde::{Deserialize, Serialize};

/// Common pagination request used by list-style query operations (e.g. the
/// dead-stock SKU listing behind `GetHealthMetrics`, spec §6.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: i32,
    pub per_page: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResponse<T> {
    pub data: Vec<T>,
    pub total: i64,
    pub page: i32,
    pub per_page: i32,
    pub total_pages: i32,
}

impl PageRequest {
    pub fn new(page: i32, per_page: i32) -> Self {
        Self {
            page: page.max(1),
            per_page: per_page.max(1).min(100),
        }
    }

    pub fn offset(&self) -> i64 {
        ((self.page - 1) * self.per_page) as i64
    }

    pub fn limit(&self) -> i64 {
        self.per_page as i64
    }
}

impl<T> PageResponse<T> {
    pub fn new(data: Vec<T>, total: i64, page: i32, per_page: i32) -> Self {
        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i32;
        Self {
            data,
            total,
            page,
            per_page,
            total_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_request_clamps_and_computes_offset() {
        let page_req = PageRequest::new(2, 20);
        assert_eq!(page_req.offset(), 20);
        assert_eq!(page_req.limit(), 20);

        let clamped = PageRequest::new(0, 500);
        assert_eq!(clamped.page, 1);
        assert_eq!(clamped.per_page, 100);
    }
}
