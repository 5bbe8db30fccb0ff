//! Cursor pagination types for list endpoints

use serde::{Deserialize, Serialize};

/// Largest page the backend will serve
pub const MAX_PAGE_SIZE: usize = 100;

/// Parameters for requesting one page of a list.
///
/// # Example
/// ```ignore
/// let params = PageRequest::new(20).after(Some("cur-2"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRequest {
    /// Records per page (clamped to `MAX_PAGE_SIZE`)
    pub limit: Option<usize>,
    /// Continuation token from the previous page
    pub cursor: Option<String>,
}

impl PageRequest {
    pub fn new(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            cursor: None,
        }
    }

    /// Continue after `cursor`; `None` starts from the first page
    pub fn after(mut self, cursor: Option<&str>) -> Self {
        self.cursor = cursor.map(String::from);
        self
    }

    /// Query parameters using the backend's names (`limit`, `cursor`)
    pub fn to_query_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(limit) = self.limit {
            params.push(("limit", limit.clamp(1, MAX_PAGE_SIZE).to_string()));
        }
        if let Some(ref cursor) = self.cursor {
            params.push(("cursor", cursor.clone()));
        }
        params
    }
}

/// One page of a list as returned by the backend.
///
/// `total`, `has_more` and `next_cursor` are the server's view of the whole
/// result set and are never derived from `records.len()`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    #[serde(rename = "data", default = "Vec::new")]
    pub records: Vec<T>,

    #[serde(default)]
    pub total: usize,

    #[serde(default)]
    pub has_more: bool,

    #[serde(default)]
    pub next_cursor: Option<String>,
}

impl<T> Page<T> {
    pub fn new(records: Vec<T>, total: usize, has_more: bool, next_cursor: Option<String>) -> Self {
        Self {
            records,
            total,
            has_more,
            next_cursor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_default_is_empty() {
        assert!(PageRequest::default().to_query_params().is_empty());
    }

    #[test]
    fn test_page_request_params() {
        let params = PageRequest::new(20).after(Some("cur-2")).to_query_params();
        assert_eq!(
            params,
            vec![("limit", "20".to_string()), ("cursor", "cur-2".to_string())]
        );
    }

    #[test]
    fn test_page_request_clamps_limit() {
        let params = PageRequest::new(5_000).to_query_params();
        assert_eq!(params, vec![("limit", MAX_PAGE_SIZE.to_string())]);

        let params = PageRequest::new(0).to_query_params();
        assert_eq!(params, vec![("limit", "1".to_string())]);
    }

    #[test]
    fn test_page_deserializes_backend_shape() {
        let page: Page<serde_json::Value> = serde_json::from_str(
            r#"{"data":[{"kode":"M1"}],"total":42,"hasMore":true,"nextCursor":"c2"}"#,
        )
        .unwrap();

        assert_eq!(page.records.len(), 1);
        assert_eq!(page.total, 42);
        assert!(page.has_more);
        assert_eq!(page.next_cursor.as_deref(), Some("c2"));
    }

    #[test]
    fn test_page_missing_fields_default() {
        let page: Page<serde_json::Value> = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert_eq!(page.total, 0);
        assert!(!page.has_more);
        assert!(page.next_cursor.is_none());
    }
}
