//! Member list endpoint

use log::debug;

use super::executor::RequestExecutor;
use super::models::{Member, MemberFilters};
use super::options::RequestOptions;
use super::pagination::{Page, PageRequest};
use crate::error::{ApiError, Result};

/// Path of the member list resource
pub const MEMBERS_PATH: &str = "/members";

/// Fetches member pages through a [`RequestExecutor`]
pub struct MemberApi<'a> {
    executor: &'a RequestExecutor,
    retries: u32,
}

impl<'a> MemberApi<'a> {
    pub fn new(executor: &'a RequestExecutor, retries: u32) -> Self {
        Self { executor, retries }
    }

    /// Fetch one page for `filters`, starting at `page.cursor`.
    ///
    /// Non-2xx responses become errors here since a list screen has nothing
    /// useful to show for them.
    pub async fn fetch_page(
        &self,
        filters: &MemberFilters,
        page: &PageRequest,
        options: RequestOptions,
    ) -> Result<Page<Member>> {
        let mut options = options;
        for (key, value) in filters.fields() {
            options = options.query(key, value);
        }
        for (key, value) in page.to_query_params() {
            options = options.query(key, value);
        }

        let response = self
            .executor
            .execute(MEMBERS_PATH, options, self.retries)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok());
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body, retry_after).into());
        }

        let page: Page<Member> = response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse member page: {}", e))
        })?;

        debug!(
            "Fetched {} members (total {}, has_more {})",
            page.records.len(),
            page.total,
            page.has_more
        );
        Ok(page)
    }
}
