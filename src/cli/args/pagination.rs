//! Pagination argument types for CLI commands

use clap::Args;

use crate::client::PageRequest;

/// Cursor pagination arguments for list commands.
#[derive(Args, Debug, Default, Clone)]
pub struct PaginationArgs {
    /// Records per page (defaults to preferences.page_size)
    #[arg(long, short = 'n')]
    pub limit: Option<usize>,

    /// Fetch the next page and append it to the cached results
    #[arg(long)]
    pub more: bool,

    /// Ignore a cached entry and fetch the first page again
    #[arg(long, conflicts_with = "more")]
    pub refresh: bool,
}

impl PaginationArgs {
    /// Build the page request, falling back to the configured page size.
    pub fn to_request(&self, default_limit: usize, cursor: Option<&str>) -> PageRequest {
        PageRequest::new(self.limit.unwrap_or(default_limit)).after(cursor)
    }
}
