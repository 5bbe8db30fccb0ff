//! Local persistence for list pages and attempt logs
//!
//! A small key-value capability ([`KeyValueStore`]) backed by SQLite, with
//! the paginated list cache layered on top.

pub mod paginated;
pub mod signature;
pub mod sqlite;
pub mod store;

use std::time::Duration;

/// Cache TTL configuration per data type
pub struct CacheTtl;

impl CacheTtl {
    // List screens: members come and go, balances change
    pub const LIST_PAGES: Duration = Duration::from_secs(5 * 60); // 5 min
}

/// Store key holding the member list signature→entry map
pub const MEMBER_LIST_KEY: &str = "member_list_cache";

// Re-export main types
pub use paginated::{CacheEntry, Keyed, PaginatedCache, WriteMode, WriteTicket};
#[allow(unused_imports)]
pub use signature::{Filters, filter_signature};
pub use sqlite::SqliteStore;
pub use store::{KeyValueStore, MemoryStore};
