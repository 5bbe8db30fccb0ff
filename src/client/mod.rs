//! Resilient request layer for the dashboard backend
//!
//! Flow: [`EndpointResolver`] picks a reachable base URL, [`RequestExecutor`]
//! performs calls against it with timeout and retry, and list callers feed
//! the resulting pages into the paginated cache.

pub mod executor;
pub mod members;
pub mod models;
pub mod options;
pub mod pagination;
pub mod resolver;

#[allow(unused_imports)]
pub use executor::{DEFAULT_RETRIES, DEFAULT_TIMEOUT, RequestExecutor, RetryPolicy};
pub use members::MemberApi;
pub use models::{Member, MemberFilters};
#[allow(unused_imports)]
pub use options::{Headers, RequestOptions};
pub use pagination::{Page, PageRequest};
pub use resolver::{EndpointResolver, HealthProbe, HttpHealthProbe};
