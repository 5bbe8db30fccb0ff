//! Command execution context
//!
//! Provides a unified context for command execution, eliminating boilerplate
//! for config loading, endpoint resolution and store initialization.

use std::sync::Arc;

use log::{debug, warn};

use crate::cache::{KeyValueStore, MEMBER_LIST_KEY, MemoryStore, PaginatedCache, SqliteStore};
use crate::cli::OutputFormat;
use crate::cli::args::GlobalOptions;
use crate::client::{EndpointResolver, HttpHealthProbe, Member, RequestExecutor};
use crate::config::Config;
use crate::error::Result;

/// Shared handle to whichever store backs this run
pub type SharedStore = Arc<dyn KeyValueStore>;

/// Member list cache as used by the CLI
pub type MemberCache = PaginatedCache<SharedStore, Member>;

/// Context for command execution containing config, executor and runtime options.
pub struct CommandContext {
    /// Loaded configuration with CLI/env overrides applied
    pub config: Config,
    /// Retrying executor bound to this run's endpoint resolver
    pub executor: RequestExecutor,
    /// Output format preference
    pub format: OutputFormat,
    /// Store for list caching (in-memory under `--no-cache`)
    pub store: SharedStore,
}

impl CommandContext {
    /// Create a new command context with full initialization.
    ///
    /// This handles:
    /// - Loading config (a missing file is fine if `--endpoint` was given)
    /// - Applying endpoint and token overrides
    /// - Building the resolver and executor
    /// - Opening the persistent store, or an in-memory one under `--no-cache`
    ///
    /// # Errors
    /// Returns error if no endpoint is configured or the config is invalid.
    pub fn new(opts: &GlobalOptions) -> Result<Self> {
        let mut config = Config::load_or_default(opts.config_ref())?;
        config.apply_overrides(&opts.endpoints, opts.api_token_ref());
        config.validate_endpoints()?;

        let format = opts.resolve_format(Some(&config));

        let resolver = EndpointResolver::new(
            config.endpoints.clone(),
            Arc::new(HttpHealthProbe::new()?),
        )?;
        let executor = RequestExecutor::new(resolver, config.api_token.clone())?;

        let store = open_store(opts.no_cache);

        Ok(Self {
            config,
            executor,
            format,
            store,
        })
    }

    /// Member list cache over this run's store
    pub fn member_cache(&self) -> MemberCache {
        PaginatedCache::new(self.store.clone(), MEMBER_LIST_KEY)
    }

    /// Retry count from preferences
    pub fn retries(&self) -> u32 {
        self.config.preferences.retries
    }
}

/// Open the persistent store; an unusable store degrades to memory so list
/// commands keep working without caching.
fn open_store(no_cache: bool) -> SharedStore {
    if no_cache {
        debug!("Cache disabled, using in-memory store");
        return Arc::new(MemoryStore::new());
    }
    match SqliteStore::open() {
        Ok(store) => Arc::new(store) as SharedStore,
        Err(e) => {
            warn!("Failed to open store, caching disabled for this run: {}", e);
            Arc::new(MemoryStore::new())
        }
    }
}
