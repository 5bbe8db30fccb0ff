//! Paginated list cache with cursor-aware merging
//!
//! Keeps, per filter signature, the records fetched so far plus the
//! server's pagination state. The whole signature→entry map lives under one
//! store key and is rewritten on every write. Expiry is checked lazily on
//! read; nothing runs in the background.
//!
//! A fresh search replaces the entry. A "load more" merges the new page by
//! record key: existing records keep their position, re-sent records are
//! updated in place, new ones are appended in arrival order.

use std::collections::{BTreeMap, HashMap};
use std::marker::PhantomData;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use super::CacheTtl;
use super::signature::Filters;
use super::store::KeyValueStore;
use crate::client::Page;
use crate::error::CacheError;

type Result<T> = std::result::Result<T, CacheError>;

/// A record with a stable unique key
pub trait Keyed {
    fn key(&self) -> &str;
}

/// Cached pages for one filter signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<R> {
    pub records: Vec<R>,
    pub total: usize,
    pub has_more: bool,
    pub next_cursor: Option<String>,
    pub captured_at: DateTime<Utc>,
}

impl<R> CacheEntry<R> {
    /// True while `now - captured_at < ttl`. A capture time in the future
    /// (clock skew) counts as fresh.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        (now - self.captured_at)
            .to_std()
            .map(|age| age < ttl)
            .unwrap_or(true)
    }
}

/// How a fetched page relates to what is cached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// New search or filter change: discard what was cached
    Replace,
    /// Continuation of the same query: merge into what was cached
    Append,
}

/// Issued before a fetch; a write carrying an outdated ticket is dropped
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteTicket {
    signature: String,
    sequence: u64,
}

/// Merge `incoming` into `existing` by key.
///
/// Keeps first-seen positions, lets the latest copy of a record win, and
/// never yields two records with the same key.
pub fn merge_records<R: Keyed>(existing: Vec<R>, incoming: Vec<R>) -> Vec<R> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(existing.len());
    let mut merged: Vec<R> = Vec::with_capacity(existing.len() + incoming.len());

    for record in existing.into_iter().chain(incoming) {
        if let Some(&pos) = index.get(record.key()) {
            merged[pos] = record;
        } else {
            index.insert(record.key().to_string(), merged.len());
            merged.push(record);
        }
    }
    merged
}

/// Per-filter cache of paginated list results
pub struct PaginatedCache<S, R> {
    store: S,
    storage_key: String,
    ttl: Duration,
    tickets: Mutex<HashMap<String, u64>>,
    _records: PhantomData<fn() -> R>,
}

impl<S, R> PaginatedCache<S, R>
where
    S: KeyValueStore,
    R: Keyed + Clone + Serialize + DeserializeOwned,
{
    /// Create a cache stored under `storage_key` with the default list TTL
    pub fn new(store: S, storage_key: impl Into<String>) -> Self {
        Self {
            store,
            storage_key: storage_key.into(),
            ttl: CacheTtl::LIST_PAGES,
            tickets: Mutex::new(HashMap::new()),
            _records: PhantomData,
        }
    }

    #[allow(dead_code)]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    #[allow(dead_code)]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Return the live entry for `filters`, or `None` if absent or expired
    pub fn read<F: Filters + ?Sized>(&self, filters: &F) -> Option<CacheEntry<R>> {
        self.read_at(filters, Utc::now())
    }

    pub fn read_at<F: Filters + ?Sized>(
        &self,
        filters: &F,
        now: DateTime<Utc>,
    ) -> Option<CacheEntry<R>> {
        let signature = filters.signature();
        let entry = self.load_map().remove(&signature)?;
        if entry.is_fresh(self.ttl, now) {
            debug!("Cache hit: {} ({} records)", short(&signature), entry.records.len());
            Some(entry)
        } else {
            debug!("Cache expired: {}", short(&signature));
            None
        }
    }

    /// Store a fetched page and return the resulting entry.
    ///
    /// Pagination state always comes from `page`; the capture time is
    /// refreshed on every write. Last write wins; see
    /// [`write_if_current`](Self::write_if_current) for the guarded form.
    #[allow(dead_code)]
    pub fn write<F: Filters + ?Sized>(
        &self,
        filters: &F,
        page: Page<R>,
        mode: WriteMode,
    ) -> Result<CacheEntry<R>> {
        self.write_signature_at(filters.signature(), page, mode, Utc::now())
    }

    #[allow(dead_code)]
    pub fn write_at<F: Filters + ?Sized>(
        &self,
        filters: &F,
        page: Page<R>,
        mode: WriteMode,
        now: DateTime<Utc>,
    ) -> Result<CacheEntry<R>> {
        self.write_signature_at(filters.signature(), page, mode, now)
    }

    /// Reserve the right to write `filters`' entry once the fetch completes.
    ///
    /// Each call supersedes tickets issued earlier for the same signature.
    pub fn ticket<F: Filters + ?Sized>(&self, filters: &F) -> WriteTicket {
        let signature = filters.signature();
        let mut tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
        let sequence = tickets.entry(signature.clone()).or_insert(0);
        *sequence += 1;
        WriteTicket {
            signature,
            sequence: *sequence,
        }
    }

    /// Write only if no newer ticket was issued for the same signature.
    ///
    /// Returns `Ok(None)` when the write was dropped as stale.
    pub fn write_if_current(
        &self,
        ticket: &WriteTicket,
        page: Page<R>,
        mode: WriteMode,
    ) -> Result<Option<CacheEntry<R>>> {
        self.write_if_current_at(ticket, page, mode, Utc::now())
    }

    pub fn write_if_current_at(
        &self,
        ticket: &WriteTicket,
        page: Page<R>,
        mode: WriteMode,
        now: DateTime<Utc>,
    ) -> Result<Option<CacheEntry<R>>> {
        let latest = {
            let tickets = self.tickets.lock().unwrap_or_else(PoisonError::into_inner);
            tickets.get(&ticket.signature).copied().unwrap_or(0)
        };
        if latest != ticket.sequence {
            debug!(
                "Dropping stale write for {} (ticket {} < {})",
                short(&ticket.signature),
                ticket.sequence,
                latest
            );
            return Ok(None);
        }
        self.write_signature_at(ticket.signature.clone(), page, mode, now)
            .map(Some)
    }

    /// Remove every cached entry
    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.storage_key)
    }

    /// Count of (live, expired) entries currently persisted
    pub fn entry_counts_at(&self, now: DateTime<Utc>) -> (usize, usize) {
        let map = self.load_map();
        let live = map.values().filter(|e| e.is_fresh(self.ttl, now)).count();
        (live, map.len() - live)
    }

    fn write_signature_at(
        &self,
        signature: String,
        page: Page<R>,
        mode: WriteMode,
        now: DateTime<Utc>,
    ) -> Result<CacheEntry<R>> {
        let mut map = self.load_map_for_write()?;
        map.retain(|_, entry| entry.is_fresh(self.ttl, now));

        let previous = match mode {
            WriteMode::Replace => None,
            WriteMode::Append => map.remove(&signature),
        };
        let records = match previous {
            Some(previous) => merge_records(previous.records, page.records),
            None => {
                if mode == WriteMode::Append {
                    debug!("No live entry to append to for {}", short(&signature));
                }
                merge_records(Vec::new(), page.records)
            }
        };

        let entry = CacheEntry {
            records,
            total: page.total,
            has_more: page.has_more,
            next_cursor: page.next_cursor,
            captured_at: now,
        };
        map.insert(signature, entry.clone());
        self.save_map(&map)?;
        Ok(entry)
    }

    /// Read the persisted map; a miss on any failure
    fn load_map(&self) -> BTreeMap<String, CacheEntry<R>> {
        self.load_map_for_write().unwrap_or_else(|e| {
            warn!("Failed to read {}: {}", self.storage_key, e);
            BTreeMap::new()
        })
    }

    /// Read the persisted map before rewriting it. Only unreadable content
    /// counts as empty; a store error aborts the write so other signatures
    /// are not overwritten.
    fn load_map_for_write(&self) -> Result<BTreeMap<String, CacheEntry<R>>> {
        let Some(raw) = self.store.get(&self.storage_key)? else {
            return Ok(BTreeMap::new());
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!("Discarding unreadable {}: {}", self.storage_key, e);
            BTreeMap::new()
        }))
    }

    fn save_map(&self, map: &BTreeMap<String, CacheEntry<R>>) -> Result<()> {
        let json =
            serde_json::to_string(map).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.store.set(&self.storage_key, &json)
    }
}

fn short(signature: &str) -> &str {
    &signature[..signature.len().min(12)]
}
