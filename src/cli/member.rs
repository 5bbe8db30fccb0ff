//! Member list command implementation
//!
//! A plain run serves the cached first pages for the filter combination if
//! they are still fresh, otherwise fetches page one and replaces the entry.
//! `--more` continues from the cached cursor and merges the next page in.

use chrono::Utc;
use colored::Colorize;
use log::{debug, warn};

use crate::cache::paginated::merge_records;
use crate::cache::{CacheEntry, WriteMode, WriteTicket};
use crate::cli::args::GlobalOptions;
use crate::cli::context::MemberCache;
use crate::cli::{CommandContext, MemberFilterArgs, OutputFormat, PaginationArgs};
use crate::client::{Member, MemberApi, MemberFilters, Page, PageRequest, RequestOptions};
use crate::error::Result;
use crate::models::MemberDisplay;
use crate::output::formatters::format_age;
use crate::output::json::{PaginationMeta, format_json_page};
use crate::output::{Formattable, spinner};
use crate::output::table::format_table;

/// What the list command decided to do with the cache
#[derive(Debug, Clone, PartialEq)]
enum Plan {
    /// Show the cached entry as is
    Cached(CacheEntry<Member>),
    /// Fetch a page after `cursor` and merge it into `base`
    Append {
        base: CacheEntry<Member>,
        cursor: Option<String>,
    },
    /// Fetch the first page and replace whatever was cached
    Fresh,
}

/// Decide between serving the cache, appending and starting over
fn plan(cached: Option<CacheEntry<Member>>, more: bool, refresh: bool) -> Plan {
    match cached {
        _ if refresh => Plan::Fresh,
        Some(entry) if more && entry.has_more => Plan::Append {
            cursor: entry.next_cursor.clone(),
            base: entry,
        },
        Some(entry) => Plan::Cached(entry),
        None => Plan::Fresh,
    }
}

/// List members page by page through the cache
pub async fn list(
    opts: &GlobalOptions,
    filter_args: &MemberFilterArgs,
    pagination: &PaginationArgs,
) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let filters = filter_args.to_filters();
    let cache = ctx.member_cache();

    let cached = cache.read(&filters);
    let action = plan(cached, pagination.more, pagination.refresh);

    let page_size = ctx.config.preferences.page_size;
    let (entry, from_cache, exhausted) = match action {
        Plan::Cached(entry) => {
            debug!("Serving {} cached members", entry.records.len());
            let exhausted = pagination.more && !entry.has_more;
            (entry, true, exhausted)
        }
        Plan::Append { base, cursor } => {
            let ticket = cache.ticket(&filters);
            let page_request = pagination.to_request(page_size, cursor.as_deref());
            let page = fetch(&ctx, &filters, &page_request).await?;
            let entry = store(&cache, &ticket, Some(base), page, WriteMode::Append);
            (entry, false, false)
        }
        Plan::Fresh => {
            if pagination.more {
                debug!("No live cache entry to continue, starting from the first page");
            }
            let ticket = cache.ticket(&filters);
            let page_request = pagination.to_request(page_size, None);
            let page = fetch(&ctx, &filters, &page_request).await?;
            let entry = store(&cache, &ticket, None, page, WriteMode::Replace);
            (entry, false, false)
        }
    };

    render(ctx.format, &entry, from_cache, exhausted)
}

async fn fetch(
    ctx: &CommandContext,
    filters: &MemberFilters,
    page_request: &PageRequest,
) -> Result<Page<Member>> {
    let api = MemberApi::new(&ctx.executor, ctx.retries());
    let pb = spinner("Fetching members...");
    let result = api
        .fetch_page(filters, page_request, RequestOptions::get())
        .await;
    pb.finish_and_clear();
    result
}

/// Persist a fetched page. A failed or superseded write never loses the page:
/// the entry is rebuilt in memory and shown anyway.
fn store(
    cache: &MemberCache,
    ticket: &WriteTicket,
    base: Option<CacheEntry<Member>>,
    page: Page<Member>,
    mode: WriteMode,
) -> CacheEntry<Member> {
    match cache.write_if_current(ticket, page.clone(), mode) {
        Ok(Some(entry)) => entry,
        Ok(None) => {
            debug!("Cache write superseded, showing fetched page only");
            in_memory_entry(base, page, mode)
        }
        Err(e) => {
            warn!("Failed to cache member page: {}", e);
            in_memory_entry(base, page, mode)
        }
    }
}

fn in_memory_entry(
    base: Option<CacheEntry<Member>>,
    page: Page<Member>,
    mode: WriteMode,
) -> CacheEntry<Member> {
    let existing = match (mode, base) {
        (WriteMode::Append, Some(base)) => base.records,
        _ => Vec::new(),
    };
    CacheEntry {
        records: merge_records(existing, page.records),
        total: page.total,
        has_more: page.has_more,
        next_cursor: page.next_cursor,
        captured_at: Utc::now(),
    }
}

fn render(
    format: OutputFormat,
    entry: &CacheEntry<Member>,
    from_cache: bool,
    exhausted: bool,
) -> Result<()> {
    let rows: Vec<MemberDisplay> = entry.records.iter().map(MemberDisplay::from).collect();

    match format {
        OutputFormat::Json => {
            let meta = PaginationMeta {
                total: entry.total,
                has_more: entry.has_more,
                next_cursor: entry.next_cursor.clone(),
                cached: from_cache,
            };
            println!("{}", format_json_page(&entry.records, meta)?);
        }
        OutputFormat::Table => rows.print(format)?,
        OutputFormat::Pretty => {
            println!("{}", format_table(&rows));
            let mut footer = format!("Showing {} of {}", entry.records.len(), entry.total);
            if from_cache {
                footer.push_str(&format!(
                    " (cached {})",
                    format_age(entry.captured_at, Utc::now())
                ));
            }
            println!("{}", footer.dimmed());
            if exhausted {
                println!("{}", "No more pages.".yellow());
            } else if entry.has_more {
                println!("{}", "More available: run again with --more".dimmed());
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(kode: &str) -> Member {
        serde_json::from_value(serde_json::json!({ "kode": kode })).unwrap()
    }

    fn entry(kodes: &[&str], has_more: bool, cursor: Option<&str>) -> CacheEntry<Member> {
        CacheEntry {
            records: kodes.iter().map(|k| member(k)).collect(),
            total: 40,
            has_more,
            next_cursor: cursor.map(String::from),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_plan_without_cache_fetches_first_page() {
        assert_eq!(plan(None, false, false), Plan::Fresh);
        assert_eq!(plan(None, true, false), Plan::Fresh);
    }

    #[test]
    fn test_plan_serves_cache_when_not_loading_more() {
        let cached = entry(&["A"], true, Some("c2"));
        assert_eq!(plan(Some(cached.clone()), false, false), Plan::Cached(cached));
    }

    #[test]
    fn test_plan_more_continues_from_cursor() {
        let cached = entry(&["A"], true, Some("c2"));
        match plan(Some(cached), true, false) {
            Plan::Append { cursor, base } => {
                assert_eq!(cursor.as_deref(), Some("c2"));
                assert_eq!(base.records.len(), 1);
            }
            other => panic!("expected append, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_more_on_last_page_serves_cache() {
        let cached = entry(&["A"], false, None);
        assert!(matches!(plan(Some(cached), true, false), Plan::Cached(_)));
    }

    #[test]
    fn test_plan_refresh_ignores_cache() {
        let cached = entry(&["A"], true, Some("c2"));
        assert_eq!(plan(Some(cached), false, true), Plan::Fresh);
    }

    #[test]
    fn test_in_memory_entry_appends_and_dedupes() {
        let base = entry(&["A", "B"], true, Some("c2"));
        let page = Page::new(vec![member("B"), member("C")], 40, false, None);

        let merged = in_memory_entry(Some(base), page, WriteMode::Append);

        let kodes: Vec<&str> = merged.records.iter().map(|m| m.kode.as_str()).collect();
        assert_eq!(kodes, vec!["A", "B", "C"]);
        assert!(!merged.has_more);
        assert_eq!(merged.total, 40);
    }

    #[test]
    fn test_in_memory_entry_replace_drops_base() {
        let base = entry(&["A", "B"], true, Some("c2"));
        let page = Page::new(vec![member("Z")], 1, false, None);

        let fresh = in_memory_entry(Some(base), page, WriteMode::Replace);

        assert_eq!(fresh.records.len(), 1);
        assert_eq!(fresh.records[0].kode, "Z");
    }
}
