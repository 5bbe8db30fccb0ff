//! Cache management commands

use std::sync::Arc;

use chrono::Utc;

use crate::cache::{MEMBER_LIST_KEY, PaginatedCache, SqliteStore};
use crate::cli::OutputFormat;
use crate::client::Member;
use crate::error::Result;
use crate::output::formatters::format_size;

/// Show store status/statistics
pub fn status(format: OutputFormat) -> Result<()> {
    let store = Arc::new(SqliteStore::open()?);
    let stats = store.stats()?;

    let members: PaginatedCache<_, Member> = PaginatedCache::new(store.clone(), MEMBER_LIST_KEY);
    let (live, expired) = members.entry_counts_at(Utc::now());

    let path = SqliteStore::db_path()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "keys": stats.entries,
                "member_lists_live": live,
                "member_lists_expired": expired,
                "total_size_bytes": stats.total_size_bytes,
                "total_size_human": format_size(stats.total_size_bytes),
                "oldest_update_timestamp": stats.oldest_update,
                "newest_update_timestamp": stats.newest_update,
                "path": path,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            println!("Store Status");
            println!("────────────────────────────────────────");
            println!("Location:       {}", path);
            println!("Keys:           {}", stats.entries);
            println!("Member lists:   {} live, {} expired", live, expired);
            println!("Total size:     {}", format_size(stats.total_size_bytes));

            if let Some(newest) = stats.newest_update {
                println!("Last write:     {}", local_time(newest));
            }
        }
    }

    Ok(())
}

/// Drop cached member lists. Attempt logs are left alone; see `guard reset`.
pub fn clear(format: OutputFormat) -> Result<()> {
    let store = Arc::new(SqliteStore::open()?);
    let members: PaginatedCache<_, Member> = PaginatedCache::new(store, MEMBER_LIST_KEY);
    let (live, expired) = members.entry_counts_at(Utc::now());
    members.clear()?;
    let removed = live + expired;

    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "member_lists_removed": removed,
                "success": true,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => {
            if removed > 0 {
                println!("Cleared {} cached member lists", removed);
            } else {
                println!("Cache was already empty");
            }
        }
    }

    Ok(())
}

/// Show store path
pub fn path() -> Result<()> {
    println!("{}", SqliteStore::db_path()?.display());
    Ok(())
}

fn local_time(epoch_secs: i64) -> String {
    chrono::DateTime::from_timestamp(epoch_secs, 0)
        .map(|d| {
            d.with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M")
                .to_string()
        })
        .unwrap_or_else(|| "unknown".to_string())
}
