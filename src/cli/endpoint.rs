//! Endpoint command implementation

use colored::Colorize;

use crate::cli::CommandContext;
use crate::cli::args::GlobalOptions;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::output::{spinner, table::format_fields};

/// Resolve the active endpoint and report how it was chosen.
///
/// With `refresh`, the memoized result is discarded after the first
/// resolution and the candidates are probed once more.
pub async fn run(opts: &GlobalOptions, refresh: bool) -> Result<()> {
    let ctx = CommandContext::new(opts)?;
    let resolver = ctx.executor.resolver();

    let pb = spinner("Probing endpoints...");
    let mut endpoint = resolver.resolve().await;
    let first = endpoint.clone();
    if refresh {
        resolver.clear();
        pb.set_message("Re-probing endpoints...");
        endpoint = resolver.resolve().await;
    }
    pb.finish_and_clear();

    let changed = refresh && endpoint != first;

    match ctx.format {
        OutputFormat::Json => {
            let json = serde_json::json!({
                "endpoint": endpoint,
                "fallback": resolver.is_fallback(),
                "candidates": resolver.candidates(),
                "probe_sequences": resolver.probe_sequences(),
                "fallback_warnings": resolver.fallback_warnings(),
                "changed": changed,
            });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        OutputFormat::Table => {
            println!(
                "{}",
                format_fields(&[
                    ("Endpoint", endpoint.clone()),
                    ("Fallback", resolver.is_fallback().to_string()),
                    ("Candidates", resolver.candidates().len().to_string()),
                    ("Probes", resolver.probe_sequences().to_string()),
                ])
            );
        }
        OutputFormat::Pretty => {
            if resolver.is_fallback() {
                println!(
                    "{} {} {}",
                    "⚠".yellow(),
                    endpoint.cyan(),
                    "(no candidate answered healthy, using first)".yellow()
                );
            } else {
                println!("{} {}", "✓".green(), endpoint.cyan());
            }
            if changed {
                println!("  {} {}", "changed from".dimmed(), first);
            }
            for candidate in resolver.candidates() {
                let marker = if *candidate == endpoint { "→" } else { " " };
                println!("  {} {}", marker, candidate.dimmed());
            }
        }
    }

    Ok(())
}
