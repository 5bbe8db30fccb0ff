//! Attempt throttle commands

use colored::Colorize;

use crate::cache::SqliteStore;
use crate::cli::OutputFormat;
use crate::error::Result;
use crate::models::GuardDisplay;
use crate::output::formatters::format_remaining;
use crate::output::Formattable;
use crate::output::json::format_json;
use crate::throttle::{AttemptThrottle, ThrottleStatus};

fn throttle() -> Result<AttemptThrottle<SqliteStore>> {
    Ok(AttemptThrottle::new(SqliteStore::open()?))
}

/// Show whether `scope` is locked out
pub fn check(scope: &str, format: OutputFormat) -> Result<()> {
    let status = throttle()?.check(scope);
    print_status(scope, &status, format)
}

/// Record a failed attempt against `scope`
pub fn fail(scope: &str, format: OutputFormat) -> Result<()> {
    let throttle = throttle()?;
    let status = throttle.record_failure(scope)?;
    if format == OutputFormat::Pretty && !status.blocked {
        let left = throttle.policy().threshold.saturating_sub(status.attempts);
        println!(
            "{} Failure recorded ({} more before lockout)",
            "○".dimmed(),
            left
        );
    }
    print_status(scope, &status, format)
}

/// Forget all attempts for `scope`
pub fn reset(scope: &str, format: OutputFormat) -> Result<()> {
    throttle()?.clear_scope(scope)?;
    match format {
        OutputFormat::Json => {
            let json = serde_json::json!({ "scope": scope, "reset": true });
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
        _ => println!("{} Attempts cleared for {}", "✓".green(), scope),
    }
    Ok(())
}

fn print_status(scope: &str, status: &ThrottleStatus, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", format_json(&GuardDisplay::new(scope, status))?),
        OutputFormat::Table => vec![GuardDisplay::new(scope, status)].print(format)?,
        OutputFormat::Pretty => {
            if status.blocked {
                println!(
                    "{} {} locked, try again in {}",
                    "✗".red(),
                    scope.bold(),
                    format_remaining(status.remaining)
                );
            } else {
                println!(
                    "{} {} open ({} recent failures)",
                    "✓".green(),
                    scope.bold(),
                    status.attempts
                );
            }
        }
    }
    Ok(())
}
