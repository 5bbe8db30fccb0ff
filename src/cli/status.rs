//! Status command implementation

use colored::Colorize;

use crate::cache::SqliteStore;
use crate::cli::args::GlobalOptions;
use crate::config::Config;
use crate::error::{ConfigError, Error, Result};

/// Run the status command to display configuration status.
///
/// Purely local: nothing is probed or fetched.
pub fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}\n", "Pulsakit Configuration Status".bold());

    let config_path = Config::resolve_path(opts.config_ref())?;
    let mut config = match Config::load_at(opts.config_ref()) {
        Ok(config) => {
            println!("Config file: {}", config_path.display().to_string().cyan());
            config
        }
        Err(Error::Config(ConfigError::NotFound)) => {
            println!("{} Configuration not found", "✗".red());
            Config::default()
        }
        Err(e) => return Err(e),
    };
    let overridden = opts.endpoints.iter().any(|e| !e.trim().is_empty());
    config.apply_overrides(&opts.endpoints, opts.api_token_ref());

    println!();

    if config.endpoints.is_empty() {
        println!("{} No endpoints configured", "✗".red());
        println!("  → Run 'pulsakit init' or pass --endpoint");
    } else {
        let source = if overridden { "--endpoint" } else { "config" };
        println!(
            "{} {} candidate endpoint(s) {}",
            "✓".green(),
            config.endpoints.len(),
            format!("(from {})", source).dimmed()
        );
        for (i, endpoint) in config.endpoints.iter().enumerate() {
            println!("  {}. {}", i + 1, endpoint);
        }
        if let Err(e) = config.validate_endpoints() {
            println!("{} {}", "⚠".yellow(), e);
        }
    }

    if config.api_token.is_some() {
        println!("{} API token configured", "✓".green());
    } else {
        println!("{} No API token (requests are sent unauthenticated)", "○".dimmed());
    }

    println!(
        "{} Page size {}, retries {}",
        "○".dimmed(),
        config.preferences.page_size,
        config.preferences.retries
    );

    match SqliteStore::db_path() {
        Ok(path) => println!("{} Store: {}", "○".dimmed(), path.display()),
        Err(e) => println!("{} Store unavailable: {}", "⚠".yellow(), e),
    }

    println!();
    Ok(())
}
