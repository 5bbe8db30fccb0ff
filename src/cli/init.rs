//! Init command implementation

use colored::Colorize;
use dialoguer::{Confirm, Input, Password, theme::ColorfulTheme};

use crate::cli::args::GlobalOptions;
use crate::client::{HealthProbe, HttpHealthProbe};
use crate::config::Config;
use crate::error::{ConfigError, Result};

/// Run the init command
///
/// Existing preferences are kept; endpoints and token are replaced by what
/// the user enters.
pub async fn run(opts: &GlobalOptions) -> Result<()> {
    println!("{}", "Welcome to Pulsakit!".bold().green());
    println!("Let's set up your backend configuration.\n");

    let mut config = Config::load_or_default(opts.config_ref())?;
    let theme = ColorfulTheme::default();

    let current = config.endpoints.join(", ");
    let mut prompt = Input::<String>::with_theme(&theme)
        .with_prompt("Backend URLs, in priority order (comma separated)");
    if !current.is_empty() {
        prompt = prompt.default(current);
    }
    let raw: String = prompt.interact_text()?;

    let endpoints: Vec<String> = parse_endpoints(&raw);
    let mut candidate = config.clone();
    candidate.endpoints = endpoints;
    candidate.validate_endpoints()?;

    let token: String = Password::with_theme(&theme)
        .with_prompt("API token (leave empty for none)")
        .allow_empty_password(true)
        .interact()?;

    println!("\n{}", "Probing endpoints...".cyan());
    let probe = HttpHealthProbe::new()?;
    let mut healthy = 0;
    for endpoint in &candidate.endpoints {
        if probe.check(endpoint).await {
            healthy += 1;
            println!("  {} {}", "✓".green(), endpoint);
        } else {
            println!("  {} {}", "✗".red(), endpoint.dimmed());
        }
    }

    if healthy == 0 {
        println!(
            "{}",
            "⚠ No endpoint answered its health check; the first one will be used.".yellow()
        );
        let keep = Confirm::with_theme(&theme)
            .with_prompt("Save anyway?")
            .default(true)
            .interact()?;
        if !keep {
            return Err(ConfigError::Invalid("setup cancelled".to_string()).into());
        }
    }

    config.endpoints = candidate.endpoints;
    config.api_token = Some(token.trim().to_string()).filter(|t| !t.is_empty());
    config.save_at(opts.config_ref())?;

    let config_path = Config::resolve_path(opts.config_ref())?;
    println!(
        "\n{} Configuration saved to: {}",
        "✓".green(),
        config_path.display()
    );

    println!("\n{}", "You're all set! Try running:".bold());
    println!("  {} - Show configuration status", "pulsakit status".cyan());
    println!("  {} - Show the active endpoint", "pulsakit endpoint".cyan());
    println!("  {} - List members", "pulsakit member list".cyan());

    Ok(())
}

fn parse_endpoints(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|e| e.trim().trim_end_matches('/').to_string())
        .filter(|e| !e.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_endpoints() {
        assert_eq!(
            parse_endpoints(" https://a.test/ , ,https://b.test"),
            vec!["https://a.test", "https://b.test"]
        );
        assert!(parse_endpoints("  ").is_empty());
    }
}
