//! Global CLI options shared across all commands
//!
//! Consolidates the global flags into one struct so handler signatures stay
//! small. When a new global option is added, only this struct and `main.rs`
//! need to change.

use crate::cli::{Cli, OutputFormat};
use crate::config::Config;

/// Global CLI options passed to all command handlers.
///
/// # Precedence
///
/// CLI flag > environment variable > config file > default. This struct
/// captures the CLI/env layer; config file values are merged in
/// `CommandContext`.
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    /// Output format; `None` defers to `preferences.format`
    pub format: Option<OutputFormat>,

    /// Custom config file path (defaults to ~/.pulsakit/config.yaml)
    pub config: Option<String>,

    /// Candidate endpoints overriding the config file
    pub endpoints: Vec<String>,

    /// Auth token overriding the config file
    pub api_token: Option<String>,

    /// Serve member lists without the persistent cache
    pub no_cache: bool,
}

impl GlobalOptions {
    /// Create GlobalOptions from a parsed CLI struct.
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            format: cli.format,
            config: cli.config.clone(),
            endpoints: cli.endpoint.clone(),
            api_token: cli.api_token.clone(),
            no_cache: cli.no_cache,
        }
    }

    /// Get config path as `Option<&str>`.
    pub fn config_ref(&self) -> Option<&str> {
        self.config.as_deref()
    }

    /// Get token override as `Option<&str>`.
    pub fn api_token_ref(&self) -> Option<&str> {
        self.api_token.as_deref()
    }

    /// Resolve the output format against the config preference.
    pub fn resolve_format(&self, config: Option<&Config>) -> OutputFormat {
        self.format
            .or_else(|| {
                config
                    .and_then(|c| c.preferences.format.as_deref())
                    .and_then(OutputFormat::from_preference)
            })
            .unwrap_or(OutputFormat::Pretty)
    }
}
