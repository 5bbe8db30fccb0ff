//! CLI command definitions and handlers

use clap::{Parser, Subcommand};
pub use clap_complete::Shell;

pub mod args;
pub mod cache;
pub mod context;
pub mod endpoint;
pub mod guard;
pub mod init;
pub mod member;
pub mod request;
pub mod status;

pub use args::{MemberFilterArgs, OutputFormat, PaginationArgs};
pub use context::CommandContext;

/// Pulsakit - resilient command-line companion for the reseller dashboard backend
#[derive(Parser, Debug)]
#[command(name = "pulsakit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Output format (pretty, table, json)
    #[arg(
        long,
        global = true,
        env = "PULSAKIT_FORMAT",
        hide_env = true,
        hide_possible_values = true
    )]
    pub format: Option<OutputFormat>,

    /// Override config file location
    #[arg(long, global = true, env = "PULSAKIT_CONFIG", hide_env = true)]
    pub config: Option<String>,

    /// Candidate backend URL, in priority order (repeatable)
    #[arg(
        long,
        global = true,
        env = "PULSAKIT_ENDPOINTS",
        value_delimiter = ',',
        hide_env = true
    )]
    pub endpoint: Vec<String>,

    /// Authorization header value for every request
    #[arg(long, global = true, env = "PULSAKIT_API_TOKEN", hide_env = true)]
    pub api_token: Option<String>,

    /// Enable debug logging
    #[arg(long, global = true, env = "PULSAKIT_DEBUG", hide_env = true)]
    pub debug: bool,

    /// Bypass the persistent list cache
    #[arg(long, global = true, env = "PULSAKIT_NO_CACHE", hide_env = true)]
    pub no_cache: bool,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize Pulsakit configuration
    Init,

    /// Show configuration status
    Status,

    /// Display version information
    Version,

    /// Resolve and show the active backend endpoint
    Endpoint {
        /// Probe the candidates again instead of reusing this run's result
        #[arg(long)]
        refresh: bool,
    },

    /// Send a request through the retrying executor
    Request {
        /// Path relative to the resolved endpoint, e.g. /members
        path: String,

        /// HTTP method
        #[arg(long, short = 'X', default_value = "GET")]
        method: String,

        /// Extra header as 'Name: value' (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,

        /// JSON request body
        #[arg(long, short = 'd')]
        data: Option<String>,

        /// Extra attempts after a 5xx or network failure
        #[arg(long)]
        retries: Option<u32>,

        /// No deadline; wait for the response until interrupted with Ctrl-C
        #[arg(long)]
        wait: bool,
    },

    /// Browse reseller members
    #[command(subcommand)]
    Member(MemberCommands),

    /// Manage local store
    #[command(subcommand)]
    Cache(CacheCommands),

    /// Failed-attempt throttle
    #[command(subcommand)]
    Guard(GuardCommands),

    /// Generate shell completions
    #[command(after_help = "\
Examples:
  bash:   pulsakit completion bash > /etc/bash_completion.d/pulsakit
  zsh:    pulsakit completion zsh > \"${fpath[1]}/_pulsakit\"
  fish:   pulsakit completion fish > ~/.config/fish/completions/pulsakit.fish")]
    Completion {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Member subcommands
#[derive(Subcommand, Debug)]
pub enum MemberCommands {
    /// List members, one page at a time
    #[command(after_help = "\
A new filter combination starts from the first page. Run again with --more
to append the next page to the cached results for the same filters.")]
    List {
        #[command(flatten)]
        filters: MemberFilterArgs,

        #[command(flatten)]
        pagination: PaginationArgs,
    },
}

/// Local store subcommands
#[derive(Subcommand, Debug)]
pub enum CacheCommands {
    /// Show store statistics
    Status,

    /// Remove cached member lists (attempt logs are kept)
    Clear,

    /// Print the store location
    Path,
}

/// Throttle subcommands
#[derive(Subcommand, Debug)]
pub enum GuardCommands {
    /// Show whether a scope is locked out
    Check {
        /// Scope name, e.g. admin-login
        scope: String,
    },

    /// Record a failed attempt for a scope
    Fail {
        /// Scope name, e.g. admin-login
        scope: String,
    },

    /// Forget all attempts for a scope
    Reset {
        /// Scope name, e.g. admin-login
        scope: String,
    },
}
