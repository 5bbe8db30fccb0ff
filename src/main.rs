//! Pulsakit CLI - resilient request layer for the reseller dashboard backend

use clap::{CommandFactory, Parser};

mod cache;
mod cli;
mod client;
mod config;
mod error;
mod models;
mod output;
mod throttle;

use cli::args::GlobalOptions;
use cli::request::RequestArgs;
use cli::{CacheCommands, Cli, Commands, GuardCommands, MemberCommands};
use error::Result;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("Error: {}", err);
        std::process::exit(1);
    }
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp(None)
        .init();
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    let opts = GlobalOptions::from_cli(&cli);
    // Commands without a CommandContext still honor preferences.format
    let format = opts.resolve_format(config::Config::load_at(opts.config_ref()).ok().as_ref());

    match cli.command {
        Commands::Init => cli::init::run(&opts).await,
        Commands::Status => cli::status::run(&opts),
        Commands::Version => {
            println!("pulsakit version {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
        Commands::Endpoint { refresh } => cli::endpoint::run(&opts, refresh).await,
        Commands::Request {
            path,
            method,
            headers,
            data,
            retries,
            wait,
        } => {
            let args = RequestArgs {
                path,
                method,
                headers,
                data,
                retries,
                wait,
            };
            cli::request::run(&opts, args).await
        }
        Commands::Member(member_cmd) => match member_cmd {
            MemberCommands::List {
                filters,
                pagination,
            } => cli::member::list(&opts, &filters, &pagination).await,
        },
        Commands::Cache(cache_cmd) => match cache_cmd {
            CacheCommands::Status => cli::cache::status(format),
            CacheCommands::Clear => cli::cache::clear(format),
            CacheCommands::Path => cli::cache::path(),
        },
        Commands::Guard(guard_cmd) => match guard_cmd {
            GuardCommands::Check { scope } => cli::guard::check(&scope, format),
            GuardCommands::Fail { scope } => cli::guard::fail(&scope, format),
            GuardCommands::Reset { scope } => cli::guard::reset(&scope, format),
        },
        Commands::Completion { shell } => {
            clap_complete::generate(
                shell,
                &mut Cli::command(),
                "pulsakit",
                &mut std::io::stdout(),
            );
            Ok(())
        }
    }
}
