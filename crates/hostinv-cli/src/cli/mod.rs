//! CLI argument parsing and command dispatch.

pub mod args;
pub mod commands;

use anyhow::Result;
use args::{Cli, Commands};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::output::OutputFormat;

/// Run the CLI application.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);
    if cli.no_color {
        colored::control::set_override(false);
    }

    // Load configuration
    let config_path = Config::path(cli.config.as_deref())?;
    let config = Config::load(&config_path)?;

    // Flag, then config, then pretty
    let output_format = cli
        .output
        .or(config.output_format)
        .unwrap_or(OutputFormat::Pretty);

    // Server from CLI/env, then config
    let server = cli
        .server
        .filter(|s| !s.trim().is_empty())
        .or_else(|| config.server_url.clone());

    let ctx = commands::Context {
        server,
        output_format,
        config,
        config_path,
        verbose: cli.verbose,
    };

    match cli.command {
        Commands::Scan(args) => commands::scan::execute(ctx, args).await,
        Commands::Send(args) => commands::send::execute(ctx, args).await,
        Commands::Open(args) => commands::open::execute(ctx, args).await,
        Commands::Config(args) => commands::config::execute(ctx, args).await,
    }
}

/// Log to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
