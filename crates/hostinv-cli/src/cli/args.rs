//! Command-line argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Host software inventory agent
///
/// Collects installed software and machine facts, seals the report with
/// AES-256-GCM and posts it to a collector at <server>/upload-report.
#[derive(Parser, Debug)]
#[command(name = "hostinv")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Collector server address (or set HOSTINV_SERVER env var)
    #[arg(short, long, env = "HOSTINV_SERVER", global = true)]
    pub server: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Config file to use instead of the per-user one
    #[arg(long, env = "HOSTINV_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect and print the inventory report
    Scan(ScanArgs),

    /// Collect, seal and upload the inventory report
    Send(SendArgs),

    /// Decrypt a sealed envelope file and print its report
    Open(OpenArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),
}

/// Collector knobs shared by `scan` and `send`
#[derive(Args, Debug, Clone)]
pub struct CollectArgs {
    /// Skip the Windows product catalog query
    #[arg(long)]
    pub no_catalog: bool,

    /// Report this machine name instead of the hostname
    #[arg(long)]
    pub machine_name: Option<String>,
}

#[derive(Args, Debug)]
pub struct ScanArgs {
    #[command(flatten)]
    pub collect: CollectArgs,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    #[command(flatten)]
    pub collect: CollectArgs,

    /// Delivery retries after a transient failure
    #[arg(short, long, default_value = "3")]
    pub retries: u32,
}

#[derive(Args, Debug)]
pub struct OpenArgs {
    /// Envelope file (nonce || tag || ciphertext)
    pub file: PathBuf,

    /// Passphrase the envelope was sealed with, if not the built-in one
    #[arg(long, env = "HOSTINV_PASSPHRASE", hide_env_values = true)]
    pub passphrase: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a configuration value
    Set {
        /// Configuration key
        key: String,

        /// Value to set
        value: String,
    },

    /// Show configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_defaults_to_three_retries() {
        let cli = Cli::try_parse_from(["hostinv", "send"]).unwrap();
        match cli.command {
            Commands::Send(args) => {
                assert_eq!(args.retries, 3);
                assert!(!args.collect.no_catalog);
            }
            other => panic!("parsed {other:?}"),
        }
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["hostinv", "scan", "-o", "json", "--no-catalog", "-v"]).unwrap();
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert!(cli.verbose);
    }
}
