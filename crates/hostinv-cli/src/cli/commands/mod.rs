//! Command implementations.

pub mod config;
pub mod open;
pub mod scan;
pub mod send;

use hostinv::{Agent, CancellationToken, CollectorOptions};
use std::path::PathBuf;
use tracing::debug;

use crate::cli::args::CollectArgs;
use crate::config::Config;
use crate::output::OutputFormat;

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Collector server address
    pub server: Option<String>,

    /// Output format
    pub output_format: OutputFormat,

    /// Loaded configuration
    pub config: Config,

    /// Where the configuration lives
    pub config_path: PathBuf,

    /// Verbose output
    pub verbose: bool,
}

impl Context {
    /// Get the server address, returning an error if not set.
    pub fn require_server(&self) -> anyhow::Result<&str> {
        self.server.as_deref().ok_or_else(|| {
            anyhow::anyhow!(
                "Server address required.\n\n\
                 Set it with one of:\n  \
                 1. --server <URL>\n  \
                 2. HOSTINV_SERVER environment variable\n  \
                 3. hostinv config set server_url <URL>"
            )
        })
    }

    /// Build an agent from the configuration plus per-command overrides.
    pub fn agent(&self, collect: &CollectArgs, server: Option<&str>) -> anyhow::Result<Agent> {
        let options = CollectorOptions {
            query_product_catalog: self.config.query_product_catalog && !collect.no_catalog,
            machine_name: collect
                .machine_name
                .clone()
                .or_else(|| self.config.machine_name.clone()),
        };

        Ok(Agent::builder()
            .server(server.map(ToString::to_string))
            .collector_options(options)
            .command_timeout(self.config.command_timeout())
            .upload_timeout(self.config.upload_timeout())
            .build()?)
    }
}

/// Token that fires on Ctrl-C.
pub fn ctrl_c_token() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            debug!("interrupt received, cancelling");
            trigger.cancel();
        }
    });
    token
}
