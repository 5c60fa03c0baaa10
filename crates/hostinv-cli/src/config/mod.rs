//! Configuration management.

use anyhow::{Context as _, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::output::OutputFormat;

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Collector server address; `/upload-report` is appended.
    pub server_url: Option<String>,

    /// Reported machine name, instead of the hostname.
    pub machine_name: Option<String>,

    /// Query the Windows product catalog in addition to the registry.
    #[serde(default = "default_true")]
    pub query_product_catalog: bool,

    /// Budget for each package-manager or shell command, in seconds.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,

    /// Budget for the upload request, in seconds.
    #[serde(default = "default_upload_timeout")]
    pub upload_timeout_secs: u64,

    /// Default output format.
    pub output_format: Option<OutputFormat>,
}

const fn default_true() -> bool {
    true
}

const fn default_command_timeout() -> u64 {
    60
}

const fn default_upload_timeout() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: None,
            machine_name: None,
            query_product_catalog: default_true(),
            command_timeout_secs: default_command_timeout(),
            upload_timeout_secs: default_upload_timeout(),
            output_format: None,
        }
    }
}

/// Keys accepted by `hostinv config set`
pub const KEYS: &[(&str, &str)] = &[
    ("server_url", "Collector address, e.g. http://localhost:8080"),
    ("machine_name", "Machine name to report (empty to use the hostname)"),
    ("query_product_catalog", "Query the Windows product catalog (true/false)"),
    ("command_timeout_secs", "Timeout for package-manager commands"),
    ("upload_timeout_secs", "Timeout for the upload request"),
    ("output_format", "Default output format (pretty/json/csv/yaml)"),
];

impl Config {
    /// Get the config file path, honouring an explicit override.
    pub fn path(explicit: Option<&Path>) -> Result<PathBuf> {
        if let Some(path) = explicit {
            return Ok(path.to_path_buf());
        }
        let dirs = ProjectDirs::from("io", "hostinv", "hostinv")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;

        Ok(dirs.config_dir().join("config.toml"))
    }

    /// Load configuration from `path`; a missing file means defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let config: Self =
            toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))?;

        Ok(config)
    }

    /// Save configuration to `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Set one key from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let optional = |v: &str| {
            let v = v.trim();
            (!v.is_empty()).then(|| v.to_string())
        };

        match key {
            "server_url" | "server" => {
                if let Some(url) = optional(value) {
                    hostinv::client::upload_endpoint(&url)?;
                }
                self.server_url = optional(value);
            }
            "machine_name" => self.machine_name = optional(value),
            "query_product_catalog" | "catalog" => {
                self.query_product_catalog = value
                    .parse()
                    .with_context(|| format!("{key} must be true or false"))?;
            }
            "command_timeout_secs" => self.command_timeout_secs = parse_secs(key, value)?,
            "upload_timeout_secs" => self.upload_timeout_secs = parse_secs(key, value)?,
            "output_format" | "output" => self.output_format = Some(value.parse()?),
            _ => {
                let available: String = KEYS
                    .iter()
                    .map(|(name, help)| format!("\n  {name:<22} - {help}"))
                    .collect();
                anyhow::bail!("Unknown config key: {key}\n\nAvailable keys:{available}");
            }
        }
        Ok(())
    }

    /// Command timeout as a [`Duration`].
    #[must_use]
    pub const fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    /// Upload timeout as a [`Duration`].
    #[must_use]
    pub const fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<u64> {
    let secs: u64 = value
        .trim()
        .parse()
        .with_context(|| format!("{key} must be a whole number of seconds"))?;
    anyhow::ensure!(secs > 0, "{key} must be greater than zero");
    Ok(secs)
}
