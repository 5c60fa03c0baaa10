//! `hostinv config` - CLI configuration management.

use anyhow::Result;
use colored::Colorize;

use super::Context;
use crate::cli::args::{ConfigArgs, ConfigCommands};
use crate::config::Config;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show => show_config(&ctx),
        ConfigCommands::Set { key, value } => set_config(&ctx, &key, &value),
        ConfigCommands::Path => {
            println!("{}", ctx.config_path.display());
            Ok(())
        }
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    let config = &ctx.config;

    match ctx.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            print!("{}", serde_yaml::to_string(config)?);
        }
        _ => {
            println!("{}", "Current Configuration:".bold());
            println!();

            let unset = || "(not set)".dimmed().to_string();
            println!(
                "  {} {}",
                "server_url:".bold(),
                config.server_url.clone().unwrap_or_else(unset)
            );
            println!(
                "  {} {}",
                "machine_name:".bold(),
                config.machine_name.clone().unwrap_or_else(unset)
            );
            println!(
                "  {} {}",
                "query_product_catalog:".bold(),
                config.query_product_catalog
            );
            println!(
                "  {} {}s",
                "command_timeout_secs:".bold(),
                config.command_timeout_secs
            );
            println!(
                "  {} {}s",
                "upload_timeout_secs:".bold(),
                config.upload_timeout_secs
            );
            println!(
                "  {} {}",
                "output_format:".bold(),
                config.output_format.unwrap_or_default()
            );
        }
    }

    Ok(())
}

fn set_config(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config: Config = ctx.config.clone();
    config.set(key, value)?;
    config.save(&ctx.config_path)?;

    println!(
        "{} {} set to {}.",
        "Success:".green().bold(),
        key,
        value.cyan()
    );
    Ok(())
}
