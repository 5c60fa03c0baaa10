//! Output formatting for different formats.

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use hostinv::{Report, SoftwareEntry, SystemFacts};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::str::FromStr;
use tabled::{settings::Style, Table, Tabled};

/// Available output formats.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Pretty-printed tables with colors
    #[default]
    Pretty,
    /// JSON output
    Json,
    /// CSV output (software list only)
    Csv,
    /// YAML output
    Yaml,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" | "table" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            "csv" => Ok(Self::Csv),
            "yaml" | "yml" => Ok(Self::Yaml),
            _ => anyhow::bail!(
                "Unknown output format: {s}\n\
                 Valid formats: pretty, json, csv, yaml"
            ),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pretty => write!(f, "pretty"),
            Self::Json => write!(f, "json"),
            Self::Csv => write!(f, "csv"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

#[derive(Tabled, Serialize)]
struct SoftwareRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Publisher")]
    publisher: String,
    #[tabled(rename = "Installed")]
    install_date: String,
    #[tabled(skip)]
    install_location: String,
    #[tabled(rename = "Arch")]
    architecture: String,
}

impl From<&SoftwareEntry> for SoftwareRow {
    fn from(entry: &SoftwareEntry) -> Self {
        Self {
            name: entry.name.clone(),
            version: entry.version.clone(),
            publisher: entry.publisher.clone(),
            install_date: entry
                .install_date
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
            install_location: entry.install_location.clone(),
            architecture: entry.architecture.clone(),
        }
    }
}

#[derive(Tabled)]
struct FactRow {
    #[tabled(rename = "Fact")]
    key: String,
    #[tabled(rename = "Value")]
    value: String,
}

/// Write `report` to `out` in `format`.
pub fn write_report(out: &mut impl Write, report: &Report, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            out.write_all(&report.to_json_bytes()?)?;
            writeln!(out)?;
        }
        OutputFormat::Yaml => {
            write!(out, "{}", serde_yaml::to_string(report)?)?;
        }
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            for entry in &report.installed_software {
                writer.serialize(SoftwareRow::from(entry))?;
            }
            writer.flush()?;
        }
        OutputFormat::Pretty => write_report_pretty(out, report)?,
    }
    Ok(())
}

/// Print `report` to stdout in `format`.
pub fn print_report(report: &Report, format: OutputFormat) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_report(&mut lock, report, format)
}

fn write_report_pretty(out: &mut impl Write, report: &Report) -> Result<()> {
    writeln!(out, "{}", "System:".bold().underline())?;
    writeln!(out, "{}", facts_table(&report.system_info))?;
    if let Some(error) = report.system_info.get(SystemFacts::ERROR) {
        writeln!(out, "{} {}", "Warning:".yellow().bold(), error)?;
    }
    writeln!(out)?;

    writeln!(
        out,
        "{} {}",
        "Installed software:".bold().underline(),
        report.software_count().to_string().cyan()
    )?;
    if report.installed_software.is_empty() {
        writeln!(out, "{}", "(none found)".dimmed())?;
        return Ok(());
    }

    let rows: Vec<SoftwareRow> = report.installed_software.iter().map(SoftwareRow::from).collect();
    let table = Table::new(&rows).with(Style::rounded()).to_string();
    writeln!(out, "{table}")?;
    Ok(())
}

fn facts_table(facts: &SystemFacts) -> String {
    let rows: Vec<FactRow> = facts
        .iter()
        .filter(|(key, _)| *key != SystemFacts::ERROR)
        .map(|(key, value)| FactRow {
            key: key.to_string(),
            value: value.to_string(),
        })
        .collect();
    Table::new(&rows).with(Style::rounded()).to_string()
}
