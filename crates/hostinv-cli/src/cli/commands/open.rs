//! `hostinv open` - decrypt a sealed envelope file.

use anyhow::{Context as _, Result};
use hostinv::{PassphraseKey, Report, SecureChannel};

use super::Context;
use crate::cli::args::OpenArgs;
use crate::output::print_report;

pub async fn execute(ctx: Context, args: OpenArgs) -> Result<()> {
    let bytes = tokio::fs::read(&args.file)
        .await
        .with_context(|| format!("reading {}", args.file.display()))?;

    let key = args
        .passphrase
        .map_or_else(PassphraseKey::default, PassphraseKey::new);
    let channel = SecureChannel::from_provider(&key)?;

    let plaintext = channel.open(&bytes)?;
    let report = Report::from_json_slice(&plaintext)
        .context("envelope opened but does not hold an inventory report")?;

    print_report(&report, ctx.output_format)
}
