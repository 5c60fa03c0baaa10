//! `hostinv scan` - collect and print the inventory report.

use anyhow::Result;

use super::{ctrl_c_token, Context};
use crate::cli::args::ScanArgs;
use crate::output::print_report;

pub async fn execute(ctx: Context, args: ScanArgs) -> Result<()> {
    let agent = ctx.agent(&args.collect, None)?;
    let report = agent.scan(&ctrl_c_token()).await?;
    print_report(&report, ctx.output_format)
}
