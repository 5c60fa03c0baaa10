//! hostinv - host software inventory agent
//!
//! Scans installed software, seals the report and sends it to a collector.

use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    hostinv_cli::run().await
}
