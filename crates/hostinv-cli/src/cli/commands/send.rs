//! `hostinv send` - run a full cycle and upload the sealed report.

use anyhow::Result;
use colored::Colorize;
use hostinv::{Agent, CancellationToken, CycleFailure, Report, RetryConfig, UploadReceipt};
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use tracing::warn;

use super::{ctrl_c_token, Context};
use crate::cli::args::SendArgs;
use crate::output::OutputFormat;

pub async fn execute(ctx: Context, args: SendArgs) -> Result<()> {
    let server = ctx.require_server()?.to_string();
    let agent = ctx.agent(&args.collect, Some(&server))?;
    let cancel = ctrl_c_token();
    let retry = RetryConfig::new().max_retries(args.retries);

    match agent.run_cycle(&cancel).await {
        Ok(outcome) => print_delivery(
            &ctx,
            &Delivery {
                receipt: &outcome.receipt,
                envelope_bytes: outcome.envelope_len,
                software_count: outcome.report.software_count(),
            },
        ),
        Err(failure) => {
            let envelope_bytes = failure.envelope.as_ref().map_or(0, Vec::len);
            let software_count = failure
                .report
                .as_deref()
                .and_then(|r| Report::from_json_slice(r.as_bytes()).ok())
                .map_or(0, |r| r.software_count());

            match retry_delivery(&agent, failure, &retry, &cancel).await {
                Ok(receipt) => print_delivery(
                    &ctx,
                    &Delivery {
                        receipt: &receipt,
                        envelope_bytes,
                        software_count,
                    },
                ),
                Err(failure) => {
                    // The report is still worth seeing when delivery fails.
                    if let Some(report) = &failure.report {
                        println!("{report}");
                    }
                    Err(failure.into())
                }
            }
        }
    }
}

struct Delivery<'a> {
    receipt: &'a UploadReceipt,
    envelope_bytes: usize,
    software_count: usize,
}

/// Re-send the sealed envelope while the policy allows it.
async fn retry_delivery(
    agent: &Agent,
    mut failure: CycleFailure,
    retry: &RetryConfig,
    cancel: &CancellationToken,
) -> std::result::Result<UploadReceipt, CycleFailure> {
    let Some(envelope) = failure.envelope.clone() else {
        return Err(failure);
    };

    let mut attempt = 0;
    while retry.should_retry(&failure.error, attempt) {
        let backoff = retry.backoff_for(attempt);
        warn!(
            attempt = attempt + 1,
            max = retry.max_retries,
            backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
            error = %failure.error,
            "retrying report delivery"
        );
        tokio::select! {
            () = cancel.cancelled() => return Err(failure),
            () = tokio::time::sleep(backoff) => {}
        }

        match agent.deliver(envelope.clone(), cancel).await {
            Ok(receipt) => return Ok(receipt),
            Err(error) => failure.error = error,
        }
        attempt += 1;
    }
    Err(failure)
}

fn print_delivery(ctx: &Context, delivery: &Delivery<'_>) -> Result<()> {
    let stdout = std::io::stdout();
    let mut lock = stdout.lock();
    write_delivery(&mut lock, delivery, ctx.output_format)
}

/// One CSV row per upload
#[derive(Serialize)]
struct DeliveryRow {
    status: u16,
    envelope_bytes: usize,
    software_count: usize,
}

fn write_delivery(
    out: &mut impl Write,
    delivery: &Delivery<'_>,
    format: OutputFormat,
) -> Result<()> {
    let UploadReceipt { status, body } = delivery.receipt;
    let summary = || {
        json!({
            "status": status,
            "response": body,
            "envelope_bytes": delivery.envelope_bytes,
            "software_count": delivery.software_count,
        })
    };

    match format {
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&summary())?)?,
        OutputFormat::Yaml => write!(out, "{}", serde_yaml::to_string(&summary())?)?,
        OutputFormat::Csv => {
            let mut writer = csv::Writer::from_writer(out);
            writer.serialize(DeliveryRow {
                status: *status,
                envelope_bytes: delivery.envelope_bytes,
                software_count: delivery.software_count,
            })?;
            writer.flush()?;
        }
        OutputFormat::Pretty => {
            writeln!(
                out,
                "{} {} entries sealed into {} bytes, server answered {}",
                "Uploaded:".green().bold(),
                delivery.software_count.to_string().cyan(),
                delivery.envelope_bytes,
                status.to_string().cyan()
            )?;
            if !body.is_empty() {
                writeln!(out)?;
                writeln!(out, "{body}")?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(format: OutputFormat) -> String {
        let receipt = UploadReceipt {
            status: 200,
            body: "stored, thanks".into(),
        };
        let delivery = Delivery {
            receipt: &receipt,
            envelope_bytes: 1_532,
            software_count: 41,
        };
        let mut out = Vec::new();
        write_delivery(&mut out, &delivery, format).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn csv_delivery_has_header_and_row() {
        assert_eq!(
            render(OutputFormat::Csv),
            "status,envelope_bytes,software_count\n200,1532,41\n"
        );
    }

    #[test]
    fn json_delivery_carries_server_response() {
        let value: serde_json::Value = serde_json::from_str(&render(OutputFormat::Json)).unwrap();
        assert_eq!(value["status"], 200);
        assert_eq!(value["response"], "stored, thanks");
        assert_eq!(value["software_count"], 41);
    }
}
