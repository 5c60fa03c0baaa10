//! # hostinv-collect
//!
//! Local software inventory: what is installed, and on what kind of machine.
//!
//! ## Sources
//!
//! - **Windows**: the three `Uninstall` registry keys (HKLM, HKLM
//!   Wow6432Node, HKCU), then optionally the MSI product catalog
//! - **Linux**: `dpkg -l`, or `rpm -qa` when dpkg is absent
//!
//! ## Data Flow
//!
//! ```text
//! PlatformCollector::detect()            (once per process)
//!   -> collect()        raw SoftwareEntry batches, priority order
//!   -> InventoryAggregator               canonical name, first-seen wins
//!   -> system_facts()   OS, CPU, memory, disk, uptime, machine name
//!   -> Report
//! ```
//!
//! Every subprocess goes through a [`CommandRunner`], bounded by a timeout
//! and a [`CancellationToken`].

pub mod aggregate;
pub mod collector;
pub mod facts;
pub mod normalize;
pub mod runner;

pub use aggregate::{aggregate, InventoryAggregator};
pub use collector::{CollectorOptions, PlatformCollector};
pub use normalize::{normalize, Canonicalization};
pub use runner::{CannedRunner, CommandOutput, CommandRunner, SystemRunner};

use hostinv_core::{Report, Result};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Collect a complete report from `collector`.
///
/// Facts are gathered first; probe failures land in the facts instead of
/// failing the scan.
///
/// # Errors
///
/// Returns the collector's error when software collection fails outright,
/// or [`hostinv_core::InventoryError::Cancelled`].
pub async fn collect_report(
    collector: &PlatformCollector,
    cancel: &CancellationToken,
) -> Result<Report> {
    let facts = collector.system_facts(cancel).await?;
    let raw = collector.collect(cancel).await?;
    let raw_count = raw.len();

    let mut aggregator = InventoryAggregator::new(collector.canonicalization());
    aggregator.extend(raw);
    info!(
        platform = collector.platform_name(),
        raw = raw_count,
        kept = aggregator.len(),
        duplicates = aggregator.dropped(),
        "inventory aggregated"
    );

    Ok(Report::build(facts, aggregator.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::{LinuxCollector, StaticRegistry, UninstallHive, UninstallRecord, WindowsCollector};
    use hostinv_core::{Bitness, SystemFacts};
    use std::sync::Arc;

    #[tokio::test]
    async fn windows_report_is_normalized_and_deduplicated() {
        let registry = StaticRegistry::new()
            .with_os_version("10 19045")
            .with_hive(
                UninstallHive::LocalMachine,
                vec![
                    UninstallRecord::named("Foo Bar 1.2.3 (x64)"),
                    UninstallRecord::named("Microsoft Visual C++ 2019 X64 Minimum Runtime - 14.29.30133"),
                ],
            )
            .with_hive(
                UninstallHive::CurrentUser,
                vec![UninstallRecord::named("Foo Bar 1.2.4")],
            );
        let collector = PlatformCollector::Windows(
            WindowsCollector::new(Arc::new(registry), Arc::new(CannedRunner::new()))
                .query_catalog(false)
                .bitness(Bitness::Bit32),
        );

        let report = collect_report(&collector, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.software_count(), 2);
        let first = &report.installed_software[0];
        assert_eq!(first.name, "Foo Bar");
        assert_eq!(first.raw_name.as_deref(), Some("Foo Bar 1.2.3 (x64)"));
        assert_eq!(first.architecture, "32-bit");
        assert_eq!(
            report.installed_software[1].name,
            "Microsoft Visual C++ 2019 X64 Minimum Runtime"
        );
        assert_eq!(report.system_info.get(SystemFacts::OS_NAME), Some("Windows"));
        assert_eq!(report.system_info.get(SystemFacts::BIT_OS), Some("32-bit"));
    }

    #[tokio::test]
    async fn linux_report_keeps_package_names() {
        let runner = CannedRunner::new()
            .with_output(
                collector::linux::DPKG_PATH,
                "ii  xz-utils 5.4.1-0.2 amd64 XZ\nii  curl 7.88.1 amd64 tool\nii  curl 7.88.1 i386 tool\n",
            )
            .with_output(collector::linux::DF_PATH, "/dev/sda1 50G\n");
        let collector = PlatformCollector::Linux(LinuxCollector::new(Arc::new(runner)));

        let report = collect_report(&collector, &CancellationToken::new())
            .await
            .unwrap();

        let names: Vec<_> = report
            .installed_software
            .iter()
            .map(|e| e.name.as_str())
            .collect();
        assert_eq!(names, ["xz-utils", "curl"]);
        assert!(report.installed_software.iter().all(|e| e.raw_name.is_none()));
    }
}
