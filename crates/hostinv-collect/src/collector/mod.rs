//! Platform collectors, chosen once per process from the running OS.

pub mod linux;
pub mod registry;
pub mod windows;

pub use linux::{LinuxCollector, PackageManager};
pub use registry::{RegistrySource, StaticRegistry, UninstallHive, UninstallRecord};
pub use windows::WindowsCollector;

#[cfg(windows)]
pub use registry::WindowsRegistry;

use hostinv_core::{Result, SoftwareEntry, SystemFacts};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::normalize::Canonicalization;
use crate::runner::CommandRunner;

/// Knobs shared by every platform collector
#[derive(Debug, Clone)]
pub struct CollectorOptions {
    /// Also query the Windows product catalog (slow, can trigger MSI repairs)
    pub query_product_catalog: bool,
    /// Override for the `MachineName` fact
    pub machine_name: Option<String>,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            query_product_catalog: true,
            machine_name: None,
        }
    }
}

/// The inventory source for this host
pub enum PlatformCollector {
    Windows(WindowsCollector),
    Linux(LinuxCollector),
}

impl PlatformCollector {
    /// Pick the collector for the running OS
    ///
    /// # Errors
    ///
    /// Returns [`hostinv_core::InventoryError::UnsupportedPlatform`] on
    /// anything but Windows and Linux.
    pub fn detect(runner: Arc<dyn CommandRunner>, options: &CollectorOptions) -> Result<Self> {
        native(runner, options)
    }

    /// Raw entries from every source, highest priority first
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<Vec<SoftwareEntry>> {
        match self {
            Self::Windows(collector) => collector.collect(cancel).await,
            Self::Linux(collector) => collector.collect(cancel).await,
        }
    }

    /// Host facts; probe failures are recorded inside the facts
    pub async fn system_facts(&self, cancel: &CancellationToken) -> Result<SystemFacts> {
        match self {
            Self::Windows(collector) => Ok(collector.system_facts()),
            Self::Linux(collector) => collector.system_facts(cancel).await,
        }
    }

    /// How this platform's names are canonicalized before dedup
    #[must_use]
    pub const fn canonicalization(&self) -> Canonicalization {
        match self {
            Self::Windows(_) => Canonicalization::DisplayName,
            Self::Linux(_) => Canonicalization::PackageName,
        }
    }

    /// Short platform label for logs
    #[must_use]
    pub const fn platform_name(&self) -> &'static str {
        match self {
            Self::Windows(_) => "windows",
            Self::Linux(_) => "linux",
        }
    }
}

#[cfg(windows)]
fn native(runner: Arc<dyn CommandRunner>, options: &CollectorOptions) -> Result<PlatformCollector> {
    Ok(PlatformCollector::Windows(
        WindowsCollector::new(Arc::new(WindowsRegistry), runner)
            .query_catalog(options.query_product_catalog)
            .machine_name(options.machine_name.clone()),
    ))
}

#[cfg(target_os = "linux")]
fn native(runner: Arc<dyn CommandRunner>, options: &CollectorOptions) -> Result<PlatformCollector> {
    Ok(PlatformCollector::Linux(
        LinuxCollector::new(runner).machine_name(options.machine_name.clone()),
    ))
}

#[cfg(not(any(windows, target_os = "linux")))]
fn native(_runner: Arc<dyn CommandRunner>, _options: &CollectorOptions) -> Result<PlatformCollector> {
    Err(hostinv_core::InventoryError::UnsupportedPlatform(
        std::env::consts::OS.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CannedRunner;

    #[test]
    fn canonicalization_follows_platform() {
        let runner: Arc<dyn CommandRunner> = Arc::new(CannedRunner::new());
        let linux = PlatformCollector::Linux(LinuxCollector::new(runner.clone()));
        let windows = PlatformCollector::Windows(WindowsCollector::new(
            Arc::new(StaticRegistry::new()),
            runner,
        ));
        assert_eq!(linux.canonicalization(), Canonicalization::PackageName);
        assert_eq!(windows.canonicalization(), Canonicalization::DisplayName);
        assert_eq!(windows.platform_name(), "windows");
    }

    #[cfg(any(windows, target_os = "linux"))]
    #[test]
    fn detects_supported_host() {
        let collector =
            PlatformCollector::detect(Arc::new(CannedRunner::new()), &CollectorOptions::default())
                .unwrap();
        assert_eq!(collector.platform_name(), std::env::consts::OS);
    }

    #[tokio::test]
    async fn dispatches_collect() {
        let runner = CannedRunner::new().with_output(
            linux::DPKG_PATH,
            "ii  curl 7.68.0-1ubuntu2 amd64 command line tool\n",
        );
        let collector = PlatformCollector::Linux(LinuxCollector::new(Arc::new(runner)));
        let entries = collector.collect(&CancellationToken::new()).await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "curl");
    }
}
