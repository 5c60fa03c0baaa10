//! Linux inventory through the system package manager.

use hostinv_core::{Bitness, InventoryError, Result, SoftwareEntry, SystemFacts};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::facts::{host_bitness, insert_common_facts, parse_os_release};
use crate::runner::CommandRunner;

/// Debian package database front end
pub const DPKG_PATH: &str = "/usr/bin/dpkg";
/// RPM package database front end
pub const RPM_PATH: &str = "/usr/bin/rpm";
/// Disk usage report
pub const DF_PATH: &str = "/bin/df";

/// Passed to rpm as a single argument; no shell is involved, so no quoting.
const RPM_QUERY_FORMAT: &str = "%{NAME}\t%{VERSION}\t%{VENDOR}\t%{ARCH}\n";

const OS_RELEASE_PATH: &str = "/etc/os-release";
const KERNEL_RELEASE_PATH: &str = "/proc/sys/kernel/osrelease";

/// A supported package manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Dpkg,
    Rpm,
}

impl PackageManager {
    /// Absolute path of the binary
    #[must_use]
    pub const fn program(self) -> &'static str {
        match self {
            Self::Dpkg => DPKG_PATH,
            Self::Rpm => RPM_PATH,
        }
    }

    /// Arguments listing every installed package
    #[must_use]
    pub const fn args(self) -> &'static [&'static str] {
        match self {
            Self::Dpkg => &["-l"],
            Self::Rpm => &["-qa", "--queryformat", RPM_QUERY_FORMAT],
        }
    }

    /// Parse the listing produced by [`Self::args`]
    #[must_use]
    pub fn parse(self, stdout: &str, bitness: Bitness) -> Vec<SoftwareEntry> {
        match self {
            Self::Dpkg => parse_dpkg_list(stdout, bitness),
            Self::Rpm => parse_rpm_query(stdout, bitness),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Dpkg => "dpkg",
            Self::Rpm => "rpm",
        }
    }
}

/// Collects installed packages and host facts on Linux
pub struct LinuxCollector {
    runner: Arc<dyn CommandRunner>,
    bitness: Bitness,
    machine_name: Option<String>,
}

impl LinuxCollector {
    /// Create a collector that runs commands through `runner`
    #[must_use]
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            runner,
            bitness: host_bitness(),
            machine_name: None,
        }
    }

    /// Override the reported bitness
    #[must_use]
    pub const fn bitness(mut self, bitness: Bitness) -> Self {
        self.bitness = bitness;
        self
    }

    /// Override the `MachineName` fact
    #[must_use]
    pub fn machine_name(mut self, name: Option<String>) -> Self {
        self.machine_name = name;
        self
    }

    /// First available package manager, dpkg preferred
    ///
    /// # Errors
    ///
    /// Returns [`InventoryError::UnsupportedPlatform`] if neither is installed.
    pub fn detect_package_manager(&self) -> Result<PackageManager> {
        [PackageManager::Dpkg, PackageManager::Rpm]
            .into_iter()
            .find(|pm| self.runner.exists(pm.program()))
            .ok_or_else(|| {
                InventoryError::UnsupportedPlatform(format!(
                    "linux without {DPKG_PATH} or {RPM_PATH}"
                ))
            })
    }

    /// List installed packages.
    ///
    /// A non-zero exit is tolerated as long as the package manager printed
    /// something; the full output is read before parsing.
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<Vec<SoftwareEntry>> {
        let manager = self.detect_package_manager()?;
        debug!(manager = manager.name(), "listing installed packages");

        let output = self
            .runner
            .run(manager.program(), manager.args(), cancel)
            .await?;

        if !output.success() {
            if !output.has_output() {
                return Err(InventoryError::collection(
                    manager.name(),
                    format!("exited with {:?} and no output", output.exit_code),
                ));
            }
            warn!(
                manager = manager.name(),
                exit_code = ?output.exit_code,
                "package manager exited non-zero, parsing partial output"
            );
        }

        let entries = manager.parse(&output.stdout, self.bitness);
        info!(manager = manager.name(), count = entries.len(), "collected linux packages");
        Ok(entries)
    }

    /// Distribution, kernel, CPU, memory, disk and uptime facts.
    ///
    /// Each failed probe is recorded under the `Error` key. Only cancellation
    /// is returned as an error.
    pub async fn system_facts(&self, cancel: &CancellationToken) -> Result<SystemFacts> {
        let mut facts = SystemFacts::new();

        match std::fs::read_to_string(OS_RELEASE_PATH) {
            Ok(content) => {
                let release = parse_os_release(&content);
                if let Some(name) = release.pretty_name {
                    facts.insert(SystemFacts::OS_NAME, name);
                }
                if let Some(id) = release.version_id {
                    facts.insert(SystemFacts::OS_VERSION_ID, id);
                }
            }
            Err(e) => facts.record_error("OS info", e),
        }

        match std::fs::read_to_string(KERNEL_RELEASE_PATH) {
            Ok(release) => facts.insert(SystemFacts::OS_VERSION, release.trim()),
            Err(e) => facts.record_error("kernel version", e),
        }

        hardware_facts(&mut facts);

        match self.runner.run(DF_PATH, &["-h"], cancel).await {
            Ok(output) if output.has_output() => {
                facts.insert(SystemFacts::DISK_INFO, output.stdout.trim_end());
            }
            Ok(output) => facts.record_error(
                "disk info",
                format!("df exited with {:?} and no output", output.exit_code),
            ),
            Err(InventoryError::Cancelled) => return Err(InventoryError::Cancelled),
            Err(e) => facts.record_error("disk info", e),
        }

        insert_common_facts(&mut facts, self.bitness, self.machine_name.as_deref());
        Ok(facts)
    }
}

#[cfg(target_os = "linux")]
fn hardware_facts(facts: &mut SystemFacts) {
    use crate::facts::{format_kib, format_uptime};
    use procfs::prelude::*;

    match procfs::CpuInfo::current() {
        Ok(cpu) => {
            if let Some(model) = cpu.model_name(0) {
                facts.insert(SystemFacts::PROCESSOR, model);
            }
            facts.insert(SystemFacts::PROCESSOR_CORES, cpu.num_cores().to_string());
        }
        Err(e) => facts.record_error("CPU info", e),
    }

    match procfs::Meminfo::current() {
        Ok(mem) => {
            facts.insert(SystemFacts::TOTAL_MEMORY, format_kib(mem.mem_total));
            facts.insert(SystemFacts::FREE_MEMORY, format_kib(mem.mem_free));
        }
        Err(e) => facts.record_error("memory info", e),
    }

    match procfs::Uptime::current() {
        Ok(uptime) => {
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let seconds = uptime.uptime as u64;
            facts.insert(SystemFacts::UPTIME, format_uptime(seconds));
        }
        Err(e) => facts.record_error("uptime", e),
    }
}

#[cfg(not(target_os = "linux"))]
fn hardware_facts(facts: &mut SystemFacts) {
    facts.record_error("hardware info", "/proc is not available on this host");
}

/// Parse `dpkg -l` output.
///
/// Only rows whose status starts exactly with `"ii "` are installed packages.
/// The fourth column is the package architecture; it lands in `publisher`.
#[must_use]
pub fn parse_dpkg_list(stdout: &str, bitness: Bitness) -> Vec<SoftwareEntry> {
    stdout
        .lines()
        .filter(|line| line.starts_with("ii "))
        .filter_map(|line| {
            let columns: Vec<&str> = line.split_whitespace().collect();
            if columns.len() < 4 {
                debug!(line, "skipping short dpkg row");
                return None;
            }
            Some(
                SoftwareEntry::new(columns[1])
                    .with_version(columns[2])
                    .with_publisher(columns[3])
                    .with_architecture(bitness),
            )
        })
        .collect()
}

/// Parse tab-separated `rpm -qa --queryformat` output
#[must_use]
pub fn parse_rpm_query(stdout: &str, bitness: Bitness) -> Vec<SoftwareEntry> {
    stdout
        .lines()
        .filter_map(|line| {
            let columns: Vec<&str> = line.split('\t').collect();
            if columns.len() < 4 || columns[0].trim().is_empty() {
                return None;
            }
            Some(
                SoftwareEntry::new(columns[0].trim())
                    .with_version(columns[1].trim())
                    .with_publisher(columns[2].trim())
                    .with_architecture(bitness),
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::CannedRunner;

    const DPKG_OUTPUT: &str = "\
Desired=Unknown/Install/Remove/Purge/Hold
| Status=Not/Inst/Conf-files/Unpacked/halF-conf/Half-inst/trig-aWait/Trig-pend
|/ Err?=(none)/Reinst-required (Status,Err: uppercase=bad)
||/ Name           Version          Architecture Description
+++-==============-================-============-=================================
ii  curl           7.68.0-1ubuntu2  amd64        command line tool for transferring data with URL syntax
rc  oldpkg         1.0-1            amd64        removed but config files remain
ii  tzdata         2024a-0ubuntu0   all          time zone and daylight-saving time data
ii  broken
";

    fn collector(runner: CannedRunner) -> LinuxCollector {
        LinuxCollector::new(Arc::new(runner)).bitness(Bitness::Bit64)
    }

    #[test]
    fn dpkg_rows() {
        let entries = parse_dpkg_list(DPKG_OUTPUT, Bitness::Bit64);
        assert_eq!(entries.len(), 2);

        let curl = &entries[0];
        assert_eq!(curl.name, "curl");
        assert_eq!(curl.version, "7.68.0-1ubuntu2");
        assert_eq!(curl.publisher, "amd64");
        assert_eq!(curl.architecture, "64-bit");
        assert_eq!(curl.install_date, None);

        assert_eq!(entries[1].name, "tzdata");
        assert_eq!(entries[1].publisher, "all");
    }

    #[test]
    fn dpkg_requires_exact_status_prefix() {
        let entries = parse_dpkg_list(" ii  curl 1.0 amd64 x\niiU vim 9 amd64 x\n", Bitness::Bit64);
        assert!(entries.is_empty());
    }

    #[test]
    fn rpm_rows() {
        let out = "bash\t5.2.15\tRed Hat, Inc.\tx86_64\nshort\t1.0\n\t\t\t\nkernel\t6.5.6\t\tx86_64\n";
        let entries = parse_rpm_query(out, Bitness::Bit64);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "bash");
        assert_eq!(entries[0].version, "5.2.15");
        assert_eq!(entries[0].publisher, "Red Hat, Inc.");
        assert_eq!(entries[1].name, "kernel");
        assert_eq!(entries[1].publisher, "");
    }

    #[test]
    fn rpm_format_is_unquoted() {
        let args = PackageManager::Rpm.args();
        assert_eq!(args[0], "-qa");
        assert!(!args[2].starts_with('\''));
        assert!(args[2].ends_with('\n'));
    }

    #[test]
    fn dpkg_is_preferred() {
        let runner = CannedRunner::new()
            .with_output(RPM_PATH, "")
            .with_output(DPKG_PATH, "");
        assert_eq!(
            collector(runner).detect_package_manager().unwrap(),
            PackageManager::Dpkg
        );

        let runner = CannedRunner::new().with_output(RPM_PATH, "");
        assert_eq!(
            collector(runner).detect_package_manager().unwrap(),
            PackageManager::Rpm
        );
    }

    #[tokio::test]
    async fn no_package_manager_is_unsupported() {
        let err = collector(CannedRunner::new())
            .collect(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::UnsupportedPlatform(_)));
    }

    #[tokio::test]
    async fn collects_through_dpkg() {
        let runner = CannedRunner::new().with_output(DPKG_PATH, DPKG_OUTPUT);
        let entries = collector(runner)
            .collect(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn non_zero_exit_with_output_is_tolerated() {
        let runner = CannedRunner::new().with_exit(DPKG_PATH, DPKG_OUTPUT, 1);
        let entries = collector(runner)
            .collect(&CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[tokio::test]
    async fn non_zero_exit_without_output_fails() {
        let runner = CannedRunner::new().with_exit(RPM_PATH, "", 1);
        let err = collector(runner)
            .collect(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, InventoryError::Collection { .. }));
    }

    #[tokio::test]
    async fn execution_failure_is_collection_error() {
        let runner = CannedRunner::new().with_failure(DPKG_PATH, "permission denied");
        let err = collector(runner)
            .collect(&CancellationToken::new())
            .await
            .unwrap_err();
        assert!(err.degrades_cycle());
    }

    #[tokio::test]
    async fn facts_include_disk_and_machine_name() {
        let runner = CannedRunner::new().with_output(
            DF_PATH,
            "Filesystem Size Used Avail Use% Mounted on\n/dev/sda1 50G 20G 30G 40% /\n",
        );
        let facts = collector(runner)
            .machine_name(Some("build-7".into()))
            .system_facts(&CancellationToken::new())
            .await
            .unwrap();
        assert!(facts
            .get(SystemFacts::DISK_INFO)
            .is_some_and(|d| d.contains("/dev/sda1")));
        assert_eq!(facts.get(SystemFacts::MACHINE_NAME), Some("build-7"));
        assert_eq!(facts.get(SystemFacts::BIT_OS), Some("64-bit"));
    }

    #[tokio::test]
    async fn failed_disk_probe_is_recorded() {
        let facts = collector(CannedRunner::new())
            .system_facts(&CancellationToken::new())
            .await
            .unwrap();
        assert!(facts.has_errors());
        assert!(facts
            .get(SystemFacts::ERROR)
            .is_some_and(|e| e.contains("disk info")));
    }

    #[tokio::test]
    async fn facts_honour_cancellation() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let runner = CannedRunner::new().with_output(DF_PATH, "x");
        let err = collector(runner).system_facts(&cancel).await.unwrap_err();
        assert!(matches!(err, InventoryError::Cancelled));
    }
}
