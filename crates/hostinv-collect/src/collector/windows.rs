//! Windows inventory: registry uninstall keys plus the MSI product catalog.

use hostinv_core::{Bitness, InventoryError, Result, SoftwareEntry, SystemFacts};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::registry::{RegistrySource, UninstallHive, UninstallRecord};
use crate::facts::{host_bitness, insert_common_facts};
use crate::runner::CommandRunner;

/// Shell used for the product-catalog CIM query
pub const POWERSHELL: &str = "powershell";

/// Redirected stdout defaults to the OEM code page; force UTF-8 so
/// non-ASCII product names survive decoding.
const CATALOG_QUERY: &str = "[Console]::OutputEncoding = [System.Text.Encoding]::UTF8; \
     Get-CimInstance -ClassName Win32_Product | \
     Select-Object Name,Version,Vendor,InstallDate,InstallLocation | \
     ConvertTo-Json -Compress";

const CATALOG_SOURCE: &str = "product catalog";

/// Collects from the three uninstall hives, then optionally the catalog.
///
/// Entries come back in source-priority order (hives first, catalog last)
/// with their raw display names; the aggregator normalizes and dedups.
pub struct WindowsCollector {
    registry: Arc<dyn RegistrySource>,
    runner: Arc<dyn CommandRunner>,
    query_catalog: bool,
    bitness: Bitness,
    machine_name: Option<String>,
}

impl WindowsCollector {
    /// Create a collector over the given registry and command runner
    #[must_use]
    pub fn new(registry: Arc<dyn RegistrySource>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            registry,
            runner,
            query_catalog: true,
            bitness: host_bitness(),
            machine_name: None,
        }
    }

    /// Enable or skip the product-catalog query
    #[must_use]
    pub const fn query_catalog(mut self, enabled: bool) -> Self {
        self.query_catalog = enabled;
        self
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

    /// Gather raw entries from every source.
    ///
    /// A failing source is logged and skipped. Only when every attempted
    /// source fails does this return [`InventoryError::Collection`].
    pub async fn collect(&self, cancel: &CancellationToken) -> Result<Vec<SoftwareEntry>> {
        let mut entries = Vec::new();
        let mut attempted = 0usize;
        let mut failed = 0usize;

        for hive in UninstallHive::ALL {
            if cancel.is_cancelled() {
                return Err(InventoryError::Cancelled);
            }
            attempted += 1;
            match self.registry.uninstall_records(hive) {
                Ok(records) => {
                    let before = entries.len();
                    entries.extend(self.to_entries(records));
                    debug!(hive = hive.label(), count = entries.len() - before, "read uninstall key");
                }
                Err(e) => {
                    failed += 1;
                    warn!(hive = hive.label(), error = %e, "skipping unreadable uninstall key");
                }
            }
        }

        if self.query_catalog {
            attempted += 1;
            match self.query_product_catalog(cancel).await {
                Ok(records) => {
                    let before = entries.len();
                    entries.extend(self.to_entries(records));
                    debug!(count = entries.len() - before, "read product catalog");
                }
                Err(InventoryError::Cancelled) => return Err(InventoryError::Cancelled),
                Err(e) => {
                    failed += 1;
                    warn!(error = %e, "product catalog query failed, keeping registry entries");
                }
            }
        }

        if failed == attempted {
            return Err(InventoryError::collection(
                "windows inventory",
                "every registry hive and the product catalog failed",
            ));
        }

        info!(count = entries.len(), failed, "collected windows software");
        Ok(entries)
    }

    /// OS name, version, bitness and machine name
    pub fn system_facts(&self) -> SystemFacts {
        let mut facts = SystemFacts::new();
        facts.insert(SystemFacts::OS_NAME, "Windows");
        match self.registry.os_version() {
            Ok(version) => facts.insert(SystemFacts::OS_VERSION, version),
            Err(e) => facts.record_error("OS version", e),
        }
        insert_common_facts(&mut facts, self.bitness, self.machine_name.as_deref());
        facts
    }

    async fn query_product_catalog(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<UninstallRecord>> {
        let output = self
            .runner
            .run(
                POWERSHELL,
                &["-NoProfile", "-NonInteractive", "-Command", CATALOG_QUERY],
                cancel,
            )
            .await?;
        if !output.success() && !output.has_output() {
            return Err(InventoryError::collection(
                CATALOG_SOURCE,
                format!("query exited with {:?} and no output", output.exit_code),
            ));
        }
        parse_catalog_json(&output.stdout)
    }

    fn to_entries(&self, records: Vec<UninstallRecord>) -> impl Iterator<Item = SoftwareEntry> + '_ {
        records
            .into_iter()
            .filter_map(move |record| record.into_entry(self.bitness))
    }
}

/// Parse `ConvertTo-Json` output of the catalog query.
///
/// PowerShell emits a bare object for a single result and an array
/// otherwise; empty output means no products.
pub fn parse_catalog_json(raw: &str) -> Result<Vec<UninstallRecord>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(Vec::new());
    }
    let value: Value =
        serde_json::from_str(raw).map_err(|e| InventoryError::collection(CATALOG_SOURCE, e))?;

    let products = match value {
        Value::Array(items) => items,
        Value::Null => Vec::new(),
        single => vec![single],
    };

    Ok(products
        .iter()
        .map(|product| UninstallRecord {
            display_name: string_field(product, "Name"),
            display_version: string_field(product, "Version"),
            publisher: string_field(product, "Vendor"),
            install_date: string_field(product, "InstallDate"),
            install_location: string_field(product, "InstallLocation"),
        })
        .collect())
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
