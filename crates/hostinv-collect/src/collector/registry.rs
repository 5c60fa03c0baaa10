//! Registry access behind a trait, so the Windows collector can be exercised
//! with in-memory uninstall records on any host.

use chrono::NaiveDate;
use hostinv_core::{Bitness, Result, SoftwareEntry};
use std::collections::HashMap;

/// The three uninstall locations, in source-priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UninstallHive {
    /// `HKLM\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall`
    LocalMachine,
    /// `HKLM\SOFTWARE\Wow6432Node\...\Uninstall` (32-bit on 64-bit)
    LocalMachineWow64,
    /// `HKCU\SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall`
    CurrentUser,
}

impl UninstallHive {
    pub const ALL: [Self; 3] = [Self::LocalMachine, Self::LocalMachineWow64, Self::CurrentUser];

    /// Subkey path below the hive root
    #[must_use]
    pub const fn key_path(self) -> &'static str {
        match self {
            Self::LocalMachine | Self::CurrentUser => {
                r"SOFTWARE\Microsoft\Windows\CurrentVersion\Uninstall"
            }
            Self::LocalMachineWow64 => {
                r"SOFTWARE\Wow6432Node\Microsoft\Windows\CurrentVersion\Uninstall"
            }
        }
    }

    /// Returns true if the key must be opened in the 64-bit registry view.
    ///
    /// A 32-bit process is otherwise redirected from the native HKLM key to
    /// `Wow6432Node` and would read that hive twice.
    #[must_use]
    pub const fn needs_64bit_view(self) -> bool {
        matches!(self, Self::LocalMachine)
    }

    /// Short label for logs and errors
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::LocalMachine => "HKLM uninstall",
            Self::LocalMachineWow64 => "HKLM Wow6432Node uninstall",
            Self::CurrentUser => "HKCU uninstall",
        }
    }
}

/// Values read from one uninstall subkey
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UninstallRecord {
    pub display_name: Option<String>,
    pub display_version: Option<String>,
    pub publisher: Option<String>,
    pub install_date: Option<String>,
    pub install_location: Option<String>,
}

impl UninstallRecord {
    /// Record with just a display name
    #[must_use]
    pub fn named(display_name: impl Into<String>) -> Self {
        Self {
            display_name: Some(display_name.into()),
            ..Self::default()
        }
    }

    /// Convert to an entry; `None` when the display name is missing or blank
    #[must_use]
    pub fn into_entry(self, bitness: Bitness) -> Option<SoftwareEntry> {
        let name = self.display_name.filter(|n| !n.trim().is_empty())?;
        Some(SoftwareEntry {
            name,
            version: self.display_version.unwrap_or_default(),
            publisher: self.publisher.unwrap_or_default(),
            install_date: self.install_date.as_deref().and_then(parse_install_date),
            install_location: self.install_location.unwrap_or_default(),
            architecture: bitness.to_string(),
            raw_name: None,
        })
    }
}

/// Parse an `InstallDate` value, strictly `yyyyMMdd`
#[must_use]
pub fn parse_install_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

/// Read access to the uninstall keys and OS version
pub trait RegistrySource: Send + Sync {
    /// All subkeys under `hive`'s uninstall key. A missing key is empty, not an error.
    fn uninstall_records(&self, hive: UninstallHive) -> Result<Vec<UninstallRecord>>;

    /// `"<major> <build>"` from the `CurrentVersion` key
    fn os_version(&self) -> Result<String>;
}

/// In-memory registry contents
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    hives: HashMap<UninstallHive, std::result::Result<Vec<UninstallRecord>, String>>,
    os_version: Option<String>,
}

impl StaticRegistry {
    /// Empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Populate one hive
    #[must_use]
    pub fn with_hive(mut self, hive: UninstallHive, records: Vec<UninstallRecord>) -> Self {
        self.hives.insert(hive, Ok(records));
        self
    }

    /// Make one hive unreadable
    #[must_use]
    pub fn with_failing_hive(mut self, hive: UninstallHive, reason: impl Into<String>) -> Self {
        self.hives.insert(hive, Err(reason.into()));
        self
    }

    /// Set the reported OS version
    #[must_use]
    pub fn with_os_version(mut self, version: impl Into<String>) -> Self {
        self.os_version = Some(version.into());
        self
    }
}

impl RegistrySource for StaticRegistry {
    fn uninstall_records(&self, hive: UninstallHive) -> Result<Vec<UninstallRecord>> {
        match self.hives.get(&hive) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(reason)) => Err(hostinv_core::InventoryError::collection(hive.label(), reason)),
            None => Ok(Vec::new()),
        }
    }

    fn os_version(&self) -> Result<String> {
        self.os_version
            .clone()
            .ok_or_else(|| hostinv_core::InventoryError::collection("CurrentVersion", "not set"))
    }
}

#[cfg(windows)]
pub use system::WindowsRegistry;

#[cfg(windows)]
mod system {
    use super::{RegistrySource, UninstallHive, UninstallRecord};
    use hostinv_core::{InventoryError, Result};
    use std::io::ErrorKind;
    use tracing::debug;
    use winreg::enums::{HKEY_CURRENT_USER, HKEY_LOCAL_MACHINE, KEY_READ, KEY_WOW64_64KEY};
    use winreg::RegKey;

    const CURRENT_VERSION_KEY: &str = r"SOFTWARE\Microsoft\Windows NT\CurrentVersion";

    /// The live Windows registry
    #[derive(Debug, Clone, Copy, Default)]
    pub struct WindowsRegistry;

    impl RegistrySource for WindowsRegistry {
        fn uninstall_records(&self, hive: UninstallHive) -> Result<Vec<UninstallRecord>> {
            let root = match hive {
                UninstallHive::CurrentUser => RegKey::predef(HKEY_CURRENT_USER),
                _ => RegKey::predef(HKEY_LOCAL_MACHINE),
            };
            let flags = if hive.needs_64bit_view() {
                KEY_READ | KEY_WOW64_64KEY
            } else {
                KEY_READ
            };
            let key = match root.open_subkey_with_flags(hive.key_path(), flags) {
                Ok(key) => key,
                Err(e) if e.kind() == ErrorKind::NotFound => {
                    debug!(hive = hive.label(), "uninstall key not present");
                    return Ok(Vec::new());
                }
                Err(e) => return Err(InventoryError::collection(hive.label(), e)),
            };

            let mut records = Vec::new();
            for name in key.enum_keys() {
                let name = match name {
                    Ok(name) => name,
                    Err(e) => {
                        debug!(hive = hive.label(), error = %e, "skipping unreadable subkey name");
                        continue;
                    }
                };
                let Ok(subkey) = key.open_subkey_with_flags(&name, flags) else {
                    debug!(hive = hive.label(), subkey = %name, "skipping unopenable subkey");
                    continue;
                };
                records.push(UninstallRecord {
                    display_name: read_string(&subkey, "DisplayName"),
                    display_version: read_string(&subkey, "DisplayVersion"),
                    publisher: read_string(&subkey, "Publisher"),
                    install_date: read_string(&subkey, "InstallDate"),
                    install_location: read_string(&subkey, "InstallLocation"),
                });
            }
            Ok(records)
        }

        fn os_version(&self) -> Result<String> {
            let key = RegKey::predef(HKEY_LOCAL_MACHINE)
                .open_subkey_with_flags(CURRENT_VERSION_KEY, KEY_READ | KEY_WOW64_64KEY)
                .map_err(|e| InventoryError::collection("CurrentVersion", e))?;
            let major: u32 = key
                .get_value("CurrentMajorVersionNumber")
                .map_err(|e| InventoryError::collection("CurrentVersion", e))?;
            let build: String = key
                .get_value("CurrentBuildNumber")
                .map_err(|e| InventoryError::collection("CurrentVersion", e))?;
            Ok(format!("{major} {build}"))
        }
    }

    fn read_string(key: &RegKey, value: &str) -> Option<String> {
        key.get_value::<String, _>(value).ok()
    }
}
