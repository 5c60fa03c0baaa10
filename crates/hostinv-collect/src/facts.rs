//! Host fact probes shared by the platform collectors.

use hostinv_core::{Bitness, SystemFacts};
use tracing::debug;

/// Operating-system bitness of this host.
///
/// On Windows a 32-bit process on a 64-bit OS sees the real machine in
/// `PROCESSOR_ARCHITEW6432`.
#[must_use]
pub fn host_bitness() -> Bitness {
    if cfg!(windows) {
        for var in ["PROCESSOR_ARCHITEW6432", "PROCESSOR_ARCHITECTURE"] {
            if let Ok(arch) = std::env::var(var) {
                return Bitness::from_arch(&arch);
            }
        }
    }
    Bitness::from_arch(std::env::consts::ARCH)
}

/// Machine name: the configured override, else the hostname
#[must_use]
pub fn machine_name(configured: Option<&str>) -> String {
    if let Some(name) = configured.map(str::trim).filter(|n| !n.is_empty()) {
        return name.to_string();
    }
    hostname::get().map_or_else(
        |_| "unknown".to_string(),
        |h| h.to_string_lossy().into_owned(),
    )
}

/// Facts every platform reports; `bitness` is the collector's view of the host
pub fn insert_common_facts(
    facts: &mut SystemFacts,
    bitness: Bitness,
    configured_name: Option<&str>,
) {
    facts.insert(SystemFacts::BIT_OS, bitness.as_str());
    facts.insert(SystemFacts::MACHINE_NAME, machine_name(configured_name));
}

/// Fields of interest from `/etc/os-release`
#[derive(Debug, Default, PartialEq, Eq)]
pub struct OsRelease {
    pub pretty_name: Option<String>,
    pub version_id: Option<String>,
}

/// Parse `/etc/os-release` content
#[must_use]
pub fn parse_os_release(content: &str) -> OsRelease {
    let mut release = OsRelease::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        match key.trim() {
            "PRETTY_NAME" => release.pretty_name = Some(value.to_string()),
            "VERSION_ID" => release.version_id = Some(value.to_string()),
            _ => {}
        }
    }
    debug!(?release, "parsed os-release");
    release
}

/// Render an uptime in seconds the way `uptime` does
#[must_use]
pub fn format_uptime(seconds: u64) -> String {
    let days = seconds / 86_400;
    let hours = (seconds % 86_400) / 3_600;
    let minutes = (seconds % 3_600) / 60;
    match days {
        0 => format!("up {hours}:{minutes:02}"),
        1 => format!("up 1 day, {hours}:{minutes:02}"),
        _ => format!("up {days} days, {hours}:{minutes:02}"),
    }
}

/// Render a byte count in the `/proc/meminfo` style
#[must_use]
pub fn format_kib(bytes: u64) -> String {
    format!("{} kB", bytes / 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_os_release() {
        let content = r#"PRETTY_NAME="Ubuntu 22.04.4 LTS"
NAME="Ubuntu"
VERSION_ID="22.04"
ID=ubuntu
"#;
        let release = parse_os_release(content);
        assert_eq!(release.pretty_name.as_deref(), Some("Ubuntu 22.04.4 LTS"));
        assert_eq!(release.version_id.as_deref(), Some("22.04"));
    }

    #[test]
    fn os_release_tolerates_garbage() {
        let release = parse_os_release("# comment\n\nNAME\nID=arch\n");
        assert_eq!(release, OsRelease::default());
    }

    #[test]
    fn uptime_formatting() {
        assert_eq!(format_uptime(59), "up 0:00");
        assert_eq!(format_uptime(3_725), "up 1:02");
        assert_eq!(format_uptime(86_400 + 600), "up 1 day, 0:10");
        assert_eq!(format_uptime(3 * 86_400 + 4 * 3_600 + 5 * 60), "up 3 days, 4:05");
    }

    #[test]
    fn configured_machine_name_wins() {
        assert_eq!(machine_name(Some(" ws-042 ")), "ws-042");
        assert!(!machine_name(Some("  ")).is_empty());
        assert!(!machine_name(None).is_empty());
    }

    #[test]
    fn common_facts_present() {
        let mut facts = SystemFacts::new();
        insert_common_facts(&mut facts, Bitness::Bit32, Some("pc-7"));
        assert_eq!(facts.get(SystemFacts::MACHINE_NAME), Some("pc-7"));
        assert_eq!(facts.get(SystemFacts::BIT_OS), Some("32-bit"));
    }
}
