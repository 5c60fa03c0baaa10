use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One installed product discovered on the host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SoftwareEntry {
    /// Canonical product name (never empty)
    pub name: String,

    /// Free-form version string, empty if unknown
    #[serde(default)]
    pub version: String,

    /// Vendor or maintainer, empty if unknown
    #[serde(default)]
    pub publisher: String,

    /// Install date, only when the source carried a well-formed one
    #[serde(default)]
    pub install_date: Option<NaiveDate>,

    /// Filesystem path, empty if unknown
    #[serde(default)]
    pub install_location: String,

    /// Host bitness tag, not a per-package value
    #[serde(default)]
    pub architecture: String,

    /// Display name as the source reported it, before normalization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_name: Option<String>,
}

impl SoftwareEntry {
    /// Create an entry with only a name set
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Set the version
    #[must_use]
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the publisher
    #[must_use]
    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    /// Set the host architecture tag
    #[must_use]
    pub fn with_architecture(mut self, bitness: Bitness) -> Self {
        self.architecture = bitness.to_string();
        self
    }
}

/// Coarse operating-system bitness
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bitness {
    /// 64-bit operating system
    Bit64,
    /// 32-bit operating system
    Bit32,
}

impl Bitness {
    /// Classify an architecture name such as `x86_64` or `aarch64`
    #[must_use]
    pub fn from_arch(arch: &str) -> Self {
        let arch = arch.to_ascii_lowercase();
        if arch.contains("64") || arch == "s390x" {
            Self::Bit64
        } else {
            Self::Bit32
        }
    }

    /// Tag used in reports
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Bit64 => "64-bit",
            Self::Bit32 => "32-bit",
        }
    }
}

impl fmt::Display for Bitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bitness_from_arch() {
        assert_eq!(Bitness::from_arch("x86_64"), Bitness::Bit64);
        assert_eq!(Bitness::from_arch("AMD64"), Bitness::Bit64);
        assert_eq!(Bitness::from_arch("aarch64"), Bitness::Bit64);
        assert_eq!(Bitness::from_arch("x86"), Bitness::Bit32);
        assert_eq!(Bitness::from_arch("armv7"), Bitness::Bit32);
    }

    #[test]
    fn raw_name_is_omitted_when_absent() {
        let entry = SoftwareEntry::new("curl").with_architecture(Bitness::Bit64);
        let json = serde_json::to_value(&entry).unwrap();
        assert!(json.get("raw_name").is_none());
        assert_eq!(json["architecture"], "64-bit");
        assert!(json["install_date"].is_null());
    }
}
