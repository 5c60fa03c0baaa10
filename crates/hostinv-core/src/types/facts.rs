use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Machine facts gathered alongside the software list.
///
/// Keys vary by platform and by which probes succeeded. A failed probe
/// leaves its message under [`SystemFacts::ERROR`] instead of aborting the
/// whole collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SystemFacts(BTreeMap<String, String>);

impl SystemFacts {
    pub const OS_NAME: &'static str = "OSName";
    pub const OS_VERSION: &'static str = "OSVersion";
    pub const OS_VERSION_ID: &'static str = "OSVersionId";
    pub const BIT_OS: &'static str = "BitOS";
    pub const PROCESSOR: &'static str = "Processor";
    pub const PROCESSOR_CORES: &'static str = "ProcessorCores";
    pub const TOTAL_MEMORY: &'static str = "TotalMemory";
    pub const FREE_MEMORY: &'static str = "FreeMemory";
    pub const DISK_INFO: &'static str = "DiskInfo";
    pub const UPTIME: &'static str = "Uptime";
    pub const MACHINE_NAME: &'static str = "MachineName";
    pub const ERROR: &'static str = "Error";

    /// Create an empty fact set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a fact, replacing any previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Look up a fact
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Record a probe failure under the `Error` key.
    ///
    /// Several failures accumulate, separated by `"; "`.
    pub fn record_error(&mut self, probe: &str, error: impl std::fmt::Display) {
        let message = format!("Failed to get {probe}: {error}");
        self.0
            .entry(Self::ERROR.to_string())
            .and_modify(|existing| {
                existing.push_str("; ");
                existing.push_str(&message);
            })
            .or_insert(message);
    }

    /// Returns true if any probe failed
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.0.contains_key(Self::ERROR)
    }

    /// Number of facts
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if no facts were gathered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over facts in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SystemFacts {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_accumulate() {
        let mut facts = SystemFacts::new();
        facts.record_error("disk info", "df not found");
        facts.record_error("uptime", "permission denied");
        assert_eq!(
            facts.get(SystemFacts::ERROR),
            Some("Failed to get disk info: df not found; Failed to get uptime: permission denied")
        );
        assert!(facts.has_errors());
    }

    #[test]
    fn serializes_as_flat_map() {
        let facts: SystemFacts = [("OSName", "Windows"), ("BitOS", "64-bit")]
            .into_iter()
            .collect();
        let json = serde_json::to_string(&facts).unwrap();
        assert_eq!(json, r#"{"BitOS":"64-bit","OSName":"Windows"}"#);
    }
}
