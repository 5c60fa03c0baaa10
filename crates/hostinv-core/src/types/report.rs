use serde::{Deserialize, Serialize};

use super::facts::SystemFacts;
use super::software::SoftwareEntry;
use crate::error::Result;

/// One inventory snapshot: machine facts plus the installed software list.
///
/// Built fresh for every scan and never persisted by the agent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Machine facts
    pub system_info: SystemFacts,
    /// Deduplicated software list, in first-seen order
    pub installed_software: Vec<SoftwareEntry>,
}

impl Report {
    /// Assemble a report from its two parts
    #[must_use]
    pub const fn build(system_info: SystemFacts, installed_software: Vec<SoftwareEntry>) -> Self {
        Self {
            system_info,
            installed_software,
        }
    }

    /// Serialize to indented JSON.
    ///
    /// Non-ASCII text is written as raw UTF-8, not `\u` escapes.
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a report previously produced by [`Report::to_json_bytes`]
    pub fn from_json_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Number of software entries
    #[must_use]
    pub fn software_count(&self) -> usize {
        self.installed_software.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample() -> Report {
        let mut facts = SystemFacts::new();
        facts.insert(SystemFacts::OS_NAME, "Windows");
        facts.insert(SystemFacts::MACHINE_NAME, "бухгалтерия-01");

        let mut office = SoftwareEntry::new("Microsoft Office профессиональный плюс")
            .with_version("16.0.4266.1001")
            .with_publisher("Microsoft Corporation");
        office.install_date = NaiveDate::from_ymd_opt(2023, 4, 11);

        Report::build(
            facts,
            vec![office, SoftwareEntry::new("7-Zip").with_publisher("Igor Pavlov")],
        )
    }

    #[test]
    fn unicode_is_not_escaped() {
        let bytes = sample().to_json_bytes().unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("профессиональный"));
        assert!(text.contains("бухгалтерия-01"));
        assert!(!text.contains("\\u"));
    }

    #[test]
    fn has_two_top_level_fields() {
        let value: serde_json::Value =
            serde_json::from_slice(&sample().to_json_bytes().unwrap()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 2);
        assert!(obj["system_info"].is_object());
        assert_eq!(obj["installed_software"].as_array().unwrap().len(), 2);
        assert_eq!(obj["installed_software"][0]["install_date"], "2023-04-11");
    }

    #[test]
    fn decodes_what_it_encodes() {
        let report = sample();
        let decoded = Report::from_json_slice(&report.to_json_bytes().unwrap()).unwrap();
        assert_eq!(decoded, report);
    }
}
