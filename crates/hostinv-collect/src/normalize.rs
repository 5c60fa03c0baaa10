//! Display-name normalization.
//!
//! Registry display names carry versions, architecture tags and locale
//! suffixes that make one product look like several. [`normalize`] strips
//! them so cosmetic variants collapse onto one canonical name.
//!
//! The heuristics are lossy by nature: the locale pass removes any
//! standalone two-letter word. They are tuned for Windows display names and
//! are not applied to Linux package identifiers (see [`Canonicalization`]).

use regex::Regex;
use std::sync::LazyLock;

/// Product family whose architecture qualifier is part of the identity.
const KEEP_VERSION_MARKER: &str = "Microsoft Visual C++";

/// Families where `x86`/`x64` distinguish genuinely different products.
const RUNTIME_MARKERS: &[&str] = &["Visual C++", "Runtime", "Redistributable"];

static DASH_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*-\s*\d+(\.\d+)+").expect("dash version regex"));

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(v?\d+(\.\d+)+(-\d+)*)").expect("version regex"));

static ARCHITECTURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\s*\(?\b(x86|x64|arm64|64-bit|32-bit|amd64)\b\)?(_[\w-]+)?")
        .expect("architecture regex")
});

static LOCALE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\b([a-z]{2}(-[a-z]{2})?)\b").expect("locale regex"));

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("whitespace regex"));

const TRIM_CHARS: &[char] = &['-', '(', ')', '\u{2122}', '\u{00ae}'];

/// Clean a raw display name into its canonical product name.
///
/// Never returns an empty string for a non-blank input: if every heuristic
/// strips the whole name, the trimmed raw name is returned instead.
#[must_use]
pub fn normalize(raw_name: &str) -> String {
    let cleaned = if raw_name.contains(KEEP_VERSION_MARKER) {
        let stripped = DASH_VERSION.replace_all(raw_name, "");
        collapse_whitespace(&stripped).trim().to_string()
    } else {
        strip_qualifiers(raw_name)
    };

    if cleaned.is_empty() {
        raw_name.trim().to_string()
    } else {
        cleaned
    }
}

fn strip_qualifiers(raw_name: &str) -> String {
    let mut name = VERSION.replace_all(raw_name, "").into_owned();

    if !is_runtime_family(&name) {
        name = ARCHITECTURE.replace_all(&name, "").into_owned();
    }

    name = LOCALE.replace_all(&name, "").into_owned();
    name = name.replace("()", "");

    collapse_whitespace(&name)
        .trim_matches(|c: char| c.is_whitespace() || TRIM_CHARS.contains(&c))
        .to_string()
}

fn is_runtime_family(name: &str) -> bool {
    RUNTIME_MARKERS.iter().any(|marker| name.contains(marker))
}

fn collapse_whitespace(name: &str) -> String {
    WHITESPACE_RUN.replace_all(name, " ").into_owned()
}

/// How a collector's names become dedup keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Canonicalization {
    /// Human display names (Windows): run the [`normalize`] heuristics
    DisplayName,
    /// Package identifiers (dpkg/rpm): already canonical, used verbatim
    PackageName,
}

impl Canonicalization {
    /// Canonical form of `raw_name` under this policy
    #[must_use]
    pub fn apply(self, raw_name: &str) -> String {
        match self {
            Self::DisplayName => normalize(raw_name),
            Self::PackageName => raw_name.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static DOTTED: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+(\.\d+)+").unwrap());

    const PLAIN_NAMES: &[&str] = &[
        "Foo Bar 1.2.3 (x64)",
        "7-Zip 23.01 (x64)",
        "Python 3.12.1 (64-bit)",
        "Git version 2.43.0",
        "Mozilla Firefox (x64 ru)",
        "Notepad++ 8.6.2 (64-bit x64)",
        "Java 8 Update 391 (64-bit)",
        "VLC media player",
        "Google Chrome v120.0.6099.130",
        "Zoom Workplace 6.0.2-33403 (x64)",
    ];

    #[test]
    fn strips_version_and_architecture() {
        assert_eq!(normalize("Foo Bar 1.2.3 (x64)"), "Foo Bar");
        assert_eq!(normalize("7-Zip 23.01 (x64)"), "7-Zip");
        assert_eq!(normalize("Python 3.12.1 (64-bit)"), "Python");
        assert_eq!(normalize("Notepad++ 8.6.2 (64-bit x64)"), "Notepad++");
    }

    #[test]
    fn strips_locale_tokens() {
        assert_eq!(normalize("Mozilla Firefox (x64 ru)"), "Mozilla Firefox");
        assert_eq!(normalize("Microsoft Office en-US"), "Microsoft Office");
    }

    #[test]
    fn trims_trademark_glyphs() {
        assert_eq!(normalize("Acme Suite\u{ae} 2.1.0"), "Acme Suite");
        assert_eq!(normalize("Widget\u{2122} - 4.0.1"), "Widget");
    }

    #[test]
    fn redistributable_keeps_architecture() {
        let raw = "Microsoft Visual C++ 2015-2022 Redistributable (x64) - 14.42.34438";
        let name = normalize(raw);
        assert_eq!(name, "Microsoft Visual C++ 2015-2022 Redistributable (x64)");
        assert!(name.contains("x64"));
        assert!(!name.contains("14.42.34438"));

        let x86 = normalize("Microsoft Visual C++ 2013 Redistributable (x86) - 12.0.40664");
        assert_eq!(x86, "Microsoft Visual C++ 2013 Redistributable (x86)");
        assert_ne!(
            x86,
            normalize("Microsoft Visual C++ 2013 Redistributable (x64) - 12.0.40664")
        );
    }

    #[test]
    fn runtime_family_keeps_architecture_qualifier() {
        let name = normalize("Microsoft Windows Desktop Runtime - 8.0.1 (x64)");
        assert!(name.contains("x64"));
        assert!(!DOTTED.is_match(&name));
    }

    #[test]
    fn no_dotted_numerals_survive() {
        for raw in PLAIN_NAMES {
            let name = normalize(raw);
            assert!(!DOTTED.is_match(&name), "{raw:?} -> {name:?}");
        }
    }

    #[test]
    fn idempotent() {
        for raw in PLAIN_NAMES {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
        let redist = normalize("Microsoft Visual C++ 2010  x86 Redistributable - 10.0.40219");
        assert_eq!(normalize(&redist), redist);
    }

    #[test]
    fn never_empty() {
        assert_eq!(normalize("en"), "en");
        assert_eq!(normalize("(x64)"), "(x64)");
        assert_eq!(normalize("  1.2.3  "), "1.2.3");
    }

    #[test]
    fn package_names_are_verbatim() {
        assert_eq!(Canonicalization::PackageName.apply("xz-utils"), "xz-utils");
        assert_eq!(Canonicalization::DisplayName.apply("Foo Bar 1.2.3"), "Foo Bar");
    }
}
