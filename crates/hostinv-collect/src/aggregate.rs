//! Merging collector batches into one deduplicated software list.

use hostinv_core::SoftwareEntry;
use std::collections::HashSet;
use tracing::debug;

use crate::normalize::Canonicalization;

/// Accumulates entries in source-priority order, first-seen wins.
///
/// Each entry's `name` is replaced by its canonical form and the original
/// is kept in `raw_name` when the two differ. Later duplicates are dropped
/// whole; fields are never merged across duplicates.
#[derive(Debug)]
pub struct InventoryAggregator {
    canonicalization: Canonicalization,
    seen: HashSet<String>,
    entries: Vec<SoftwareEntry>,
    dropped: usize,
}

impl InventoryAggregator {
    /// Create an empty aggregator
    #[must_use]
    pub fn new(canonicalization: Canonicalization) -> Self {
        Self {
            canonicalization,
            seen: HashSet::new(),
            entries: Vec::new(),
            dropped: 0,
        }
    }

    /// Add one batch, in the order its collector produced it
    pub fn extend(&mut self, batch: impl IntoIterator<Item = SoftwareEntry>) {
        for mut entry in batch {
            let canonical = self.canonicalization.apply(&entry.name);
            if canonical.is_empty() {
                continue;
            }
            if !self.seen.insert(canonical.clone()) {
                debug!(name = %canonical, raw = %entry.name, "dropping duplicate entry");
                self.dropped += 1;
                continue;
            }
            if canonical != entry.name {
                let raw = std::mem::replace(&mut entry.name, canonical);
                entry.raw_name.get_or_insert(raw);
            }
            self.entries.push(entry);
        }
    }

    /// Entries kept so far
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if nothing has been kept
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Duplicates dropped so far
    #[must_use]
    pub const fn dropped(&self) -> usize {
        self.dropped
    }

    /// Finish and return entries in first-occurrence order
    #[must_use]
    pub fn finish(self) -> Vec<SoftwareEntry> {
        self.entries
    }
}

/// Merge batches (highest priority first) into one deduplicated list
pub fn aggregate<I>(batches: I, canonicalization: Canonicalization) -> Vec<SoftwareEntry>
where
    I: IntoIterator<Item = Vec<SoftwareEntry>>,
{
    let mut aggregator = InventoryAggregator::new(canonicalization);
    for batch in batches {
        aggregator.extend(batch);
    }
    aggregator.finish()
}
