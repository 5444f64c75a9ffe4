#![forbid(unsafe_code)]

//! Observation batches delivered by the host.
//!
//! # Invariants
//!
//! 1. [`ObservationBatch::visible_ids`] yields each identifier at most once.
//! 2. Identifiers appear in the order of their first intersecting entry.
//! 3. Entries with a ratio that is not strictly positive (including NaN)
//!    never contribute, even if the same identifier intersects elsewhere in
//!    the batch.
//! 4. Work is O(batch): one pass with a per-batch `seen` set.

use ahash::AHashSet;

use crate::marker::MarkerId;

/// One intersection change for one observed marker.
#[derive(Debug, Clone, PartialEq)]
pub struct IntersectionEntry {
    pub id: MarkerId,
    pub intersection_ratio: f64,
}

impl IntersectionEntry {
    #[must_use]
    pub fn new(id: impl Into<MarkerId>, intersection_ratio: f64) -> Self {
        Self {
            id: id.into(),
            intersection_ratio,
        }
    }

    /// Currently intersecting the proximity region, however slightly.
    #[must_use]
    pub fn is_intersecting(&self) -> bool {
        self.intersection_ratio > 0.0
    }
}

/// Entries delivered together by one intersection callback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ObservationBatch {
    entries: Vec<IntersectionEntry>,
}

impl ObservationBatch {
    #[must_use]
    pub fn new(entries: Vec<IntersectionEntry>) -> Self {
        Self { entries }
    }

    #[must_use]
    pub fn entries(&self) -> &[IntersectionEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identifiers to notify for this batch, deduplicated in first-seen order.
    #[must_use]
    pub fn visible_ids(&self) -> Vec<MarkerId> {
        let mut seen: AHashSet<MarkerId> = AHashSet::with_capacity(self.entries.len());
        self.entries
            .iter()
            .filter(|entry| entry.is_intersecting())
            .filter(|entry| seen.insert(entry.id.clone()))
            .map(|entry| entry.id.clone())
            .collect()
    }
}

impl FromIterator<IntersectionEntry> for ObservationBatch {
    fn from_iter<I: IntoIterator<Item = IntersectionEntry>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// One child-list change on the watched container.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MutationRecord {
    pub added_nodes: usize,
    pub removed_nodes: usize,
}

/// Child-list records coalesced by the host into one delivery.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    records: Vec<MutationRecord>,
}

impl MutationBatch {
    #[must_use]
    pub fn new(records: Vec<MutationRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[MutationRecord] {
        &self.records
    }

    #[must_use]
    pub fn added_nodes(&self) -> usize {
        self.records.iter().map(|r| r.added_nodes).sum()
    }

    #[must_use]
    pub fn removed_nodes(&self) -> usize {
        self.records.iter().map(|r| r.removed_nodes).sum()
    }
}
