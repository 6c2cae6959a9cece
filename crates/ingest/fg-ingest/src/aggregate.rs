//! Per-source-address traffic aggregation.
//!
//! Folds the filtered record stream from all objects into one
//! [`TrafficPattern`]: srcaddr → attribute → set of distinct values. The
//! accumulation is pure and monotone - values are only ever added - and the
//! final content is independent of record arrival order, which is the
//! pipeline's primary correctness property.

use std::collections::{BTreeMap, BTreeSet};

use crate::record::{FlowRecord, TRACKED_ATTRIBUTES};

/// Aggregated traffic profile for one run.
///
/// Sets are semantically unordered; `BTreeMap`/`BTreeSet` storage makes
/// iteration (and therefore rendering) deterministic without a sort pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrafficPattern {
    entries: BTreeMap<String, BTreeMap<&'static str, BTreeSet<String>>>,
}

impl TrafficPattern {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the profile.
    ///
    /// Every tracked attribute with a non-empty value is inserted into the
    /// set for the record's source address. Records without a source
    /// address carry no key to aggregate under and are ignored.
    pub fn insert(&mut self, record: &FlowRecord) {
        let srcaddr = record.srcaddr();
        if srcaddr.is_empty() {
            return;
        }

        let entry = self.entries.entry(srcaddr.to_string()).or_default();
        for &attr in TRACKED_ATTRIBUTES {
            let value = record.field(attr);
            if !value.is_empty() {
                entry.entry(attr).or_default().insert(value.to_string());
            }
        }
    }

    /// Number of distinct source addresses observed.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate source addresses and their attribute sets in sorted order.
    pub fn iter(
        &self,
    ) -> impl Iterator<Item = (&str, &BTreeMap<&'static str, BTreeSet<String>>)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The value set for one (srcaddr, attribute) pair, if present.
    pub fn values(&self, srcaddr: &str, attribute: &str) -> Option<&BTreeSet<String>> {
        self.entries.get(srcaddr)?.get(attribute)
    }
}
