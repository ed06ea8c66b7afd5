//! Per-key statistics records and the shared table that holds them.
//!
//! One [`StatEntry`] exists per key ever touched by an intercepted operation.
//! Entries are created lazily with every counter at zero and are never
//! removed; a deleted key keeps its history and is simply marked cold.
//!
//! The table is a sharded [`DashMap`]. Every update runs inside
//! [`StatsTable::update`], which holds the key's shard lock for the whole
//! find-or-create-then-mutate sequence, so concurrent updates to the same key
//! are never lost. [`StatsTable::snapshot`] copies each entry under the same
//! lock, so a snapshot never contains a half-applied update.

use dashmap::DashMap;
use serde::Serialize;
use std::collections::BTreeMap;
use std::mem::size_of;

/// Running statistics for a single cache key.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct StatEntry {
    /// Best-known estimate of whether the backend currently holds a value.
    pub is_present: bool,
    /// Reads that returned a value.
    pub hit_count: u64,
    /// Reads that returned nothing.
    pub miss_count: u64,
    /// Approximate footprint of the last value written or read, in KiB.
    pub last_size_kib: f64,
    /// Duration of the most recent single-key read, in milliseconds.
    pub last_access_latency_ms: f64,
}

/// A change to apply to one [`StatEntry`].
///
/// Fields left at their default leave the entry untouched, which lets the
/// proxy express each operation's effect as a single value.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct StatDelta {
    pub(crate) presence: Option<bool>,
    pub(crate) hit: bool,
    pub(crate) miss: bool,
    pub(crate) size_kib: Option<f64>,
    pub(crate) latency_ms: Option<f64>,
}

impl StatDelta {
    pub(crate) fn hit(size_kib: f64) -> Self {
        StatDelta {
            presence: Some(true),
            hit: true,
            size_kib: Some(size_kib),
            ..Default::default()
        }
    }

    pub(crate) fn miss() -> Self {
        StatDelta {
            presence: Some(false),
            miss: true,
            ..Default::default()
        }
    }

    pub(crate) fn stored(size_kib: f64) -> Self {
        StatDelta {
            presence: Some(true),
            size_kib: Some(size_kib),
            ..Default::default()
        }
    }

    pub(crate) fn removed() -> Self {
        StatDelta {
            presence: Some(false),
            ..Default::default()
        }
    }

    pub(crate) fn with_latency(mut self, latency_ms: f64) -> Self {
        self.latency_ms = Some(latency_ms);
        self
    }
}

impl StatEntry {
    pub(crate) fn apply(&mut self, delta: &StatDelta) {
        if let Some(present) = delta.presence {
            self.is_present = present;
        }
        if delta.hit {
            self.hit_count += 1;
        }
        if delta.miss {
            self.miss_count += 1;
        }
        if let Some(size) = delta.size_kib {
            self.last_size_kib = size;
        }
        if let Some(latency) = delta.latency_ms {
            self.last_access_latency_ms = latency;
        }
    }

    /// Render the entry for display.
    pub fn view(&self) -> StatView {
        StatView {
            hot: self.is_present,
            hit: self.hit_count,
            miss: self.miss_count,
            size: format!("{:.3}", self.last_size_kib),
            access_time: format!("{:.5}", self.last_access_latency_ms),
        }
    }
}

/// Display form of a [`StatEntry`].
///
/// Size is rendered in KiB with three decimals, latency in milliseconds with
/// five decimals.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StatView {
    pub hot: bool,
    pub hit: u64,
    pub miss: u64,
    pub size: String,
    pub access_time: String,
}

/// Point-in-time rendered copy of the whole table, ordered by key.
pub type Snapshot = BTreeMap<String, StatView>;

/// Shared per-key statistics table.
#[derive(Default)]
pub struct StatsTable {
    entries: DashMap<String, StatEntry>,
}

impl StatsTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Find or create the entry for `key` and apply `delta` atomically.
    pub(crate) fn update(&self, key: &str, delta: StatDelta) {
        match self.entries.get_mut(key) {
            Some(mut entry) => entry.apply(&delta),
            None => self
                .entries
                .entry(key.to_string())
                .or_default()
                .apply(&delta),
        }
    }

    /// Apply `delta` only if `key` already has an entry.
    pub(crate) fn update_existing(&self, key: &str, delta: StatDelta) -> bool {
        match self.entries.get_mut(key) {
            Some(mut entry) => {
                entry.apply(&delta);
                true
            }
            None => false,
        }
    }

    /// Copy of the entry for `key`, if one exists.
    pub fn get(&self, key: &str) -> Option<StatEntry> {
        self.entries.get(key).map(|entry| *entry)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rendered copy of every entry.
    pub fn snapshot(&self) -> Snapshot {
        self.entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().view()))
            .collect()
    }
}

/// Approximate in-memory footprint of a single value, in KiB.
pub fn footprint_kib(value: &[u8]) -> f64 {
    (size_of::<Vec<u8>>() + value.len()) as f64 / 1024.0
}

/// Approximate in-memory footprint of a whole bulk-read result, in KiB.
pub fn batch_footprint_kib(values: &[Option<Vec<u8>>]) -> f64 {
    let payload: usize = values
        .iter()
        .map(|value| size_of::<Option<Vec<u8>>>() + value.as_ref().map_or(0, Vec::len))
        .sum();
    (size_of::<Vec<Option<Vec<u8>>>>() + payload) as f64 / 1024.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_first_touch_creates_zeroed_entry() {
        let table = StatsTable::new();
        table.update("k", StatDelta::default());

        let entry = table.get("k").expect("entry missing");
        assert_eq!(entry, StatEntry::default());
        assert!(!entry.is_present);
    }

    #[test]
    fn test_hit_and_miss_accumulate() {
        let table = StatsTable::new();
        table.update("k", StatDelta::miss().with_latency(1.5));
        table.update("k", StatDelta::hit(0.25).with_latency(0.5));
        table.update("k", StatDelta::hit(0.5));

        let entry = table.get("k").expect("entry missing");
        assert!(entry.is_present);
        assert_eq!(entry.hit_count, 2);
        assert_eq!(entry.miss_count, 1);
        assert_eq!(entry.last_size_kib, 0.5);
        assert_eq!(entry.last_access_latency_ms, 0.5);
    }

    #[test]
    fn test_miss_keeps_previous_size() {
        let table = StatsTable::new();
        table.update("k", StatDelta::stored(2.0));
        table.update("k", StatDelta::miss());

        let entry = table.get("k").expect("entry missing");
        assert!(!entry.is_present);
        assert_eq!(entry.last_size_kib, 2.0);
    }

    #[test]
    fn test_update_existing_skips_unknown_keys() {
        let table = StatsTable::new();
        assert!(!table.update_existing("ghost", StatDelta::removed()));
        assert!(table.is_empty());

        table.update("k", StatDelta::stored(1.0));
        assert!(table.update_existing("k", StatDelta::removed()));
        assert!(!table.get("k").expect("entry missing").is_present);
    }

    #[test]
    fn test_view_formats_decimals() {
        let entry = StatEntry {
            is_present: true,
            hit_count: 3,
            miss_count: 1,
            last_size_kib: 0.0234375,
            last_access_latency_ms: 1.0 / 3.0,
        };

        let view = entry.view();
        assert_eq!(view.size, "0.023");
        assert_eq!(view.access_time, "0.33333");
        assert!(view.hot);
    }

    #[test]
    fn test_snapshot_is_sorted_copy() {
        let table = StatsTable::new();
        table.update("b", StatDelta::stored(1.0));
        table.update("a", StatDelta::miss());

        let snapshot = table.snapshot();
        let keys: Vec<_> = snapshot.keys().cloned().collect();
        assert_eq!(keys, vec!["a".to_string(), "b".to_string()]);

        table.update("a", StatDelta::hit(1.0));
        assert_eq!(snapshot["a"].hit, 0);
    }

    #[test]
    fn test_footprints() {
        assert_eq!(
            footprint_kib(&[0u8; 1000]),
            (size_of::<Vec<u8>>() + 1000) as f64 / 1024.0
        );
        let batch = vec![Some(vec![0u8; 100]), None];
        let expected = (size_of::<Vec<Option<Vec<u8>>>>()
            + 2 * size_of::<Option<Vec<u8>>>()
            + 100) as f64
            / 1024.0;
        assert_eq!(batch_footprint_kib(&batch), expected);
    }

    #[test]
    fn test_concurrent_hits_are_not_lost() {
        let table = Arc::new(StatsTable::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let table = Arc::clone(&table);
                std::thread::spawn(move || {
                    for _ in 0..1000 {
                        table.update("hot", StatDelta::hit(0.1));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert_eq!(table.get("hot").expect("entry missing").hit_count, 8000);
    }
}
