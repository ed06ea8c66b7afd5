//! Property-based tests for the statistics table.
//!
//! Random sequences of proxy operations are replayed against an in-memory
//! backend and checked against a simple model.
//!
//! # Properties Tested
//!
//! 1. **Monotonic Counters**: hit and miss counts never decrease
//! 2. **Model Agreement**: counts and hot/cold flags match a reference model
//! 3. **Lazy Entries**: the table only holds keys an operation has touched

use cache_stats::backend::InMemoryBackend;
use cache_stats::StatsTrackingCache;
use proptest::prelude::*;
use std::collections::{HashMap, HashSet};

#[derive(Clone, Debug)]
enum Op {
    Read(usize),
    Write(usize, usize),
    Remove(usize),
    ReadMany(Vec<usize>),
    WriteMany(Vec<usize>),
}

const KEYS: [&str; 4] = ["alpha", "beta", "gamma", "delta"];

fn op_strategy() -> impl Strategy<Value = Op> {
    let key = 0..KEYS.len();
    prop_oneof![
        key.clone().prop_map(Op::Read),
        (key.clone(), 0usize..4096).prop_map(|(k, size)| Op::Write(k, size)),
        key.clone().prop_map(Op::Remove),
        prop::collection::vec(key.clone(), 1..4).prop_map(Op::ReadMany),
        prop::collection::hash_set(key, 1..4)
            .prop_map(|keys| Op::WriteMany(keys.into_iter().collect())),
    ]
}

#[derive(Clone, Copy, Default, Debug, PartialEq)]
struct Expected {
    hot: bool,
    hits: u64,
    misses: u64,
}

#[derive(Default)]
struct Model {
    stored: HashSet<usize>,
    stats: HashMap<usize, Expected>,
}

impl Model {
    fn read(&mut self, key: usize) {
        let present = self.stored.contains(&key);
        let entry = self.stats.entry(key).or_default();
        entry.hot = present;
        if present {
            entry.hits += 1;
        } else {
            entry.misses += 1;
        }
    }

    fn write(&mut self, key: usize) {
        self.stored.insert(key);
        self.stats.entry(key).or_default().hot = true;
    }

    fn remove(&mut self, key: usize) {
        if self.stored.remove(&key) {
            self.stats.entry(key).or_default().hot = false;
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .expect("Failed to create Tokio runtime")
}

proptest! {
    #[test]
    fn prop_counters_follow_model(ops in prop::collection::vec(op_strategy(), 1..40)) {
        let rt = runtime();
        let cache = StatsTrackingCache::new(InMemoryBackend::new());
        let mut model = Model::default();
        let mut previous: HashMap<usize, (u64, u64)> = HashMap::new();

        for op in &ops {
            rt.block_on(async {
                match op {
                    Op::Read(k) => {
                        cache.read(KEYS[*k]).await.expect("Failed to read");
                        model.read(*k);
                    }
                    Op::Write(k, size) => {
                        cache.write(KEYS[*k], vec![0; *size], None).await.expect("Failed to write");
                        model.write(*k);
                    }
                    Op::Remove(k) => {
                        cache.remove(KEYS[*k]).await.expect("Failed to remove");
                        model.remove(*k);
                    }
                    Op::ReadMany(keys) => {
                        let names: Vec<&str> = keys.iter().map(|k| KEYS[*k]).collect();
                        cache.read_many(&names).await.expect("Failed to read_many");
                        for k in keys {
                            model.read(*k);
                        }
                    }
                    Op::WriteMany(keys) => {
                        let entries: Vec<(&str, Vec<u8>)> =
                            keys.iter().map(|k| (KEYS[*k], vec![1; 8])).collect();
                        cache.write_many(&entries, None).await.expect("Failed to write_many");
                        for k in keys {
                            model.write(*k);
                        }
                    }
                }
            });

            for (k, name) in KEYS.iter().enumerate() {
                if let Some(entry) = cache.entry(name) {
                    let (hits, misses) = previous.get(&k).copied().unwrap_or_default();
                    prop_assert!(entry.hit_count >= hits);
                    prop_assert!(entry.miss_count >= misses);
                    previous.insert(k, (entry.hit_count, entry.miss_count));
                }
            }
        }

        prop_assert_eq!(cache.len(), model.stats.len());
        for (k, expected) in &model.stats {
            let entry = cache.entry(KEYS[*k]).expect("entry missing");
            let actual = Expected {
                hot: entry.is_present,
                hits: entry.hit_count,
                misses: entry.miss_count,
            };
            prop_assert_eq!(actual, *expected);
        }
    }

    #[test]
    fn prop_snapshot_formats_are_fixed_width(size in 0usize..100_000) {
        let rt = runtime();
        let cache = StatsTrackingCache::new(InMemoryBackend::new());

        rt.block_on(async {
            cache.write("k", vec![0; size], None).await.expect("Failed to write");
            cache.read("k").await.expect("Failed to read");
        });

        let snapshot = cache.snapshot();
        let view = snapshot.get("k").expect("row missing");
        let (_, size_decimals) = view.size.split_once('.').expect("size has no decimals");
        let (_, time_decimals) = view.access_time.split_once('.').expect("latency has no decimals");
        prop_assert_eq!(size_decimals.len(), 3);
        prop_assert_eq!(time_decimals.len(), 5);
    }
}
