// tests/consolidate_props.rs
//
// Replace-within-period / append-across-periods over a few years of months.
//
use std::collections::HashSet;

use metrics_snapshot::consolidate::consolidate;
use metrics_snapshot::data::{CanonicalRecord, Period, Source};
use metrics_snapshot::store::SummaryStore;

const METRICS: [(Source, &str); 4] = [
    (Source::Portal, "new_clients"),
    (Source::Portal, "housing_applications"),
    (Source::Database, "new_volunteers"),
    (Source::Database, "volunteer_return_rate"),
];

fn month(period: Period, bump: f64) -> Vec<CanonicalRecord> {
    // Emitted in a deliberately unsorted order.
    METRICS
        .iter()
        .rev()
        .enumerate()
        .map(|(i, (src, key))| CanonicalRecord::new(period, *src, *key, i as f64 + bump))
        .collect()
}

fn history(start: &str, months: usize) -> (SummaryStore, Vec<Period>) {
    let mut store = SummaryStore::new();
    let mut periods = Vec::new();
    let mut p: Period = start.parse().unwrap();
    for _ in 0..months {
        store = consolidate(store, month(p, 0.0), p).unwrap();
        periods.push(p);
        p = p.succ();
    }
    (store, periods)
}

#[test]
fn keys_are_unique_and_sorted() {
    let (store, _) = history("2022-11", 20);
    assert_eq!(store.len(), 80);

    let mut seen = HashSet::new();
    for r in store.records() {
        assert!(seen.insert((r.period, r.source, r.metric_key.clone())));
    }
    assert!(store.records().windows(2).all(|w| w[0].key() < w[1].key()));
    assert!(store.check_invariants().is_ok());
}

#[test]
fn consolidating_twice_changes_nothing() {
    let (store, periods) = history("2023-01", 6);
    let target = periods[3];
    let once = consolidate(store, month(target, 5.0), target).unwrap();
    let twice = consolidate(once.clone(), month(target, 5.0), target).unwrap();
    assert_eq!(once, twice);
}

#[test]
fn only_the_target_period_changes() {
    let (store, periods) = history("2023-01", 6);
    let target = periods[2];
    let before = store.clone();

    // Fewer metrics this time: the dropped one must disappear for the target only.
    let mut fresh = month(target, 100.0);
    fresh.retain(|r| r.metric_key != "housing_applications");
    let after = consolidate(store, fresh.clone(), target).unwrap();

    for p in &periods {
        let old: Vec<_> = before.for_period(*p).collect();
        let new: Vec<_> = after.for_period(*p).collect();
        if *p == target {
            assert_eq!(new.len(), 3);
            assert!(new.iter().all(|r| r.value.as_f64().unwrap() >= 100.0));
        } else {
            assert_eq!(old, new);
        }
    }
}

#[test]
fn empty_incoming_clears_only_that_month() {
    let (store, periods) = history("2024-01", 3);
    let out = consolidate(store, Vec::new(), periods[1]).unwrap();
    assert_eq!(out.periods(), vec![periods[0], periods[2]]);
}
