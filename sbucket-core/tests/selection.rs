//! End-to-end selection behavior over synthetic probe populations.

use std::collections::HashSet;

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use sbucket_core::{
    bucket, bucket_with, sample, select, BucketParams, CellRounding, FilterOptions, Probe,
    ProbeId, ProbeRecord,
};

/// Radical inverse in `base`; a low-discrepancy sequence that is identical
/// on every platform.
fn halton(mut i: u64, base: u64) -> f64 {
    let mut f = 1.0;
    let mut r = 0.0;
    while i > 0 {
        f /= base as f64;
        r += f * (i % base) as f64;
        i /= base;
    }
    r
}

/// Probes spread evenly over the longitude range and the Mercator-safe
/// latitude band.
fn scattered_probes(n: u64) -> Vec<Probe> {
    (1..=n)
        .map(|i| Probe {
            id: i,
            longitude: -180.0 + 360.0 * halton(i, 2),
            latitude: -85.0 + 170.0 * halton(i, 3),
        })
        .collect()
}

fn record(json: &str) -> ProbeRecord {
    serde_json::from_str(json).expect("valid record")
}

#[test]
fn scattered_population_converges_to_target() {
    let probes = scattered_probes(1000);
    let outcome = bucket(&probes, 50, "merc", 100).expect("valid params");

    assert!(outcome.converged, "occupied={}", outcome.occupied());
    assert!((47..=53).contains(&outcome.occupied()), "occupied={}", outcome.occupied());
    assert!(outcome.buckets.values().all(|ids| !ids.is_empty()));
    assert!(outcome.skipped.is_empty());
}

#[test]
fn scattered_population_converges_for_other_targets() {
    let probes = scattered_probes(1000);
    for target in [100i64, 200, 300] {
        let outcome = bucket(&probes, target, "merc", 100).expect("valid params");
        assert!(outcome.converged, "target={target} occupied={}", outcome.occupied());
    }
}

#[test]
fn equirectangular_also_converges() {
    let probes = scattered_probes(1000);
    let outcome = bucket(&probes, 50, "eqc", 100).expect("valid params");
    assert!(outcome.converged, "occupied={}", outcome.occupied());
}

#[test]
fn floor_rounding_is_opt_in_and_still_partitions() {
    let probes = scattered_probes(500);
    let params = BucketParams::new(40, "merc", 100)
        .expect("valid params")
        .rounding(CellRounding::Floor);
    let outcome = bucket_with(&probes, &params);
    let total: usize = outcome.buckets.values().map(Vec::len).sum();
    assert_eq!(total, 500);
}

#[test]
fn selection_has_one_id_per_occupied_bucket() {
    let probes = scattered_probes(1000);
    let outcome = bucket(&probes, 50, "merc", 100).expect("valid params");
    let mut rng = ChaCha8Rng::seed_from_u64(2014);
    let ids = sample(&outcome.buckets, &mut rng);

    assert_eq!(ids.len(), outcome.occupied());
    let unique: HashSet<ProbeId> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len());
    assert!(ids.iter().all(|id| (1..=1000).contains(id)));
}

#[test]
fn pipeline_filters_projects_and_samples() {
    let records = vec![
        record(r#"{"id": 1, "status": 1, "country_code": "DE", "longitude": 11.0, "latitude": 49.6}"#),
        record(r#"{"id": 2, "status": 1, "country_code": "DE", "longitude": 999.0, "latitude": 49.6}"#),
        record(r#"{"id": 3, "status": 2, "country_code": "DE", "longitude": 13.4, "latitude": 52.5}"#),
        record(r#"{"id": 4, "status": 1, "country_code": "FR", "longitude": 2.3, "latitude": 48.9}"#),
        record(r#"{"id": 5, "status": {"id": 1}, "country_code": "DE",
                  "geometry": {"type": "Point", "coordinates": [6.9, 50.9]}}"#),
    ];
    let filter = FilterOptions::default().with_countries(["DE"]);
    let params = BucketParams::new(2, "merc", 50).expect("valid params");
    let mut rng = ChaCha8Rng::seed_from_u64(1);

    let selection = select(&records, &filter, &params, &mut rng);
    assert_eq!(selection.filtered, 3);
    assert_eq!(selection.outcome.skipped.len(), 1);
    assert_eq!(selection.outcome.skipped[0].0, 2);
    assert_eq!(selection.ids.len(), selection.occupied());

    let mut ids = selection.ids.clone();
    ids.sort_unstable();
    assert!(ids.iter().all(|id| *id == 1 || *id == 5));
}

#[test]
fn repeated_record_is_selected_once() {
    let records = vec![
        record(r#"{"id": 7, "status": 1, "longitude": -150.0, "latitude": -60.0}"#),
        record(r#"{"id": 7, "status": 1, "longitude": 150.0, "latitude": 60.0}"#),
    ];
    let params = BucketParams::new(2, "merc", 10).expect("valid params");
    let mut rng = ChaCha8Rng::seed_from_u64(3);

    let selection = select(&records, &FilterOptions::default(), &params, &mut rng);
    assert_eq!(selection.filtered, 1);
    assert_eq!(selection.ids, vec![7]);
    let bucketed: usize = selection.outcome.buckets.values().map(Vec::len).sum();
    assert_eq!(bucketed, 1);
}

#[test]
fn empty_population_gives_empty_selection() {
    let mut rng = ChaCha8Rng::seed_from_u64(0);
    let params = BucketParams::new(10, "merc", 100).expect("valid params");
    let selection = select(&[], &FilterOptions::default(), &params, &mut rng);
    assert!(selection.ids.is_empty());
    assert!(selection.outcome.buckets.is_empty());
}

proptest! {
    #[test]
    fn selection_is_unique_and_drawn_from_input(
        coords in prop::collection::vec((-180.0f64..180.0, -89.0f64..89.0), 0..300),
        target in 1i64..80,
        seed in any::<u64>(),
    ) {
        let probes: Vec<Probe> = coords
            .iter()
            .enumerate()
            .map(|(i, (lon, lat))| Probe { id: i as ProbeId, longitude: *lon, latitude: *lat })
            .collect();
        let params = BucketParams::new(target, "merc", 30).expect("valid params");
        let outcome = bucket_with(&probes, &params);
        let ids = sample(&outcome.buckets, &mut ChaCha8Rng::seed_from_u64(seed));

        prop_assert_eq!(ids.len(), outcome.occupied());
        let unique: HashSet<ProbeId> = ids.iter().copied().collect();
        prop_assert_eq!(unique.len(), ids.len());
        prop_assert!(ids.iter().all(|id| (*id as usize) < probes.len()));

        let bucketed: usize = outcome.buckets.values().map(Vec::len).sum();
        prop_assert_eq!(bucketed, probes.len());
    }
}
