//! Pipeline integration tests.
//!
//! Runs every heuristic over a synthetic scooter fleet through the public
//! API: timedelta -> spreaddelta / edgedelta / coorddelta -> motion features.
//!
//! The heavy test is `#[ignore]` by default. Run it with:
//!   `cargo test --test pipeline --release -- --ignored --nocapture`

use std::time::Instant;

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trajectory_heuristics::{
    group_positions, segment_trajectory, GpsPoint, GroupKey, HeuristicConfig, PositionRecord,
    Rental, SegmentBoundary, TrajectoryDataset, FEATURE_COLUMNS,
};

/// Synthetic fleet: each rental rides, parks for 20 minutes, rides again.
/// Rentals share one of three start corridors.
fn synthetic_fleet(rental_count: i64, seed: u64) -> (Vec<PositionRecord>, Vec<Rental>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let base = Utc.with_ymd_and_hms(2020, 6, 1, 6, 0, 0).unwrap();

    let mut positions = Vec::new();
    let mut rentals = Vec::new();
    let mut position_id = 0;

    for rental_id in 1..=rental_count {
        let device_id = rental_id % 5 + 1;
        let start = base + TimeDelta::hours(2 * rental_id);
        rentals.push(Rental::new(
            rental_id,
            device_id,
            1000 + rental_id,
            start,
            start + TimeDelta::hours(1),
        ));

        let corridor = (rental_id % 3) as f64 * 0.01;
        let mut time = start;
        for step in 0..20 {
            time += if step == 12 {
                TimeDelta::minutes(20)
            } else {
                TimeDelta::seconds(rng.gen_range(4..7))
            };
            let device_time = time + TimeDelta::milliseconds(rng.gen_range(-200..200));
            let point = GpsPoint::new(
                45.0 + corridor + step as f64 * 0.0002 + rng.gen_range(-1e-5..1e-5),
                9.0 + step as f64 * 0.0001 + rng.gen_range(-1e-5..1e-5),
            );

            position_id += 1;
            positions.push(
                PositionRecord::new(rental_id, device_id, time, point)
                    .with_position_id(position_id)
                    .with_device_time(device_time)
                    .with_speed(rng.gen_range(0.0..25.0)),
            );
        }
    }

    (positions, rentals)
}

fn run_pipeline(dataset: &mut TrajectoryDataset) {
    let trips = [GroupKey::RentalId, GroupKey::TimedeltaId];
    dataset.timedelta_heuristic().unwrap();
    dataset.spreaddelta_heuristic(&trips).unwrap();
    dataset.edgedelta_heuristic(&trips).unwrap();
    dataset.coorddelta_heuristic(&trips).unwrap();
    dataset.moving_behavior_feature_extraction(&trips).unwrap();
}

fn seeded(seed: u64) -> HeuristicConfig {
    HeuristicConfig {
        seed: Some(seed),
        ..Default::default()
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 6, 1, 8, 0, 0).unwrap()
}

// ============================================================================
// Test: Full Pipeline
// ============================================================================

#[test]
fn test_full_pipeline_populates_every_column() {
    let (positions, rentals) = synthetic_fleet(12, 1);
    let mut dataset = TrajectoryDataset::with_config(positions, rentals, seeded(5));
    assert!(dataset.heuristic_empty());

    run_pipeline(&mut dataset);
    assert!(!dataset.heuristic_empty());

    for record in dataset.positions() {
        for id in [
            record.timedelta_id,
            record.spreaddelta_id,
            record.edgedelta_id,
            record.coorddelta_id,
        ] {
            assert!(id.unwrap() >= 1);
        }
    }

    let stats = dataset.stats();
    assert_eq!(stats.position_count, 240);
    assert!(stats.timedelta_segments >= 12);
    assert!(stats.edgedelta_clusters >= 1);
    assert!(stats.feature_count > 0);
}

#[test]
fn test_groups_share_cluster_ids() {
    let (positions, rentals) = synthetic_fleet(9, 2);
    let mut dataset = TrajectoryDataset::with_config(positions, rentals, seeded(11));
    run_pipeline(&mut dataset);

    let groups =
        group_positions(dataset.positions(), &[GroupKey::RentalId, GroupKey::TimedeltaId]).unwrap();
    for group in groups {
        let first = &dataset.positions()[group.indices[0]];
        for &row in &group.indices {
            let record = &dataset.positions()[row];
            assert_eq!(record.spreaddelta_id, first.spreaddelta_id);
            assert_eq!(record.edgedelta_id, first.edgedelta_id);
            assert_eq!(record.coorddelta_id, first.coorddelta_id);
            assert_eq!(record.edge_latitude_start, first.edge_latitude_start);
        }
    }
}

#[test]
fn test_features_are_finite_and_complete() {
    let (positions, rentals) = synthetic_fleet(6, 3);
    let mut dataset = TrajectoryDataset::with_config(positions, rentals, seeded(1));
    dataset.timedelta_heuristic().unwrap();
    dataset.moving_behavior_feature_extraction(&[GroupKey::RentalId]).unwrap();

    // 20 records per rental, width 10, offset 5: windows at 0, 5, 10
    assert_eq!(dataset.moving_behavior_features().len(), 18);
    for row in dataset.moving_behavior_features() {
        let values = row.values();
        assert_eq!(values.len(), FEATURE_COLUMNS.len());
        assert!(values.iter().all(|v| v.is_finite()));
    }
}

#[test]
fn test_same_seed_reproduces_run() {
    let (positions, rentals) = synthetic_fleet(10, 4);
    let mut a = TrajectoryDataset::with_config(positions.clone(), rentals.clone(), seeded(99));
    let mut b = TrajectoryDataset::with_config(positions, rentals, seeded(99));
    run_pipeline(&mut a);
    run_pipeline(&mut b);

    assert_eq!(a.positions(), b.positions());
    assert_eq!(a.moving_behavior_features(), b.moving_behavior_features());
}

#[test]
fn test_rental_trajectories_cover_fleet() {
    let (positions, rentals) = synthetic_fleet(5, 5);
    let dataset = TrajectoryDataset::new(positions, rentals);

    let trajectories = dataset.rental_trajectories();
    assert_eq!(trajectories.len(), 5);
    assert!(trajectories.iter().all(|t| t.position_ids.len() == 20));
}

// ============================================================================
// Test: Standalone Algorithms
// ============================================================================

#[test]
fn test_gap_start_segmentation_scenario() {
    let times: Vec<_> = [0, 1, 2, 100, 101]
        .iter()
        .map(|&s| {
            let t = base_time() + TimeDelta::seconds(s);
            (t, t)
        })
        .collect();

    let result = segment_trajectory(&times, Some(TimeDelta::seconds(10)), SegmentBoundary::GapStart);
    assert_eq!(result.segment_ids, vec![1, 1, 1, 2, 2]);
}

#[test]
fn test_config_from_json() {
    let config: HeuristicConfig = serde_json::from_str(
        r#"{"timedelta_ms": 60000, "segment_boundary": "GapStart", "window_width": 4, "seed": 3}"#,
    )
    .unwrap();
    assert_eq!(config.timedelta(), Some(TimeDelta::minutes(1)));
    assert_eq!(config.effective_window_offset(), 2);
    assert!(config.validate().is_ok());

    let (positions, rentals) = synthetic_fleet(3, 6);
    let mut dataset = TrajectoryDataset::with_config(positions, rentals, config);
    dataset.timedelta_heuristic().unwrap();

    // One 20-minute pause per rental
    assert_eq!(dataset.stats().timedelta_segments, 6);
}

// ============================================================================
// Test: Large Fleet
// ============================================================================

#[test]
#[ignore] // slow in debug builds
fn test_large_fleet_pipeline() {
    let (positions, rentals) = synthetic_fleet(2_000, 7);
    let mut dataset = TrajectoryDataset::with_config(positions, rentals, seeded(7));

    let start = Instant::now();
    run_pipeline(&mut dataset);
    let elapsed = start.elapsed();

    let stats = dataset.stats();
    println!(
        "2000 rentals: {} segments, {} coord clusters, {} feature rows in {:?}",
        stats.timedelta_segments, stats.coorddelta_clusters, stats.feature_count, elapsed
    );
    assert!(!dataset.heuristic_empty());
}
