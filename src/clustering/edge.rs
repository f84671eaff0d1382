//! Edgedelta clusterer: groups that start and stop in the same places.
//!
//! Each iteration draws a random seed group, gathers the unassigned groups
//! with a record inside the seed's `mean ± 2·stddev` box, and takes the
//! member of that neighborhood whose edge is L1-closest to the
//! neighborhood's mean edge as the centroid. The derived tolerance is twice
//! the neighborhood's edge deviation (about a 95% band).

use crate::error::{OptionExt, Result};
use crate::stats::{column_mean, column_std, l1_argmin};

use super::rtree::build_record_rtree;
use super::{
    check_delta, converge, neighborhood, select_seed, within, ClusterAssignment, GroupGeometry,
    SeedSource,
};

/// Cluster groups by edge.
///
/// `delta` fixes the tolerance on all four coordinates; `None` derives it
/// per iteration. `seeds` drives the seed draws.
pub fn cluster_by_edge(
    groups: &[GroupGeometry],
    delta: Option<f64>,
    seeds: &mut dyn SeedSource,
) -> Result<ClusterAssignment> {
    if let Some(d) = delta {
        check_delta("edgedelta", d)?;
    }

    let edges: Vec<[f64; 4]> = groups.iter().map(|g| g.edge().to_array()).collect();
    let tree = build_record_rtree(groups);

    converge("edgedelta", groups.len(), |pool, first| {
        let seed = select_seed(pool, groups, first, seeds);
        let near = neighborhood(&tree, groups, seed, pool);

        let near_edges: Vec<[f64; 4]> = near.iter().map(|&g| edges[g]).collect();
        let nearest = l1_argmin(&near_edges, &column_mean(&near_edges))
            .ok_or_internal("empty edge neighborhood")?;
        let center = near_edges[nearest];

        let delta = match delta {
            Some(d) => [d; 4],
            None => column_std(&near_edges).map(|s| s * 2.0),
        };

        Ok(pool
            .iter()
            .copied()
            .filter(|&g| within(&edges[g], &center, &delta))
            .collect())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clustering::ScriptedSeeds;
    use crate::GpsPoint;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn trip(from: (f64, f64), to: (f64, f64)) -> GroupGeometry {
        let mid = ((from.0 + to.0) / 2.0, (from.1 + to.1) / 2.0);
        GroupGeometry::new(vec![
            GpsPoint::new(from.0, from.1),
            GpsPoint::new(mid.0, mid.1),
            GpsPoint::new(to.0, to.1),
        ])
    }

    #[test]
    fn test_identical_single_points_cluster_together() {
        let groups = vec![
            GroupGeometry::new(vec![GpsPoint::new(45.0, 9.0)]),
            GroupGeometry::new(vec![GpsPoint::new(45.0, 9.0)]),
        ];
        for delta in [Some(0.0), Some(0.5), None] {
            let result = cluster_by_edge(&groups, delta, &mut ScriptedSeeds::new(vec![1])).unwrap();
            assert_eq!(result.cluster_ids, vec![1, 1]);
        }
    }

    #[test]
    fn test_same_trip_clusters_and_reverse_does_not() {
        let groups = vec![
            trip((45.00, 9.00), (45.01, 9.01)),
            trip((45.00, 9.00), (45.01, 9.01)),
            trip((45.01, 9.01), (45.00, 9.00)),
        ];
        let result = cluster_by_edge(&groups, Some(0.001), &mut ScriptedSeeds::new(vec![0])).unwrap();

        assert_eq!(result.cluster_ids[0], result.cluster_ids[1]);
        assert_ne!(result.cluster_ids[0], result.cluster_ids[2]);
    }

    #[test]
    fn test_distant_trips_stay_apart() {
        let groups = vec![
            trip((45.00, 9.00), (45.01, 9.01)),
            trip((41.90, 12.50), (41.91, 12.51)),
            trip((45.00, 9.00), (45.01, 9.01)),
        ];
        let result = cluster_by_edge(&groups, None, &mut ScriptedSeeds::new(vec![0, 0])).unwrap();

        assert_eq!(result.cluster_count, 2);
        assert_eq!(result.cluster_ids[0], result.cluster_ids[2]);
        assert_ne!(result.cluster_ids[0], result.cluster_ids[1]);
    }

    #[test]
    fn test_all_singletons_terminate() {
        let groups: Vec<GroupGeometry> = (0..10)
            .map(|i| GroupGeometry::new(vec![GpsPoint::new(45.0 + i as f64, 9.0)]))
            .collect();
        let result = cluster_by_edge(&groups, None, &mut StdRng::seed_from_u64(7)).unwrap();
        assert_eq!(result.cluster_count, 10);
    }

    #[test]
    fn test_same_seed_same_clusters() {
        let groups: Vec<GroupGeometry> = (0..30)
            .map(|i| {
                let lat = 45.0 + (i % 5) as f64 * 0.01;
                trip((lat, 9.0), (lat + 0.002 * (i % 3) as f64, 9.01))
            })
            .collect();
        let a = cluster_by_edge(&groups, None, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = cluster_by_edge(&groups, None, &mut StdRng::seed_from_u64(42)).unwrap();
        assert_eq!(a, b);
        assert!(a.cluster_ids.iter().all(|&id| id >= 1));
    }
}
