//! Coorddelta clusterer: edge and spread must both match.
//!
//! Seed and neighborhood are found as in the edgedelta clusterer. The edge
//! centroid is the neighborhood member closest to the mean edge; the spread
//! centroid is that same group's spread. Each summary gets its own
//! tolerance, derived independently when not fixed: twice the
//! neighborhood's edge deviation, a quarter of its spread deviation.

use crate::error::{OptionExt, Result};
use crate::stats::{column_mean, column_std, l1_argmin};

use super::rtree::build_record_rtree;
use super::{
    check_delta, converge, neighborhood, select_seed, within, ClusterAssignment, GroupGeometry,
    SeedSource,
};

/// Cluster groups by edge and spread together.
pub fn cluster_by_coord(
    groups: &[GroupGeometry],
    spread_delta: Option<f64>,
    edge_delta: Option<f64>,
    seeds: &mut dyn SeedSource,
) -> Result<ClusterAssignment> {
    if let Some(d) = spread_delta {
        check_delta("coorddelta_spread", d)?;
    }
    if let Some(d) = edge_delta {
        check_delta("coorddelta_edge", d)?;
    }

    let edges: Vec<[f64; 4]> = groups.iter().map(|g| g.edge().to_array()).collect();
    let spreads: Vec<[f64; 2]> = groups.iter().map(|g| g.spread().to_array()).collect();
    let tree = build_record_rtree(groups);

    converge("coorddelta", groups.len(), |pool, first| {
        let seed = select_seed(pool, groups, first, seeds);
        let near = neighborhood(&tree, groups, seed, pool);

        let near_edges: Vec<[f64; 4]> = near.iter().map(|&g| edges[g]).collect();
        let near_spreads: Vec<[f64; 2]> = near.iter().map(|&g| spreads[g]).collect();

        let nearest = l1_argmin(&near_edges, &column_mean(&near_edges))
            .ok_or_internal("empty coord neighborhood")?;
        let edge_center = near_edges[nearest];
        let spread_center = near_spreads[nearest];

        let edge_delta = match edge_delta {
            Some(d) => [d; 4],
            None => column_std(&near_edges).map(|s| s * 2.0),
        };
        let spread_delta = match spread_delta {
            Some(d) => [d; 2],
            None => column_std(&near_spreads).map(|s| s / 4.0),
        };

        Ok(pool
            .iter()
            .copied()
            .filter(|&g| {
                within(&edges[g], &edge_center, &edge_delta)
                    && within(&spreads[g], &spread_center, &spread_delta)
            })
            .collect())
    })
}
