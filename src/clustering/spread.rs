//! Spreaddelta clusterer: groups with a similar coordinate extent.
//!
//! Deterministic. Every iteration takes the unassigned group whose spread is
//! L1-closest to the mean spread of the pool as the centroid, and derives
//! the tolerance from the pool's spread deviation (a quarter of it, roughly a
//! 20% band of a normal distribution).

use crate::error::{OptionExt, Result};
use crate::stats::{column_mean, column_std, l1_argmin};

use super::{check_delta, converge, within, ClusterAssignment, GroupGeometry};

/// Cluster groups by spread.
///
/// `delta` fixes the tolerance on both axes; `None` derives it per iteration.
pub fn cluster_by_spread(groups: &[GroupGeometry], delta: Option<f64>) -> Result<ClusterAssignment> {
    if let Some(d) = delta {
        check_delta("spreaddelta", d)?;
    }

    let spreads: Vec<[f64; 2]> = groups.iter().map(|g| g.spread().to_array()).collect();

    converge("spreaddelta", groups.len(), |pool, _| {
        let pool_spreads: Vec<[f64; 2]> = pool.iter().map(|&g| spreads[g]).collect();
        let nearest = l1_argmin(&pool_spreads, &column_mean(&pool_spreads))
            .ok_or_internal("empty spread pool")?;
        let center = pool_spreads[nearest];

        let delta = match delta {
            Some(d) => [d; 2],
            None => column_std(&pool_spreads).map(|s| s / 4.0),
        };

        Ok(pool
            .iter()
            .copied()
            .filter(|&g| within(&spreads[g], &center, &delta))
            .collect())
    })
}
