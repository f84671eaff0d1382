//! Spatial clustering of position groups.
//!
//! Three heuristics share one greedy convergence loop and differ in the
//! per-group summary they compare:
//!
//! - **spreaddelta**: `(max - min)` extent of latitude and longitude
//! - **edgedelta**: first and last coordinate of the group
//! - **coorddelta**: edge and spread together
//!
//! Each iteration picks a centroid among the unassigned groups, derives a
//! tolerance (fixed by the caller or from the data), and captures every
//! unassigned group whose summary lies within the tolerance of the
//! centroid's on every dimension. The centroid always captures itself, so
//! the pool shrinks on every iteration and the loop ends after at most one
//! iteration per group.
//!
//! ## Module Structure
//!
//! - [`spread`]: spreaddelta clusterer
//! - [`edge`]: edgedelta clusterer
//! - [`coord`]: coorddelta clusterer
//! - [`rtree`]: record-level R-tree for neighborhood discovery

pub mod coord;
pub mod edge;
pub mod rtree;
pub mod spread;

pub use coord::cluster_by_coord;
pub use edge::cluster_by_edge;
pub use spread::cluster_by_spread;

use std::collections::BTreeSet;

use geo::{BoundingRect, MultiPoint, Point};
use log::debug;
use rand::rngs::StdRng;
use rand::Rng;
use rstar::RTree;
use serde::{Deserialize, Serialize};

use crate::error::{OptionExt, Result, TrajectoryError};
use crate::grouping::{time_ordered, PositionGroup};
use crate::stats::{mean, sample_std};
use crate::{GpsPoint, PositionRecord};

use self::rtree::{groups_in_box, IndexedRecord};

// ============================================================================
// Group summaries
// ============================================================================

/// Coordinate extent of a group: `max - min` per axis.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Spread {
    pub latitude: f64,
    pub longitude: f64,
}

impl Spread {
    pub fn to_array(&self) -> [f64; 2] {
        [self.latitude, self.longitude]
    }
}

/// First and last coordinate of a group, in time order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Edge {
    pub latitude_start: f64,
    pub longitude_start: f64,
    pub latitude_stop: f64,
    pub longitude_stop: f64,
}

impl Edge {
    pub fn to_array(&self) -> [f64; 4] {
        [
            self.latitude_start,
            self.longitude_start,
            self.latitude_stop,
            self.longitude_stop,
        ]
    }
}

/// The points of one group, in time order.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupGeometry {
    points: Vec<GpsPoint>,
}

impl GroupGeometry {
    /// Points must already be in time order.
    pub fn new(points: Vec<GpsPoint>) -> Self {
        Self { points }
    }

    /// Collect a group's points from the position table, ordered by time.
    pub fn from_records(records: &[PositionRecord], group: &PositionGroup) -> Self {
        let points = time_ordered(records, &group.indices)
            .into_iter()
            .map(|i| records[i].point())
            .collect();
        Self { points }
    }

    pub fn points(&self) -> &[GpsPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Extent of the group. A single point has spread (0, 0).
    pub fn spread(&self) -> Spread {
        let multi: MultiPoint<f64> = self
            .points
            .iter()
            .map(|p| Point::new(p.longitude, p.latitude))
            .collect();
        match multi.bounding_rect() {
            Some(rect) => Spread {
                latitude: rect.height(),
                longitude: rect.width(),
            },
            None => Spread::default(),
        }
    }

    /// First and last point. A single point `p` has edge `(p, p)`.
    pub fn edge(&self) -> Edge {
        match (self.points.first(), self.points.last()) {
            (Some(first), Some(last)) => Edge {
                latitude_start: first.latitude,
                longitude_start: first.longitude,
                latitude_stop: last.latitude,
                longitude_stop: last.longitude,
            },
            _ => Edge::default(),
        }
    }

    /// Box `mean ± 2·stddev` of the group's own points, as
    /// `([lat_lo, lng_lo], [lat_hi, lng_hi])`.
    pub(crate) fn search_box(&self) -> ([f64; 2], [f64; 2]) {
        let lats: Vec<f64> = self.points.iter().map(|p| p.latitude).collect();
        let lngs: Vec<f64> = self.points.iter().map(|p| p.longitude).collect();
        let (lat, lng) = (mean(&lats).unwrap_or(0.0), mean(&lngs).unwrap_or(0.0));
        let (lat_tol, lng_tol) = (sample_std(&lats) * 2.0, sample_std(&lngs) * 2.0);
        ([lat - lat_tol, lng - lng_tol], [lat + lat_tol, lng + lng_tol])
    }
}

// ============================================================================
// Random source
// ============================================================================

/// Source of seed picks for the randomized clusterers.
pub trait SeedSource {
    /// Pick an index in `0..upper`. `upper` is never zero.
    fn pick(&mut self, upper: usize) -> usize;
}

impl SeedSource for StdRng {
    fn pick(&mut self, upper: usize) -> usize {
        self.gen_range(0..upper)
    }
}

/// A fixed, cycling sequence of picks, for reproducible runs.
///
/// Each pick is reduced modulo the requested bound.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSeeds {
    picks: Vec<usize>,
    cursor: usize,
}

impl ScriptedSeeds {
    pub fn new(picks: Vec<usize>) -> Self {
        Self { picks, cursor: 0 }
    }
}

impl SeedSource for ScriptedSeeds {
    fn pick(&mut self, upper: usize) -> usize {
        if self.picks.is_empty() {
            return 0;
        }
        let pick = self.picks[self.cursor % self.picks.len()];
        self.cursor += 1;
        pick % upper
    }
}

// ============================================================================
// Convergence loop
// ============================================================================

/// Cluster id per group, in input group order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterAssignment {
    /// Cluster id of each group, 1-based
    pub cluster_ids: Vec<u32>,
    /// Number of clusters formed
    pub cluster_count: u32,
}

impl ClusterAssignment {
    /// Indices of the groups in one cluster.
    pub fn members(&self, cluster_id: u32) -> Vec<usize> {
        self.cluster_ids
            .iter()
            .enumerate()
            .filter(|(_, id)| **id == cluster_id)
            .map(|(i, _)| i)
            .collect()
    }
}

/// Drive a clustering heuristic until every group is assigned.
///
/// `step` receives the unassigned pool (ascending group indices) and whether
/// this is the first iteration, and returns the groups captured by the new
/// cluster. A step that captures nothing, or captures an assigned group, is
/// an internal-consistency fault.
pub(crate) fn converge<F>(heuristic: &str, group_count: usize, mut step: F) -> Result<ClusterAssignment>
where
    F: FnMut(&[usize], bool) -> Result<Vec<usize>>,
{
    let mut cluster_ids: Vec<Option<u32>> = vec![None; group_count];
    let mut pool: Vec<usize> = (0..group_count).collect();
    let mut next_id: u32 = 1;
    let mut iterations = 0usize;

    while !pool.is_empty() {
        if iterations >= group_count {
            return Err(TrajectoryError::NonConvergence {
                heuristic: heuristic.to_string(),
                iterations,
                remaining: pool.len(),
            });
        }
        iterations += 1;

        let members = step(&pool, iterations == 1)?;
        if members.is_empty() {
            return Err(TrajectoryError::NonConvergence {
                heuristic: heuristic.to_string(),
                iterations,
                remaining: pool.len(),
            });
        }
        for &g in &members {
            let slot = cluster_ids
                .get_mut(g)
                .ok_or_internal("captured group out of range")?;
            if slot.is_some() {
                return Err(TrajectoryError::Internal {
                    message: format!("{} captured group {} twice", heuristic, g),
                });
            }
            *slot = Some(next_id);
        }

        pool.retain(|&g| cluster_ids[g].is_none());
        debug!(
            "[{}] Cluster {} captured {} groups, {} remaining",
            heuristic,
            next_id,
            members.len(),
            pool.len()
        );
        next_id += 1;
    }

    let cluster_ids = cluster_ids
        .into_iter()
        .collect::<Option<Vec<u32>>>()
        .ok_or_internal("group left unassigned")?;

    Ok(ClusterAssignment {
        cluster_ids,
        cluster_count: next_id - 1,
    })
}

// ============================================================================
// Shared helpers
// ============================================================================

/// Per-dimension tolerance test: `center - delta <= value <= center + delta`
/// on every dimension.
pub(crate) fn within<const N: usize>(value: &[f64; N], center: &[f64; N], delta: &[f64; N]) -> bool {
    value
        .iter()
        .zip(center)
        .zip(delta)
        .all(|((v, c), d)| *v >= c - d && *v <= c + d)
}

/// Reject deltas that would make the tolerance test meaningless.
pub(crate) fn check_delta(name: &str, delta: f64) -> Result<()> {
    if !delta.is_finite() || delta < 0.0 {
        return Err(TrajectoryError::invalid_parameter(
            name,
            format!("delta must be finite and non-negative, got {}", delta),
        ));
    }
    Ok(())
}

/// Pick a seed group from the pool.
///
/// On the first iteration only groups with more than one record are
/// eligible, so a disconnected single ping never anchors the first cluster.
/// If no such group is left, the whole pool is eligible.
pub(crate) fn select_seed(
    pool: &[usize],
    groups: &[GroupGeometry],
    first: bool,
    seeds: &mut dyn SeedSource,
) -> usize {
    let mut candidates: Vec<usize> = Vec::new();
    if first {
        candidates = pool
            .iter()
            .copied()
            .filter(|&g| groups[g].len() > 1)
            .collect();
        if candidates.is_empty() {
            debug!("No multi-record group to seed from, sampling the whole pool");
        }
    }
    if candidates.is_empty() {
        candidates = pool.to_vec();
    }
    candidates[seeds.pick(candidates.len()) % candidates.len()]
}

/// Unassigned groups owning at least one record inside the seed group's
/// `mean ± 2·stddev` box. Falls back to the seed alone.
pub(crate) fn neighborhood(
    tree: &RTree<IndexedRecord>,
    groups: &[GroupGeometry],
    seed: usize,
    pool: &[usize],
) -> Vec<usize> {
    let (lo, hi) = groups[seed].search_box();
    let pooled: BTreeSet<usize> = pool.iter().copied().collect();
    let near: Vec<usize> = groups_in_box(tree, lo, hi)
        .into_iter()
        .filter(|g| pooled.contains(g))
        .collect();
    if near.is_empty() {
        vec![seed]
    } else {
        near
    }
}
