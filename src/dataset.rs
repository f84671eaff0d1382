//! Stateful dataset that runs the heuristics over its tables.
//!
//! `TrajectoryDataset` owns the position table, the rental table and the
//! motion feature table. Heuristics annotate the position table in place;
//! feature extraction replaces the feature table on every run.
//!
//! ```rust
//! use chrono::{TimeDelta, TimeZone, Utc};
//! use trajectory_heuristics::{GpsPoint, GroupKey, PositionRecord, TrajectoryDataset};
//!
//! let start = Utc.with_ymd_and_hms(2020, 6, 1, 8, 0, 0).unwrap();
//! let positions = (0..4)
//!     .map(|i| PositionRecord::new(1, 7, start + TimeDelta::seconds(i), GpsPoint::new(45.0, 9.0)))
//!     .collect();
//!
//! let mut dataset = TrajectoryDataset::new(positions, Vec::new());
//! dataset.moving_behavior_feature_extraction(&[GroupKey::RentalId]).unwrap();
//! assert_eq!(dataset.moving_behavior_features().len(), 1);
//! ```

use std::collections::BTreeSet;
use std::time::Instant;

use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::clustering::{
    cluster_by_coord, cluster_by_edge, cluster_by_spread, ClusterAssignment, GroupGeometry,
};
use crate::error::{Result, TrajectoryError};
use crate::features::{moving_attributes, MotionSample, MovingBehaviorFeature};
use crate::grouping::{group_positions, time_ordered, GroupKey, PositionGroup};
use crate::timedelta::{segment_trajectory, TimeSegmentation};
use crate::{HeuristicConfig, PositionRecord, Rental};

/// Positions covered by one rental, in time order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RentalTrajectory {
    pub rental_id: i64,
    pub position_ids: Vec<i64>,
}

/// Dataset statistics for monitoring.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DatasetStats {
    pub position_count: usize,
    pub rental_count: usize,
    pub feature_count: usize,
    /// Distinct (rental, segment) pairs
    pub timedelta_segments: usize,
    pub spreaddelta_clusters: usize,
    pub edgedelta_clusters: usize,
    pub coorddelta_clusters: usize,
}

/// Position, rental and feature tables plus the heuristics that fill them.
pub struct TrajectoryDataset {
    positions: Vec<PositionRecord>,
    rentals: Vec<Rental>,
    moving_behavior_features: Vec<MovingBehaviorFeature>,
    config: HeuristicConfig,
    rng: StdRng,
}

impl TrajectoryDataset {
    /// Create a dataset with default configuration.
    pub fn new(positions: Vec<PositionRecord>, rentals: Vec<Rental>) -> Self {
        Self::with_config(positions, rentals, HeuristicConfig::default())
    }

    /// Create a dataset with custom configuration.
    pub fn with_config(
        positions: Vec<PositionRecord>,
        rentals: Vec<Rental>,
        config: HeuristicConfig,
    ) -> Self {
        let rng = seeded_rng(&config);
        Self {
            positions,
            rentals,
            moving_behavior_features: Vec::new(),
            config,
            rng,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn positions(&self) -> &[PositionRecord] {
        &self.positions
    }

    pub fn rentals(&self) -> &[Rental] {
        &self.rentals
    }

    pub fn moving_behavior_features(&self) -> &[MovingBehaviorFeature] {
        &self.moving_behavior_features
    }

    pub fn config(&self) -> &HeuristicConfig {
        &self.config
    }

    /// Replace the configuration. Reseeds the random source.
    pub fn set_config(&mut self, config: HeuristicConfig) {
        self.rng = seeded_rng(&config);
        self.config = config;
    }

    /// True if the position or rental table is empty.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty() || self.rentals.is_empty()
    }

    /// True if any record has any heuristic column unset.
    pub fn heuristic_empty(&self) -> bool {
        self.positions.iter().any(PositionRecord::heuristic_empty)
    }

    // ========================================================================
    // Timedelta
    // ========================================================================

    /// Segment every rental's pings by time gap.
    ///
    /// Writes `timedelta_id` and `time_gap` on every record.
    pub fn timedelta_heuristic(&mut self) -> Result<()> {
        self.prepare()?;
        let start = Instant::now();

        let groups = group_positions(&self.positions, &[GroupKey::RentalId])?;
        let threshold = self.config.timedelta();
        let boundary = self.config.segment_boundary;
        let positions = &self.positions;

        let segment = |group: &PositionGroup| -> (Vec<usize>, TimeSegmentation) {
            let ordered = time_ordered(positions, &group.indices);
            let times: Vec<_> = ordered
                .iter()
                .map(|&i| (positions[i].server_time, positions[i].device_time))
                .collect();
            let segmentation = segment_trajectory(&times, threshold, boundary);
            (ordered, segmentation)
        };

        #[cfg(feature = "parallel")]
        let results: Vec<(Vec<usize>, TimeSegmentation)> = groups.par_iter().map(segment).collect();

        #[cfg(not(feature = "parallel"))]
        let results: Vec<(Vec<usize>, TimeSegmentation)> = groups.iter().map(segment).collect();

        let mut segment_count = 0usize;
        for (ordered, segmentation) in results {
            segment_count += segmentation.segment_ids.last().copied().unwrap_or(0) as usize;
            for ((row, id), gap) in ordered
                .into_iter()
                .zip(segmentation.segment_ids)
                .zip(segmentation.gaps)
            {
                let record = &mut self.positions[row];
                record.timedelta_id = Some(id);
                record.time_gap = Some(gap.mean());
            }
        }

        info!(
            "[Timedelta] Segmented {} rentals into {} segments in {}ms",
            groups.len(),
            segment_count,
            start.elapsed().as_millis()
        );
        Ok(())
    }

    // ========================================================================
    // Spatial clustering
    // ========================================================================

    /// Cluster the groups formed by `groupby` by spread.
    ///
    /// Writes `spreaddelta_id` and the spread columns on every record.
    pub fn spreaddelta_heuristic(&mut self, groupby: &[GroupKey]) -> Result<()> {
        self.prepare()?;
        let start = Instant::now();

        let (groups, geometries) = self.group_geometries(groupby)?;
        let assignment = cluster_by_spread(&geometries, self.config.spreaddelta)?;

        for (g, group) in groups.iter().enumerate() {
            let spread = geometries[g].spread();
            for &row in &group.indices {
                let record = &mut self.positions[row];
                record.spreaddelta_id = Some(assignment.cluster_ids[g]);
                record.set_spread(&spread);
            }
        }

        log_clusters("Spreaddelta", &groups, &assignment, start);
        Ok(())
    }

    /// Cluster the groups formed by `groupby` by edge.
    ///
    /// Writes `edgedelta_id` and the edge columns on every record.
    pub fn edgedelta_heuristic(&mut self, groupby: &[GroupKey]) -> Result<()> {
        self.prepare()?;
        let start = Instant::now();

        let (groups, geometries) = self.group_geometries(groupby)?;
        let assignment = cluster_by_edge(&geometries, self.config.edgedelta, &mut self.rng)?;

        for (g, group) in groups.iter().enumerate() {
            let edge = geometries[g].edge();
            for &row in &group.indices {
                let record = &mut self.positions[row];
                record.edgedelta_id = Some(assignment.cluster_ids[g]);
                record.set_edge(&edge);
            }
        }

        log_clusters("Edgedelta", &groups, &assignment, start);
        Ok(())
    }

    /// Cluster the groups formed by `groupby` by edge and spread together.
    ///
    /// Writes `coorddelta_id` and both statistic column sets on every record.
    pub fn coorddelta_heuristic(&mut self, groupby: &[GroupKey]) -> Result<()> {
        self.prepare()?;
        let start = Instant::now();

        let (groups, geometries) = self.group_geometries(groupby)?;
        let assignment = cluster_by_coord(
            &geometries,
            self.config.coorddelta_spread,
            self.config.coorddelta_edge,
            &mut self.rng,
        )?;

        for (g, group) in groups.iter().enumerate() {
            let (spread, edge) = (geometries[g].spread(), geometries[g].edge());
            for &row in &group.indices {
                let record = &mut self.positions[row];
                record.coorddelta_id = Some(assignment.cluster_ids[g]);
                record.set_spread(&spread);
                record.set_edge(&edge);
            }
        }

        log_clusters("Coorddelta", &groups, &assignment, start);
        Ok(())
    }

    // ========================================================================
    // Motion features
    // ========================================================================

    /// Extract sliding-window motion features per trajectory, where a
    /// trajectory is the set of records sharing the `groupby` keys.
    ///
    /// Replaces the feature table.
    pub fn moving_behavior_feature_extraction(&mut self, groupby: &[GroupKey]) -> Result<()> {
        self.prepare()?;
        let start = Instant::now();

        let groups = group_positions(&self.positions, groupby)?;
        let width = self.config.window_width;
        let offset = self.config.effective_window_offset();
        let positions = &self.positions;

        let extract = |group: &PositionGroup| -> Result<Vec<MovingBehaviorFeature>> {
            let samples: Vec<MotionSample> = time_ordered(positions, &group.indices)
                .into_iter()
                .map(|i| MotionSample::from(&positions[i]))
                .collect();
            let mut rows = moving_attributes(&samples, width, offset)?;
            for row in &mut rows {
                row.group_key = group.key.clone();
            }
            Ok(rows)
        };

        #[cfg(feature = "parallel")]
        let per_group: Vec<Vec<MovingBehaviorFeature>> =
            groups.par_iter().map(extract).collect::<Result<_>>()?;

        #[cfg(not(feature = "parallel"))]
        let per_group: Vec<Vec<MovingBehaviorFeature>> =
            groups.iter().map(extract).collect::<Result<_>>()?;

        self.moving_behavior_features = per_group.into_iter().flatten().collect();

        info!(
            "[MovingBehavior] Extracted {} windows from {} trajectories in {}ms",
            self.moving_behavior_features.len(),
            groups.len(),
            start.elapsed().as_millis()
        );
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Position ids covered by each rental, in time order. Rentals without
    /// positions are left out.
    pub fn rental_trajectories(&self) -> Vec<RentalTrajectory> {
        self.rentals
            .iter()
            .filter_map(|rental| {
                let covered: Vec<usize> = self
                    .positions
                    .iter()
                    .enumerate()
                    .filter(|(_, p)| rental.covers(p))
                    .map(|(i, _)| i)
                    .collect();
                if covered.is_empty() {
                    return None;
                }
                let position_ids = time_ordered(&self.positions, &covered)
                    .into_iter()
                    .map(|i| self.positions[i].position_id)
                    .collect();
                Some(RentalTrajectory {
                    rental_id: rental.rental_id,
                    position_ids,
                })
            })
            .collect()
    }

    /// Get dataset statistics.
    pub fn stats(&self) -> DatasetStats {
        let distinct = |id: fn(&PositionRecord) -> Option<u32>| {
            self.positions.iter().filter_map(id).collect::<BTreeSet<_>>().len()
        };
        let segments: BTreeSet<(i64, u32)> = self
            .positions
            .iter()
            .filter_map(|p| p.timedelta_id.map(|id| (p.rental_id, id)))
            .collect();

        DatasetStats {
            position_count: self.positions.len(),
            rental_count: self.rentals.len(),
            feature_count: self.moving_behavior_features.len(),
            timedelta_segments: segments.len(),
            spreaddelta_clusters: distinct(|p| p.spreaddelta_id),
            edgedelta_clusters: distinct(|p| p.edgedelta_id),
            coorddelta_clusters: distinct(|p| p.coorddelta_id),
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn prepare(&self) -> Result<()> {
        if self.positions.is_empty() {
            return Err(TrajectoryError::EmptyDataset {
                table: "position".to_string(),
            });
        }
        if let Some(bad) = self.positions.iter().find(|p| !p.point().is_valid()) {
            return Err(TrajectoryError::InvalidCoordinates {
                position_id: bad.position_id,
                latitude: bad.latitude,
                longitude: bad.longitude,
            });
        }
        self.config.validate()
    }

    fn group_geometries(
        &self,
        groupby: &[GroupKey],
    ) -> Result<(Vec<PositionGroup>, Vec<GroupGeometry>)> {
        let groups = group_positions(&self.positions, groupby)?;
        let geometries = groups
            .iter()
            .map(|group| GroupGeometry::from_records(&self.positions, group))
            .collect();
        Ok((groups, geometries))
    }
}

fn seeded_rng(config: &HeuristicConfig) -> StdRng {
    config
        .seed
        .map_or_else(StdRng::from_entropy, StdRng::seed_from_u64)
}

fn log_clusters(
    component: &str,
    groups: &[PositionGroup],
    assignment: &ClusterAssignment,
    start: Instant,
) {
    info!(
        "[{}] Clustered {} groups into {} clusters in {}ms",
        component,
        groups.len(),
        assignment.cluster_count,
        start.elapsed().as_millis()
    );
}
