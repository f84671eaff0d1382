//! # Algorithm Toolbox
//!
//! Direct access to the heuristics without going through
//! [`TrajectoryDataset`](crate::TrajectoryDataset). Use these to run a
//! single heuristic over your own groups or trajectories.
//!
//! ## Core Algorithms
//!
//! - **Grouping**: partition a position table by key columns
//! - **Temporal Segmentation**: cut a trajectory at long time gaps
//! - **Spatial Clustering**: spreaddelta, edgedelta and coorddelta
//! - **Motion Features**: sliding-window velocity and turn-rate summaries
//!
//! # Example
//!
//! ```rust
//! use trajectory_heuristics::algorithms::{
//!     cluster_by_edge, GpsPoint, GroupGeometry, ScriptedSeeds,
//! };
//!
//! let groups = vec![
//!     GroupGeometry::new(vec![GpsPoint::new(45.0, 9.0)]),
//!     GroupGeometry::new(vec![GpsPoint::new(45.0, 9.0)]),
//! ];
//! let clusters = cluster_by_edge(&groups, Some(0.0), &mut ScriptedSeeds::new(vec![0])).unwrap();
//! assert_eq!(clusters.cluster_ids, vec![1, 1]);
//! ```

// =============================================================================
// Core Types (re-exported from lib)
// =============================================================================

pub use crate::{GpsPoint, HeuristicConfig, PositionRecord, Rental};

// =============================================================================
// Grouping
// =============================================================================

/// Partition records into groups by key columns, in ascending key order.
pub use crate::grouping::group_positions;
/// Row indices sorted by (server time, device time).
pub use crate::grouping::time_ordered;
pub use crate::grouping::{GroupKey, PositionGroup};

// =============================================================================
// Temporal Segmentation
// =============================================================================

/// Segment one trajectory by time gap.
///
/// Without a fixed threshold, each clock's threshold is its mean gap plus
/// one sample standard deviation. A record flags when both clocks' gaps
/// meet their thresholds.
pub use crate::timedelta::segment_trajectory;
pub use crate::timedelta::{SegmentBoundary, TimeGap, TimeSegmentation};

// =============================================================================
// Spatial Clustering
// =============================================================================

/// Cluster groups by coordinate extent. Deterministic.
pub use crate::clustering::cluster_by_spread;
/// Cluster groups by first and last point.
pub use crate::clustering::cluster_by_edge;
/// Cluster groups by edge and spread together.
pub use crate::clustering::cluster_by_coord;
pub use crate::clustering::{ClusterAssignment, Edge, GroupGeometry, ScriptedSeeds, SeedSource, Spread};

// =============================================================================
// Motion Features
// =============================================================================

/// Sliding-window motion features of one time-ordered trajectory.
pub use crate::features::moving_attributes;
pub use crate::features::{MotionSample, MovingBehaviorFeature, SeriesSummary, FEATURE_COLUMNS};

// =============================================================================
// Statistics
// =============================================================================

pub use crate::stats::{mean, quantile_sorted, sample_std};
