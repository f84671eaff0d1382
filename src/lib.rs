//! # Trajectory Heuristics
//!
//! Trajectory segmentation, spatial clustering and motion feature extraction
//! for shared micro-mobility GPS data (scooters, bikes).
//!
//! This library provides:
//! - Temporal segmentation of a rental's pings into trips (`timedelta`)
//! - Spatial clustering of trajectories by spread, edge, or both
//! - Sliding-window motion features (velocity, speed and turn-rate deltas)
//!
//! ## Features
//!
//! - **`parallel`** - Process independent trajectories with rayon
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use trajectory_heuristics::{GpsPoint, GroupKey, PositionRecord, Rental, TrajectoryDataset};
//!
//! let start = Utc.with_ymd_and_hms(2020, 6, 1, 8, 0, 0).unwrap();
//! let positions: Vec<PositionRecord> = (0..6)
//!     .map(|i| {
//!         PositionRecord::new(
//!             1,
//!             7,
//!             start + chrono::TimeDelta::seconds(i * 5),
//!             GpsPoint::new(45.0 + i as f64 * 0.0001, 9.0),
//!         )
//!     })
//!     .collect();
//! let rentals = vec![Rental::new(1, 7, 42, start, start + chrono::TimeDelta::hours(1))];
//!
//! let mut dataset = TrajectoryDataset::new(positions, rentals);
//! dataset.timedelta_heuristic().unwrap();
//! dataset.spreaddelta_heuristic(&[GroupKey::RentalId]).unwrap();
//! dataset.edgedelta_heuristic(&[GroupKey::RentalId]).unwrap();
//! dataset.coorddelta_heuristic(&[GroupKey::RentalId]).unwrap();
//! assert!(!dataset.heuristic_empty());
//! ```

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{OptionExt, Result, TrajectoryError};

// Descriptive statistics shared by every heuristic
pub mod stats;

// Grouping of position records by key columns
pub mod grouping;
pub use grouping::{group_positions, time_ordered, GroupKey, PositionGroup};

// Temporal segmentation (timedelta heuristic)
pub mod timedelta;
pub use timedelta::{segment_trajectory, SegmentBoundary, TimeGap, TimeSegmentation};

// Spatial clustering (spreaddelta, edgedelta, coorddelta heuristics)
pub mod clustering;
pub use clustering::{
    cluster_by_coord, cluster_by_edge, cluster_by_spread, ClusterAssignment, Edge,
    GroupGeometry, ScriptedSeeds, SeedSource, Spread,
};

// Sliding-window motion features
pub mod features;
pub use features::{
    moving_attributes, MotionSample, MovingBehaviorFeature, SeriesSummary, FEATURE_COLUMNS,
};

// Stateful dataset holding the annotated tables
pub mod dataset;
pub use dataset::{DatasetStats, RentalTrajectory, TrajectoryDataset};

// Algorithm toolbox - standalone access to the heuristics
pub mod algorithms;

// ============================================================================
// Core Types
// ============================================================================

/// A GPS coordinate with latitude and longitude.
///
/// # Example
/// ```
/// use trajectory_heuristics::GpsPoint;
/// let point = GpsPoint::new(45.0703, 7.6869); // Turin
/// assert!(point.is_valid());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GpsPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GpsPoint {
    /// Create a new GPS point.
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Check if the point has valid coordinates.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }
}

/// A single position ping of a vehicle, joined to its rental.
///
/// The heuristic columns start unset and are filled in place by the
/// heuristics of [`TrajectoryDataset`].
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PositionRecord {
    pub position_id: i64,
    pub device_id: i64,
    pub rental_id: i64,
    /// Time the server received the ping
    pub server_time: DateTime<Utc>,
    /// Time the device recorded the ping
    pub device_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,

    // Heuristic columns
    pub timedelta_id: Option<u32>,
    /// Mean of the server and device gaps to the previous ping of the rental
    #[serde(default, with = "duration_ms")]
    pub time_gap: Option<TimeDelta>,
    pub spreaddelta_id: Option<u32>,
    pub edgedelta_id: Option<u32>,
    pub coorddelta_id: Option<u32>,
    pub spread_latitude: Option<f64>,
    pub spread_longitude: Option<f64>,
    pub edge_latitude_start: Option<f64>,
    pub edge_longitude_start: Option<f64>,
    pub edge_latitude_stop: Option<f64>,
    pub edge_longitude_stop: Option<f64>,
}

impl PositionRecord {
    /// Create a record whose server and device clocks agree.
    pub fn new(rental_id: i64, device_id: i64, time: DateTime<Utc>, point: GpsPoint) -> Self {
        Self {
            device_id,
            rental_id,
            server_time: time,
            device_time: time,
            latitude: point.latitude,
            longitude: point.longitude,
            ..Default::default()
        }
    }

    pub fn with_position_id(mut self, position_id: i64) -> Self {
        self.position_id = position_id;
        self
    }

    pub fn with_device_time(mut self, device_time: DateTime<Utc>) -> Self {
        self.device_time = device_time;
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = speed;
        self
    }

    pub fn point(&self) -> GpsPoint {
        GpsPoint::new(self.latitude, self.longitude)
    }

    /// True if any heuristic column is still unset.
    pub fn heuristic_empty(&self) -> bool {
        self.timedelta_id.is_none()
            || self.time_gap.is_none()
            || self.spreaddelta_id.is_none()
            || self.edgedelta_id.is_none()
            || self.coorddelta_id.is_none()
            || self.spread_latitude.is_none()
            || self.spread_longitude.is_none()
            || self.edge_latitude_start.is_none()
            || self.edge_longitude_start.is_none()
            || self.edge_latitude_stop.is_none()
            || self.edge_longitude_stop.is_none()
    }

    pub(crate) fn set_spread(&mut self, spread: &Spread) {
        self.spread_latitude = Some(spread.latitude);
        self.spread_longitude = Some(spread.longitude);
    }

    pub(crate) fn set_edge(&mut self, edge: &Edge) {
        self.edge_latitude_start = Some(edge.latitude_start);
        self.edge_longitude_start = Some(edge.longitude_start);
        self.edge_latitude_stop = Some(edge.latitude_stop);
        self.edge_longitude_stop = Some(edge.longitude_stop);
    }
}

/// A rental: one user riding one device over a time window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rental {
    pub rental_id: i64,
    pub device_id: i64,
    pub user_id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl Rental {
    pub fn new(
        rental_id: i64,
        device_id: i64,
        user_id: i64,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    ) -> Self {
        Self {
            rental_id,
            device_id,
            user_id,
            start_time,
            end_time,
        }
    }

    /// Check whether a ping belongs to this rental: same device, and both
    /// clocks inside the rental window (inclusive).
    pub fn covers(&self, position: &PositionRecord) -> bool {
        position.device_id == self.device_id
            && position.server_time >= self.start_time
            && position.device_time >= self.start_time
            && position.server_time <= self.end_time
            && position.device_time <= self.end_time
    }
}

/// Configuration for the heuristics.
///
/// Every delta left as `None` is derived from the data at run time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicConfig {
    /// Fixed gap threshold in milliseconds for the timedelta heuristic.
    pub timedelta_ms: Option<i64>,

    /// Segment numbering rule for the timedelta heuristic.
    ///
    /// `RegimeChange` advances the id whenever the long-gap flag flips, so a
    /// lone long gap forms its own block: pings at 0, 1, 2, 100, 101 s with a
    /// 10 s threshold give `[1, 1, 1, 2, 3]`. `GapStart` opens one segment per
    /// long gap and gives `[1, 1, 1, 2, 2]` for the same pings.
    /// Default: `SegmentBoundary::RegimeChange`
    pub segment_boundary: SegmentBoundary,

    /// Fixed spread tolerance (degrees) for the spreaddelta heuristic.
    pub spreaddelta: Option<f64>,

    /// Fixed edge tolerance (degrees) for the edgedelta heuristic.
    pub edgedelta: Option<f64>,

    /// Fixed spread tolerance (degrees) for the coorddelta heuristic.
    pub coorddelta_spread: Option<f64>,

    /// Fixed edge tolerance (degrees) for the coorddelta heuristic.
    pub coorddelta_edge: Option<f64>,

    /// Sliding window width in records.
    /// Default: 10
    pub window_width: usize,

    /// Sliding window step in records. Default: half the width.
    pub window_offset: Option<usize>,

    /// Seed for the clusterers' random source. Default: from entropy.
    pub seed: Option<u64>,
}

/// Default sliding window width for motion features.
pub const DEFAULT_WINDOW_WIDTH: usize = 10;

impl Default for HeuristicConfig {
    fn default() -> Self {
        Self {
            timedelta_ms: None,
            segment_boundary: SegmentBoundary::RegimeChange,
            spreaddelta: None,
            edgedelta: None,
            coorddelta_spread: None,
            coorddelta_edge: None,
            window_width: DEFAULT_WINDOW_WIDTH,
            window_offset: None,
            seed: None,
        }
    }
}

impl HeuristicConfig {
    /// Fixed timedelta threshold, if configured.
    pub fn timedelta(&self) -> Option<TimeDelta> {
        self.timedelta_ms.map(TimeDelta::milliseconds)
    }

    /// Effective sliding window step.
    ///
    /// Without an explicit offset this is half the configured width (at
    /// least 1), so a custom width also scales the step rather than keeping
    /// half of [`DEFAULT_WINDOW_WIDTH`].
    pub fn effective_window_offset(&self) -> usize {
        self.window_offset.unwrap_or((self.window_width / 2).max(1))
    }

    /// Check every override for range errors.
    pub fn validate(&self) -> Result<()> {
        let deltas = [
            ("spreaddelta", self.spreaddelta),
            ("edgedelta", self.edgedelta),
            ("coorddelta_spread", self.coorddelta_spread),
            ("coorddelta_edge", self.coorddelta_edge),
        ];
        for (name, delta) in deltas {
            if let Some(delta) = delta {
                clustering::check_delta(name, delta)?;
            }
        }
        features::check_window(self.window_width, self.effective_window_offset())
    }
}

/// Serde helper storing an optional `TimeDelta` as whole milliseconds.
mod duration_ms {
    use chrono::TimeDelta;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<TimeDelta>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(delta) => serializer.serialize_some(&delta.num_milliseconds()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<TimeDelta>, D::Error> {
        let millis: Option<i64> = Option::deserialize(deserializer)?;
        Ok(millis.map(TimeDelta::milliseconds))
    }
}

// ============================================================================
// Tests
// ============================================================================
