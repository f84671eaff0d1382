//! Sliding-window motion features.
//!
//! A window slides over a time-ordered trajectory. For every window holding
//! more than one record, consecutive differences give four series:
//!
//! - latitude velocity (degrees per second)
//! - longitude velocity (degrees per second)
//! - speed delta
//! - turn-rate delta: the difference of the raw heading
//!   `atan(Δlongitude / Δlatitude)`, itself a difference of coordinates
//!
//! Each series is summarized by mean, max, 75th percentile, median, 25th
//! percentile and min, giving 24 features per window.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TrajectoryError};
use crate::stats::{mean, quantile_sorted};
use crate::timedelta::nanos;
use crate::PositionRecord;

/// Feature column names, in the order of [`MovingBehaviorFeature::values`].
pub const FEATURE_COLUMNS: [&str; 24] = [
    "latitude_velocity_mean",
    "latitude_velocity_max",
    "latitude_velocity_q75",
    "latitude_velocity_median",
    "latitude_velocity_q25",
    "latitude_velocity_min",
    "longitude_velocity_mean",
    "longitude_velocity_max",
    "longitude_velocity_q75",
    "longitude_velocity_median",
    "longitude_velocity_q25",
    "longitude_velocity_min",
    "speed_delta_mean",
    "speed_delta_max",
    "speed_delta_q75",
    "speed_delta_median",
    "speed_delta_q25",
    "speed_delta_min",
    "turn_rate_delta_mean",
    "turn_rate_delta_max",
    "turn_rate_delta_q75",
    "turn_rate_delta_median",
    "turn_rate_delta_q25",
    "turn_rate_delta_min",
];

/// The fields of a position record the extractor reads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionSample {
    pub server_time: DateTime<Utc>,
    pub device_time: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f64,
}

impl From<&PositionRecord> for MotionSample {
    fn from(record: &PositionRecord) -> Self {
        Self {
            server_time: record.server_time,
            device_time: record.device_time,
            latitude: record.latitude,
            longitude: record.longitude,
            speed: record.speed,
        }
    }
}

/// Six-number summary of one series.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SeriesSummary {
    pub mean: f64,
    pub max: f64,
    pub q75: f64,
    pub median: f64,
    pub q25: f64,
    pub min: f64,
}

impl SeriesSummary {
    /// Summarize a series, skipping NaN entries. Any statistic that comes
    /// out undefined or infinite is stored as zero.
    pub fn from_values(values: &[f64]) -> Self {
        let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let stat = |v: Option<f64>| v.filter(|x| x.is_finite()).unwrap_or(0.0);
        Self {
            mean: stat(mean(&sorted)),
            max: stat(sorted.last().copied()),
            q75: stat(quantile_sorted(&sorted, 0.75)),
            median: stat(quantile_sorted(&sorted, 0.50)),
            q25: stat(quantile_sorted(&sorted, 0.25)),
            min: stat(sorted.first().copied()),
        }
    }

    pub fn to_array(&self) -> [f64; 6] {
        [self.mean, self.max, self.q75, self.median, self.q25, self.min]
    }
}

/// Motion features of one window of one trajectory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovingBehaviorFeature {
    /// Key values of the trajectory (as grouped by the caller)
    pub group_key: Vec<i64>,
    /// Sequence number of the window within its trajectory, from 0
    pub window_id: u32,
    /// Index of the window's first record within the trajectory
    pub window_start: usize,
    pub latitude_velocity: SeriesSummary,
    pub longitude_velocity: SeriesSummary,
    pub speed_delta: SeriesSummary,
    pub turn_rate_delta: SeriesSummary,
}

impl MovingBehaviorFeature {
    /// The 24 feature values, in [`FEATURE_COLUMNS`] order.
    pub fn values(&self) -> [f64; 24] {
        let mut out = [0.0; 24];
        let series = [
            &self.latitude_velocity,
            &self.longitude_velocity,
            &self.speed_delta,
            &self.turn_rate_delta,
        ];
        for (chunk, summary) in out.chunks_exact_mut(6).zip(series) {
            chunk.copy_from_slice(&summary.to_array());
        }
        out
    }
}

/// Reject window sizes that would never advance.
pub(crate) fn check_window(width: usize, offset: usize) -> Result<()> {
    if width == 0 {
        return Err(TrajectoryError::invalid_parameter(
            "window_width",
            "window width must be at least 1",
        ));
    }
    if offset == 0 {
        return Err(TrajectoryError::invalid_parameter(
            "window_offset",
            "window offset must be at least 1",
        ));
    }
    Ok(())
}

/// Slide a `width`-record window over a time-ordered trajectory, `offset`
/// records at a time, and summarize each window's motion.
///
/// The last window may be shorter than `width`. Windows holding a single
/// record produce no row. The returned rows carry an empty `group_key`.
pub fn moving_attributes(
    trajectory: &[MotionSample],
    width: usize,
    offset: usize,
) -> Result<Vec<MovingBehaviorFeature>> {
    check_window(width, offset)?;

    let len = trajectory.len();
    let mut rows = Vec::new();
    let mut start = 0usize;
    let mut window_id = 0u32;

    while start < len {
        let end = (start + width).min(len);
        let window = &trajectory[start..end];

        if window.len() > 1 {
            rows.push(window_features(window, window_id, start));
            window_id += 1;
        }

        if start + width >= len {
            break;
        }
        start += offset;
    }

    Ok(rows)
}

fn window_features(window: &[MotionSample], window_id: u32, window_start: usize) -> MovingBehaviorFeature {
    let steps = window.len() - 1;
    let mut latitude_velocity = Vec::with_capacity(steps);
    let mut longitude_velocity = Vec::with_capacity(steps);
    let mut speed_delta = Vec::with_capacity(steps);
    let mut turn_rate_delta = Vec::with_capacity(steps);

    let mut prev_heading = 0.0;
    for pair in window.windows(2) {
        let (prev, curr) = (&pair[0], &pair[1]);

        let elapsed_ns = (nanos(curr.server_time - prev.server_time)
            + nanos(curr.device_time - prev.device_time))
            / 2.0;
        let elapsed_secs = elapsed_ns / 1e9;

        let d_lat = curr.latitude - prev.latitude;
        let d_lng = curr.longitude - prev.longitude;

        latitude_velocity.push(d_lat / elapsed_secs);
        longitude_velocity.push(d_lng / elapsed_secs);
        speed_delta.push(curr.speed - prev.speed);

        // 0/0 has no heading
        let heading = (d_lng / d_lat).atan();
        let heading = if heading.is_nan() { 0.0 } else { heading };
        turn_rate_delta.push(heading - prev_heading);
        prev_heading = heading;
    }

    MovingBehaviorFeature {
        group_key: Vec::new(),
        window_id,
        window_start,
        latitude_velocity: SeriesSummary::from_values(&latitude_velocity),
        longitude_velocity: SeriesSummary::from_values(&longitude_velocity),
        speed_delta: SeriesSummary::from_values(&speed_delta),
        turn_rate_delta: SeriesSummary::from_values(&turn_rate_delta),
    }
}
