//! Temporal segmentation of a rental's pings (timedelta heuristic).
//!
//! A rental's ping stream is cut into segments wherever the time since the
//! previous ping grows past a threshold on both clocks. Without a fixed
//! threshold, each clock gets its own: mean gap plus one standard deviation,
//! i.e. roughly the 84th percentile of a half-normal gap distribution.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::stats::{mean, sample_std};

/// How gap flags turn into segment ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SegmentBoundary {
    /// The id advances every time the gap flag differs from the previous
    /// record's flag. A run of consecutive long gaps forms one block.
    #[default]
    RegimeChange,
    /// Every record whose gap meets the threshold opens a new segment.
    GapStart,
}

/// Gap between a ping and its predecessor, per clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeGap {
    pub server: TimeDelta,
    pub device: TimeDelta,
}

impl TimeGap {
    pub fn zero() -> Self {
        Self {
            server: TimeDelta::zero(),
            device: TimeDelta::zero(),
        }
    }

    /// Mean of the two clocks' gaps.
    pub fn mean(&self) -> TimeDelta {
        (self.server + self.device) / 2
    }
}

/// Result of segmenting one trajectory.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSegmentation {
    /// Segment id per record, starting at 1, non-decreasing
    pub segment_ids: Vec<u32>,
    /// Gap to the previous record; zero for the first one
    pub gaps: Vec<TimeGap>,
    /// Threshold applied on each clock
    pub threshold: TimeGap,
}

/// Segment one trajectory given its `(server_time, device_time)` pairs in
/// time order.
///
/// `threshold` fixes the gap threshold for both clocks; `None` derives one
/// per clock from the trajectory itself.
pub fn segment_trajectory(
    times: &[(DateTime<Utc>, DateTime<Utc>)],
    threshold: Option<TimeDelta>,
    boundary: SegmentBoundary,
) -> TimeSegmentation {
    let gaps: Vec<TimeGap> = times
        .iter()
        .enumerate()
        .map(|(i, &(server, device))| {
            if i == 0 {
                TimeGap::zero()
            } else {
                let (prev_server, prev_device) = times[i - 1];
                TimeGap {
                    server: server - prev_server,
                    device: device - prev_device,
                }
            }
        })
        .collect();

    let server_ns: Vec<f64> = gaps.iter().map(|g| nanos(g.server)).collect();
    let device_ns: Vec<f64> = gaps.iter().map(|g| nanos(g.device)).collect();

    let (server_threshold, device_threshold) = match threshold {
        Some(t) => (nanos(t), nanos(t)),
        None => (
            mean(&server_ns).unwrap_or(0.0) + sample_std(&server_ns),
            mean(&device_ns).unwrap_or(0.0) + sample_std(&device_ns),
        ),
    };

    let flags: Vec<bool> = server_ns
        .iter()
        .zip(&device_ns)
        .map(|(&s, &d)| s >= server_threshold && d >= device_threshold)
        .collect();

    TimeSegmentation {
        segment_ids: number_segments(&flags, boundary),
        gaps,
        threshold: TimeGap {
            server: TimeDelta::nanoseconds(server_threshold.round() as i64),
            device: TimeDelta::nanoseconds(device_threshold.round() as i64),
        },
    }
}

fn number_segments(flags: &[bool], boundary: SegmentBoundary) -> Vec<u32> {
    let mut ids = Vec::with_capacity(flags.len());
    match boundary {
        SegmentBoundary::RegimeChange => {
            let mut id = 0u32;
            let mut prev: Option<bool> = None;
            for &flag in flags {
                if prev != Some(flag) {
                    id += 1;
                }
                prev = Some(flag);
                ids.push(id);
            }
        }
        SegmentBoundary::GapStart => {
            let mut id = 1u32;
            for (i, &flag) in flags.iter().enumerate() {
                if i > 0 && flag {
                    id += 1;
                }
                ids.push(id);
            }
        }
    }
    ids
}

pub(crate) fn nanos(delta: TimeDelta) -> f64 {
    delta
        .num_nanoseconds()
        .map(|n| n as f64)
        .unwrap_or_else(|| delta.num_milliseconds() as f64 * 1e6)
}
