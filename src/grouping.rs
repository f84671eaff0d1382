//! Grouping of position records.
//!
//! Every heuristic works on groups of records sharing one or more key
//! columns: a rental, a device, a rental's time segment, a spatial cluster.
//! Groups come out in ascending key order and keep their rows in table
//! order, so runs over the same table are reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrajectoryError};
use crate::PositionRecord;

/// A position column usable as a grouping key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupKey {
    DeviceId,
    RentalId,
    TimedeltaId,
    SpreaddeltaId,
    EdgedeltaId,
    CoorddeltaId,
}

impl GroupKey {
    /// Column name of this key.
    pub fn column(&self) -> &'static str {
        match self {
            GroupKey::DeviceId => "device_id",
            GroupKey::RentalId => "rental_id",
            GroupKey::TimedeltaId => "timedelta_id",
            GroupKey::SpreaddeltaId => "spreaddelta_id",
            GroupKey::EdgedeltaId => "edgedelta_id",
            GroupKey::CoorddeltaId => "coorddelta_id",
        }
    }

    /// Value of this key on a record; `None` if the heuristic column is unset.
    pub fn value(&self, record: &PositionRecord) -> Option<i64> {
        match self {
            GroupKey::DeviceId => Some(record.device_id),
            GroupKey::RentalId => Some(record.rental_id),
            GroupKey::TimedeltaId => record.timedelta_id.map(i64::from),
            GroupKey::SpreaddeltaId => record.spreaddelta_id.map(i64::from),
            GroupKey::EdgedeltaId => record.edgedelta_id.map(i64::from),
            GroupKey::CoorddeltaId => record.coorddelta_id.map(i64::from),
        }
    }
}

/// Records sharing one key value.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionGroup {
    /// Key column values, in the order the keys were given
    pub key: Vec<i64>,
    /// Row indices into the position table, in table order
    pub indices: Vec<usize>,
}

impl PositionGroup {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}

/// Partition a position table into disjoint groups by key columns.
///
/// An empty key list puts the whole table into one group.
pub fn group_positions(records: &[PositionRecord], keys: &[GroupKey]) -> Result<Vec<PositionGroup>> {
    for key in keys {
        let missing = records.iter().filter(|r| key.value(r).is_none()).count();
        if missing > 0 {
            return Err(TrajectoryError::MissingColumn {
                column: key.column().to_string(),
                missing,
            });
        }
    }

    let mut groups: BTreeMap<Vec<i64>, Vec<usize>> = BTreeMap::new();
    for (idx, record) in records.iter().enumerate() {
        let key: Vec<i64> = keys.iter().filter_map(|k| k.value(record)).collect();
        groups.entry(key).or_default().push(idx);
    }

    Ok(groups
        .into_iter()
        .map(|(key, indices)| PositionGroup { key, indices })
        .collect())
}

/// Sort row indices by timestamp (server time, then device time).
///
/// The sort is stable: rows with equal timestamps keep their table order.
pub fn time_ordered(records: &[PositionRecord], indices: &[usize]) -> Vec<usize> {
    let mut ordered = indices.to_vec();
    ordered.sort_by_key(|&i| (records[i].server_time, records[i].device_time));
    ordered
}
