//! R-tree over individual records, for neighborhood discovery.

use std::collections::BTreeSet;

use rstar::{RTree, RTreeObject, AABB};

use super::GroupGeometry;

/// A record's coordinate tagged with the group it belongs to
#[derive(Debug, Clone, Copy)]
pub struct IndexedRecord {
    pub group: usize,
    pub lat: f64,
    pub lng: f64,
}

impl RTreeObject for IndexedRecord {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.lat, self.lng])
    }
}

/// Build an R-tree holding every record of every group
pub fn build_record_rtree(groups: &[GroupGeometry]) -> RTree<IndexedRecord> {
    let indexed: Vec<IndexedRecord> = groups
        .iter()
        .enumerate()
        .flat_map(|(group, geometry)| {
            geometry.points().iter().map(move |p| IndexedRecord {
                group,
                lat: p.latitude,
                lng: p.longitude,
            })
        })
        .collect();
    RTree::bulk_load(indexed)
}

/// Groups with at least one record inside the box `[lo, hi]` (inclusive),
/// corners given as `[lat, lng]`.
pub fn groups_in_box(tree: &RTree<IndexedRecord>, lo: [f64; 2], hi: [f64; 2]) -> BTreeSet<usize> {
    let envelope = AABB::from_corners(lo, hi);
    tree.locate_in_envelope_intersecting(&envelope)
        .map(|r| r.group)
        .collect()
}
