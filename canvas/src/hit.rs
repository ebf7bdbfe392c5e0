#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::connect::{AnchorSide, vertex_anchors};
use crate::consts::HANDLE_RADIUS_PX;
use crate::doc::{DocStore, ObjectId};
use crate::geom::Point;

/// Anchor under the pointer.
#[derive(Debug, Clone, PartialEq)]
pub struct AnchorHit {
    pub vertex_id: ObjectId,
    pub prop: Option<String>,
    pub side: Option<AnchorSide>,
}

/// Find the active anchor nearest to `pt` within the handle radius.
///
/// Later vertices are drawn above earlier ones and win ties. Vertices hidden
/// inside a collapsed boundary member are skipped.
#[must_use]
pub fn hit_anchor(doc: &DocStore, pt: Point) -> Option<AnchorHit> {
    let metrics = doc.metrics();
    let mut best: Option<(f64, AnchorHit)> = None;
    for vertex in doc.vertices().iter().rev() {
        if !doc.is_shown(&vertex.id) {
            continue;
        }
        for anchor in vertex_anchors(vertex, &metrics) {
            let at = Point::new(vertex.x + anchor.offset.x, vertex.y + anchor.offset.y);
            let dist = at.distance(pt);
            if dist > HANDLE_RADIUS_PX {
                continue;
            }
            if best.as_ref().is_some_and(|(d, _)| *d <= dist) {
                continue;
            }
            let hit = AnchorHit { vertex_id: vertex.id.clone(), prop: anchor.prop, side: anchor.side };
            best = Some((dist, hit));
        }
    }
    best.map(|(_, hit)| hit)
}
