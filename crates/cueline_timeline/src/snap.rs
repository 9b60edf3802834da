// SPDX-License-Identifier: MIT OR Apache-2.0
//! Snap targets derived from a resolved timeline.

use crate::element::{ElementId, Time};
use crate::resolver::ResolvedTimeline;
use std::collections::BTreeSet;

/// An edge that dragged elements can lock onto
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapPoint {
    /// Element owning the edge
    pub element_id: ElementId,
    /// Time of the edge
    pub time: Time,
    /// Expression naming the edge, e.g. `#intro.end`
    pub expression: String,
    /// Comma-separated IDs of elements this one references or is referenced by
    pub referring: String,
}

/// Build snap points for every single-instance element, sorted by time.
///
/// Points with equal times keep timeline order.
pub fn build_snap_points(resolved: &ResolvedTimeline) -> Vec<SnapPoint> {
    let mut points = Vec::with_capacity(resolved.len() * 2);

    for object in resolved.objects.values() {
        if object.multi_instance {
            continue;
        }
        let Some(instance) = object.instance() else {
            continue;
        };

        let mut referring: BTreeSet<&str> = instance
            .direct_references
            .iter()
            .map(ElementId::as_str)
            .collect();
        for other in resolved.objects.values() {
            let refers_here = other
                .instances
                .iter()
                .any(|i| i.direct_references.contains(&object.id));
            if refers_here {
                referring.insert(other.id.as_str());
            }
        }
        let referring = referring.into_iter().collect::<Vec<_>>().join(",");

        points.push(SnapPoint {
            element_id: object.id.clone(),
            time: instance.start,
            expression: format!("#{}.start", object.id),
            referring: referring.clone(),
        });
        if let Some(end) = instance.end {
            points.push(SnapPoint {
                element_id: object.id.clone(),
                time: end,
                expression: format!("#{}.end", object.id),
                referring,
            });
        }
    }

    points.sort_by_key(|p| p.time);
    points
}

/// Closest point to `time` that is not excluded, with its distance.
///
/// `points` must be sorted by time. On equal distance the earlier point wins.
pub fn nearest_snap_point<'a>(
    points: &'a [SnapPoint],
    time: Time,
    exclude: impl Fn(&SnapPoint) -> bool,
) -> Option<(&'a SnapPoint, Time)> {
    let split = points.partition_point(|p| p.time < time);

    let before = points[..split].iter().rev().find(|p| !exclude(p));
    let after = points[split..].iter().find(|p| !exclude(p));

    match (before, after) {
        (Some(b), Some(a)) => {
            let (db, da) = (time.saturating_sub(b.time), a.time.saturating_sub(time));
            if db <= da {
                Some((b, db))
            } else {
                Some((a, da))
            }
        }
        (Some(b), None) => Some((b, time.saturating_sub(b.time))),
        (None, Some(a)) => Some((a, a.time.saturating_sub(time))),
        (None, None) => None,
    }
}
