// SPDX-License-Identifier: MIT OR Apache-2.0
//! Converting pointer drags into timing changes.

use crate::cache::ResolverCache;
use crate::element::{ElementId, Time, TimeExpr, TimedElement};
use crate::resolver::{resolve, ResolveError, ResolvedInstance, ResolvedTimeline};
use crate::snap::{nearest_snap_point, SnapPoint};
use std::collections::HashSet;

/// What kind of pointer event produced the movement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// The pointer is still dragging; snapping applies
    Active,
    /// The drag has finished; the delta is taken as is
    WasMoved,
}

/// Inputs of one movement evaluation
#[derive(Debug, Clone, Copy)]
pub struct MovementRequest<'a> {
    /// Elements of the part being edited
    pub timeline: &'a [TimedElement],
    /// Resolution of `timeline` at drag start
    pub org_resolved: &'a ResolvedTimeline,
    /// Snap targets; empty when snapping is bypassed
    pub snap_points: &'a [SnapPoint],
    /// Snap threshold in milliseconds (exclusive)
    pub snap_distance: Time,
    /// Horizontal pointer travel since drag start
    pub pixel_delta: f64,
    /// Milliseconds per pixel, fixed at drag start
    pub ms_per_pixel: f64,
    /// Kind of pointer event
    pub move_kind: MoveKind,
    /// Element grasped by the pointer
    pub leader: &'a ElementId,
    /// Co-selected elements; may include the leader
    pub selected: &'a [ElementId],
    /// Value of `now` when re-resolving
    pub anchor: Time,
}

/// An element whose resolved start changed
#[derive(Debug, Clone, PartialEq)]
pub struct ChangedObject {
    /// The element with its post-move enable
    pub element: TimedElement,
    /// Resolved start before the move
    pub previous_start: Time,
    /// Resolved start after the move
    pub new_start: Time,
}

/// Result of a movement evaluation
#[derive(Debug, Clone, PartialEq)]
pub struct Movement {
    /// Timeline reflecting the drag
    pub resolved_timeline: ResolvedTimeline,
    /// Elements that need persisting
    pub changed_objects: Vec<ChangedObject>,
    /// Time delta applied to the selection, after snapping
    pub delta: Time,
}

impl Movement {
    /// No movement: the original timeline and nothing changed
    pub fn unchanged(org_resolved: &ResolvedTimeline) -> Self {
        Self {
            resolved_timeline: org_resolved.clone(),
            changed_objects: Vec::new(),
            delta: 0,
        }
    }

    /// Whether anything needs persisting
    pub fn is_empty(&self) -> bool {
        self.changed_objects.is_empty()
    }
}

/// Move the selection by the pointer delta and re-resolve.
///
/// Fails when the moved timeline cannot be resolved.
pub fn apply_movement(
    request: &MovementRequest<'_>,
    cache: &mut ResolverCache,
) -> Result<Movement, ResolveError> {
    if request.pixel_delta == 0.0 {
        return Ok(Movement::unchanged(request.org_resolved));
    }
    let Some(leader) = request.org_resolved.instance(request.leader) else {
        tracing::debug!(leader = %request.leader, "leader not in timeline, ignoring movement");
        return Ok(Movement::unchanged(request.org_resolved));
    };

    let selected: HashSet<&ElementId> = std::iter::once(request.leader)
        .chain(request.selected)
        .collect();

    let mut delta = (request.pixel_delta * request.ms_per_pixel).round() as Time;
    if request.move_kind == MoveKind::Active && !request.snap_points.is_empty() {
        if let Some(snapped) = snap_delta(request, leader, &selected, delta) {
            delta = snapped;
        }
    }
    if delta == 0 {
        return Ok(Movement::unchanged(request.org_resolved));
    }

    let mut elements = request.timeline.to_vec();
    for element in &mut elements {
        if !selected.contains(&element.id) {
            continue;
        }
        let Some(org_start) = request.org_resolved.start_of(&element.id) else {
            continue;
        };
        element.set_start(TimeExpr::Millis(org_start.saturating_add(delta).max(0)));
    }

    let resolved = resolve(&elements, request.anchor, cache)?;

    let changed_objects = elements
        .into_iter()
        .filter_map(|element| {
            let previous_start = request.org_resolved.start_of(&element.id)?;
            let new_start = resolved.start_of(&element.id)?;
            (previous_start != new_start).then_some(ChangedObject {
                element,
                previous_start,
                new_start,
            })
        })
        .collect();

    Ok(Movement {
        resolved_timeline: resolved,
        changed_objects,
        delta,
    })
}

/// Like [`apply_movement`], but a timeline that fails to resolve
/// yields "no movement" instead of an error
pub fn apply_movement_or_revert(request: &MovementRequest<'_>, cache: &mut ResolverCache) -> Movement {
    match apply_movement(request, cache) {
        Ok(movement) => movement,
        Err(err) => {
            tracing::warn!(leader = %request.leader, error = %err, "movement reverted");
            Movement::unchanged(request.org_resolved)
        }
    }
}

/// Delta that aligns a leader edge with the closest snap point, if one is in range
fn snap_delta(
    request: &MovementRequest<'_>,
    leader: &ResolvedInstance,
    selected: &HashSet<&ElementId>,
    delta: Time,
) -> Option<Time> {
    // Points of the selection and of its dependents move along with it
    let moves_with_selection = |point: &SnapPoint| {
        selected.contains(&point.element_id)
            || request
                .org_resolved
                .instance(&point.element_id)
                .is_some_and(|i| i.transitive_references.iter().any(|r| selected.contains(r)))
    };

    let mut best: Option<(Time, Time, &SnapPoint)> = None;
    for edge in std::iter::once(leader.start).chain(leader.end) {
        let projected = edge.saturating_add(delta);
        if let Some((point, distance)) =
            nearest_snap_point(request.snap_points, projected, &moves_with_selection)
        {
            if best.map_or(true, |(d, _, _)| distance < d) {
                best = Some((distance, point.time - edge, point));
            }
        }
    }

    let (distance, snapped, point) = best?;
    if distance < request.snap_distance {
        tracing::debug!(
            leader = %request.leader,
            target = %point.expression,
            delta = snapped,
            "snapped"
        );
        Some(snapped)
    } else {
        None
    }
}
