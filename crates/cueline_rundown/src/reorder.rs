// SPDX-License-Identifier: MIT OR Apache-2.0
//! Drag-and-drop reordering of parts across groups.
//!
//! The state machine only proposes moves. The [`PartMover`] decides; on
//! rejection nothing changes and the drag continues.

use crate::backend::{MovePartRequest, PartMover};
use crate::model::{Group, GroupId, PartId};

/// The part being dragged and where it currently sits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DragItem {
    /// Group holding the part
    pub group: GroupId,
    /// Dragged part
    pub part: PartId,
    /// Position of the part in its group
    pub index: usize,
    /// Position of the group in the rundown
    pub group_index: usize,
    /// Whether the part was on air in its group when the drag began
    pub playing: bool,
    /// Whether the part is alone in a transparent group, which goes away once the part leaves
    pub alone_in_transparent: bool,
}

/// Reorder state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReorderState {
    /// No drag
    #[default]
    Idle,
    /// A part is being dragged
    Dragging(DragItem),
}

/// Row under the pointer
#[derive(Debug, Clone, Copy)]
pub struct HoverTarget<'a> {
    /// Group of the hovered row
    pub group: &'a Group,
    /// Position of that group in the rundown
    pub group_index: usize,
    /// Position of the hovered part in the group
    pub part_index: usize,
    /// Pointer position measured from the top of the row
    pub pointer_offset: f64,
    /// Height of the row
    pub row_height: f64,
}

impl HoverTarget<'_> {
    fn below_middle(&self) -> bool {
        self.pointer_offset > self.row_height / 2.0
    }

    fn above_middle(&self) -> bool {
        self.pointer_offset < self.row_height / 2.0
    }
}

/// What a hover event did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoverOutcome {
    /// No drag in progress
    NotDragging,
    /// A playing part cannot enter another playing group
    PlaybackGuard,
    /// The part is already at the hovered position
    SamePosition,
    /// The pointer has not crossed the row's midpoint in the drag direction
    BelowThreshold,
    /// The move was proposed and refused
    Rejected,
    /// The part moved
    Moved {
        /// Group now holding the part
        group: GroupId,
        /// Position of the part in that group
        index: usize,
    },
}

/// Part reorder state machine
#[derive(Debug, Clone, Default)]
pub struct PartReorder {
    state: ReorderState,
}

impl PartReorder {
    /// Create an idle state machine
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state
    pub fn state(&self) -> ReorderState {
        self.state
    }

    /// Whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ReorderState::Dragging(_))
    }

    /// Start dragging `part` out of `group`. Returns false if the part is not in the group.
    pub fn begin(&mut self, group: &Group, group_index: usize, part: PartId) -> bool {
        let Some(index) = group.part_index(part) else {
            return false;
        };
        self.state = ReorderState::Dragging(DragItem {
            group: group.id,
            part,
            index,
            group_index,
            playing: group.is_part_playing(part),
            alone_in_transparent: group.transparent && group.parts.len() == 1,
        });
        tracing::debug!(%part, group = %group.id, index, "part drag started");
        true
    }

    /// Whether a drop onto `hovered` would be accepted
    pub fn can_drop(&self, hovered: &Group) -> bool {
        match &self.state {
            ReorderState::Idle => false,
            ReorderState::Dragging(item) => !hovered.transparent && !blocked_by_playback(item, hovered),
        }
    }

    /// Evaluate a hover event, moving the part through `mover` when warranted
    pub fn hover(&mut self, target: &HoverTarget<'_>, mover: &mut impl PartMover) -> HoverOutcome {
        let ReorderState::Dragging(item) = &mut self.state else {
            return HoverOutcome::NotDragging;
        };

        if blocked_by_playback(item, target.group) {
            tracing::debug!(part = %item.part, group = %target.group.id, "hover blocked by playback");
            return HoverOutcome::PlaybackGuard;
        }

        let mut hover_index = target.part_index;
        let is_new_group = item.group != target.group.id;
        if !is_new_group && item.index == hover_index {
            return HoverOutcome::SamePosition;
        }

        let below_middle = target.below_middle();
        let up_within = !is_new_group && item.index > hover_index;
        let down_within = !is_new_group && item.index < hover_index;
        let up_from_another = item.group_index > target.group_index;

        if down_within && target.above_middle() {
            return HoverOutcome::BelowThreshold;
        }
        if up_from_another && hover_index + 1 == target.group.parts.len() && below_middle {
            hover_index += 1;
        }
        if up_within && below_middle {
            return HoverOutcome::BelowThreshold;
        }

        let (to_group, position) = if target.group.transparent {
            (None, target.group_index + usize::from(below_middle))
        } else {
            (Some(target.group.id), hover_index)
        };

        let request = MovePartRequest {
            from_group: item.group,
            part: item.part,
            to_group,
            position,
        };
        let Some(group) = mover.attempt_move_part(&request) else {
            tracing::debug!(part = %item.part, ?to_group, position, "part move rejected");
            return HoverOutcome::Rejected;
        };

        let group_index = if to_group.is_some() { target.group_index } else { position };
        let source_removed =
            item.alone_in_transparent && item.group != group.id && item.group_index < group_index;
        item.index = group.part_index(item.part).unwrap_or(position);
        item.group_index = group_index - usize::from(source_removed);
        item.group = group.id;
        item.alone_in_transparent = group.transparent && group.parts.len() == 1;
        tracing::debug!(part = %item.part, group = %group.id, index = item.index, "part moved");

        HoverOutcome::Moved {
            group: group.id,
            index: item.index,
        }
    }

    /// Finish the drag, returning where the part ended up
    pub fn drop(&mut self) -> Option<DragItem> {
        match std::mem::take(&mut self.state) {
            ReorderState::Idle => None,
            ReorderState::Dragging(item) => Some(item),
        }
    }

    /// Abandon the drag
    pub fn cancel(&mut self) {
        self.state = ReorderState::Idle;
    }
}

fn blocked_by_playback(item: &DragItem, hovered: &Group) -> bool {
    item.playing && hovered.id != item.group && hovered.is_playing()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GroupPlayhead, Part};
    use crate::rundown::Rundown;

    /// Records requests and refuses them all
    #[derive(Default)]
    struct Refuse {
        requests: Vec<MovePartRequest>,
    }

    impl PartMover for Refuse {
        fn attempt_move_part(&mut self, request: &MovePartRequest) -> Option<Group> {
            self.requests.push(*request);
            None
        }
    }

    fn rundown() -> Rundown {
        let mut rundown = Rundown::new("Show");
        rundown.add_group(
            Group::new("G")
                .with_part(Part::new("P1"))
                .with_part(Part::new("P2")),
        );
        rundown
    }

    fn target(group: &Group, group_index: usize, part_index: usize, pointer_offset: f64) -> HoverTarget<'_> {
        HoverTarget {
            group,
            group_index,
            part_index,
            pointer_offset,
            row_height: 40.0,
        }
    }

    fn names(group: &Group) -> Vec<&str> {
        group.parts.iter().map(|p| p.name.as_str()).collect()
    }

    #[test]
    fn test_upward_drag_needs_midpoint() {
        let mut rundown = rundown();
        let p2 = rundown.groups[0].parts[1].id;
        let mut reorder = PartReorder::new();
        assert!(reorder.begin(&rundown.groups[0], 0, p2));

        // Below P1's midpoint: no swap yet
        let group = rundown.groups[0].clone();
        let outcome = reorder.hover(&target(&group, 0, 0, 30.0), &mut rundown);
        assert_eq!(outcome, HoverOutcome::BelowThreshold);
        assert_eq!(names(&rundown.groups[0]), vec!["P1", "P2"]);

        // Above it: swap
        let outcome = reorder.hover(&target(&group, 0, 0, 10.0), &mut rundown);
        assert_eq!(outcome, HoverOutcome::Moved { group: group.id, index: 0 });
        assert_eq!(names(&rundown.groups[0]), vec!["P2", "P1"]);

        let item = reorder.drop().unwrap();
        assert_eq!(item.index, 0);
        assert!(!reorder.is_dragging());
    }

    #[test]
    fn test_downward_drag_needs_midpoint() {
        let mut rundown = rundown();
        let p1 = rundown.groups[0].parts[0].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[0], 0, p1);

        let group = rundown.groups[0].clone();
        assert_eq!(
            reorder.hover(&target(&group, 0, 1, 10.0), &mut rundown),
            HoverOutcome::BelowThreshold
        );
        assert!(matches!(
            reorder.hover(&target(&group, 0, 1, 30.0), &mut rundown),
            HoverOutcome::Moved { index: 1, .. }
        ));
        assert_eq!(names(&rundown.groups[0]), vec!["P2", "P1"]);
    }

    #[test]
    fn test_same_position_does_not_call_mover() {
        let rundown = rundown();
        let p1 = rundown.groups[0].parts[0].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[0], 0, p1);

        let mut mover = Refuse::default();
        for offset in [0.0, 20.0, 39.0] {
            let outcome = reorder.hover(&target(&rundown.groups[0], 0, 0, offset), &mut mover);
            assert_eq!(outcome, HoverOutcome::SamePosition);
        }
        assert!(mover.requests.is_empty());
    }

    #[test]
    fn test_rejection_keeps_state() {
        let rundown = rundown();
        let p2 = rundown.groups[0].parts[1].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[0], 0, p2);
        let before = reorder.state();

        let mut mover = Refuse::default();
        let outcome = reorder.hover(&target(&rundown.groups[0], 0, 0, 5.0), &mut mover);
        assert_eq!(outcome, HoverOutcome::Rejected);
        assert_eq!(mover.requests.len(), 1);
        assert_eq!(reorder.state(), before);
    }

    #[test]
    fn test_up_from_another_group_past_last_row() {
        let mut rundown = rundown();
        rundown.add_group(Group::new("H").with_part(Part::new("Q1")));
        let q1 = rundown.groups[1].parts[0].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[1], 1, q1);

        let group = rundown.groups[0].clone();
        let outcome = reorder.hover(&target(&group, 0, 1, 30.0), &mut rundown);
        assert_eq!(outcome, HoverOutcome::Moved { group: group.id, index: 2 });
        assert_eq!(names(&rundown.groups[0]), vec!["P1", "P2", "Q1"]);
    }

    #[test]
    fn test_transparent_target_goes_to_top_level() {
        let mut rundown = rundown();
        rundown.add_group(Group::transparent(Part::new("Solo")));
        let p1 = rundown.groups[0].parts[0].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[0], 0, p1);

        let solo = rundown.groups[1].clone();
        assert!(!reorder.can_drop(&solo));

        let mut mover = Refuse::default();
        reorder.hover(&target(&solo, 1, 0, 30.0), &mut mover);
        assert_eq!(mover.requests[0].to_group, None);
        assert_eq!(mover.requests[0].position, 2);

        let outcome = reorder.hover(&target(&solo, 1, 0, 10.0), &mut rundown);
        let HoverOutcome::Moved { group, index } = outcome else {
            panic!("expected a move, got {outcome:?}");
        };
        assert_eq!(index, 0);
        assert_eq!(rundown.group_index(group), Some(1));
        assert!(rundown.groups[1].transparent);
        let ReorderState::Dragging(item) = reorder.state() else {
            panic!("drag ended");
        };
        assert_eq!(item.group_index, 1);
    }

    #[test]
    fn test_midpoint_counts_as_crossed() {
        let mut rundown = rundown();
        let p1 = rundown.groups[0].parts[0].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[0], 0, p1);

        let group = rundown.groups[0].clone();
        assert!(matches!(
            reorder.hover(&target(&group, 0, 1, 20.0), &mut rundown),
            HoverOutcome::Moved { index: 1, .. }
        ));

        let group = rundown.groups[0].clone();
        assert!(matches!(
            reorder.hover(&target(&group, 0, 0, 20.0), &mut rundown),
            HoverOutcome::Moved { index: 0, .. }
        ));
        assert_eq!(names(&rundown.groups[0]), vec!["P1", "P2"]);
    }

    #[test]
    fn test_group_index_skips_removed_source() {
        let mut rundown = rundown();
        rundown.add_group(Group::transparent(Part::new("Solo")));
        rundown.add_group(Group::transparent(Part::new("Other")));
        let solo = rundown.groups[1].parts[0].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[1], 1, solo);

        // Below the last top-level row: the emptied source group disappears
        let other = rundown.groups[2].clone();
        let HoverOutcome::Moved { group, .. } = reorder.hover(&target(&other, 2, 0, 30.0), &mut rundown) else {
            panic!("expected a move");
        };
        assert_eq!(rundown.groups.len(), 3);
        let ReorderState::Dragging(item) = reorder.state() else {
            panic!("drag ended");
        };
        assert_eq!(Some(item.group_index), rundown.group_index(group));
        assert!(item.alone_in_transparent);

        // Into a regular group further down: the new source wrapper goes away too
        let mut rundown = Rundown::new("Show");
        rundown.add_group(Group::transparent(Part::new("Solo")));
        rundown.add_group(Group::new("G").with_part(Part::new("P1")));
        let solo = rundown.groups[0].parts[0].id;
        let mut reorder = PartReorder::new();
        reorder.begin(&rundown.groups[0], 0, solo);

        let g = rundown.groups[1].clone();
        assert!(matches!(
            reorder.hover(&target(&g, 1, 0, 10.0), &mut rundown),
            HoverOutcome::Moved { index: 0, .. }
        ));
        let ReorderState::Dragging(item) = reorder.state() else {
            panic!("drag ended");
        };
        assert_eq!(rundown.group_index(g.id), Some(0));
        assert_eq!(item.group_index, 0);
        assert!(!item.alone_in_transparent);
    }

    #[test]
    fn test_hover_when_idle() {
        let mut rundown = rundown();
        let group = rundown.groups[0].clone();
        let mut reorder = PartReorder::new();
        assert_eq!(
            reorder.hover(&target(&group, 0, 0, 0.0), &mut rundown),
            HoverOutcome::NotDragging
        );
        assert!(!reorder.can_drop(&group));
        assert!(reorder.drop().is_none());
    }

    #[test]
    fn test_cancel_returns_to_idle() {
        let rundown = rundown();
        let mut reorder = PartReorder::new();
        assert!(reorder.begin(&rundown.groups[0], 0, rundown.groups[0].parts[0].id));
        reorder.cancel();
        assert_eq!(reorder.state(), ReorderState::Idle);
        assert!(!reorder.begin(&rundown.groups[0], 0, PartId::new()));
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn live(group: &mut Group) {
            group.playhead = Some(GroupPlayhead {
                part_id: group.parts[0].id,
                playhead_time: 0,
                part_end_time: 10_000,
            });
        }

        proptest! {
            #[test]
            fn prop_playing_part_never_enters_playing_group(
                parts in 1usize..8,
                part_index in 0usize..8,
                group_index in 0usize..4,
                pointer_offset in 0.0f64..40.0,
            ) {
                let mut source = Group::new("A").with_part(Part::new("On air"));
                live(&mut source);
                let mut other = Group::new("B");
                for i in 0..parts {
                    other.parts.push(Part::new(format!("B{i}")));
                }
                live(&mut other);

                let mut reorder = PartReorder::new();
                reorder.begin(&source, 0, source.parts[0].id);
                prop_assert!(!reorder.can_drop(&other));

                let mut mover = Refuse::default();
                let outcome = reorder.hover(
                    &HoverTarget { group: &other, group_index, part_index, pointer_offset, row_height: 40.0 },
                    &mut mover,
                );
                prop_assert_eq!(outcome, HoverOutcome::PlaybackGuard);
                prop_assert!(mover.requests.is_empty());
            }
        }
    }
}
