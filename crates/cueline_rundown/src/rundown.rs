// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory rundown with reference move and commit operations.

use crate::backend::{CommitError, MovePartRequest, PartMover, TimingChange, TimingCommitter};
use crate::model::{Group, GroupId, Part, PartId};
use cueline_timeline::Enable;
use serde::{Deserialize, Serialize};

/// Ordered list of groups
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rundown {
    /// Rundown name
    pub name: String,
    /// Groups in play order
    #[serde(default)]
    pub groups: Vec<Group>,
}

impl Rundown {
    /// Create an empty rundown
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            groups: Vec::new(),
        }
    }

    /// Add a group at the end
    pub fn add_group(&mut self, group: Group) -> GroupId {
        let id = group.id;
        self.groups.push(group);
        id
    }

    /// Get a group by ID
    pub fn group(&self, id: GroupId) -> Option<&Group> {
        self.groups.iter().find(|g| g.id == id)
    }

    /// Position of a group
    pub fn group_index(&self, id: GroupId) -> Option<usize> {
        self.groups.iter().position(|g| g.id == id)
    }

    /// Find a part and the group containing it
    pub fn find_part(&self, part: PartId) -> Option<(&Group, &Part)> {
        self.groups
            .iter()
            .find_map(|g| g.part(part).map(|p| (g, p)))
    }

    /// Move a part within or between groups, or to the top level.
    ///
    /// A top-level move wraps the part in a new transparent group. A
    /// transparent group left empty is removed. Returns the destination group.
    pub fn move_part(&mut self, request: &MovePartRequest) -> Result<Group, MoveError> {
        let from_index = self
            .group_index(request.from_group)
            .ok_or(MoveError::UnknownGroup(request.from_group))?;
        let source = &self.groups[from_index];
        let part_index = source
            .part_index(request.part)
            .ok_or(MoveError::UnknownPart(request.part))?;

        let target_index = match request.to_group {
            Some(to) => Some(self.group_index(to).ok_or(MoveError::UnknownGroup(to))?),
            None => None,
        };

        if let Some(target_index) = target_index {
            let target = &self.groups[target_index];
            if target_index != from_index && source.is_part_playing(request.part) && target.is_playing() {
                return Err(MoveError::PlaybackGuard);
            }
        }

        let part = self.groups[from_index].parts.remove(part_index);
        let target_id = match target_index {
            Some(target_index) => {
                let target = &mut self.groups[target_index];
                let position = request.position.min(target.parts.len());
                target.parts.insert(position, part);
                target.id
            }
            None => {
                let group = Group::transparent(part);
                let id = group.id;
                let position = request.position.min(self.groups.len());
                self.groups.insert(position, group);
                id
            }
        };

        self.groups
            .retain(|g| !(g.transparent && g.parts.is_empty() && g.id != target_id));

        self.group(target_id)
            .cloned()
            .ok_or(MoveError::UnknownGroup(target_id))
    }

    /// Replace the timing of a single-instance element
    pub fn apply_timing_change(&mut self, part: PartId, change: &TimingChange) -> Result<(), CommitError> {
        let part = self
            .groups
            .iter_mut()
            .find_map(|g| g.part_mut(part))
            .ok_or_else(|| CommitError::Rejected {
                element: change.element_id.clone(),
                reason: format!("part {part} not found"),
            })?;
        let element = part
            .element_mut(&change.element_id)
            .ok_or_else(|| CommitError::Rejected {
                element: change.element_id.clone(),
                reason: "element not found".to_string(),
            })?;
        match &mut element.enable {
            Enable::Single(spec) => {
                spec.start = change.start.clone();
                spec.duration = change.duration.clone();
                Ok(())
            }
            Enable::Multiple(_) => Err(CommitError::Rejected {
                element: change.element_id.clone(),
                reason: "element has multiple instances".to_string(),
            }),
        }
    }
}

impl PartMover for Rundown {
    fn attempt_move_part(&mut self, request: &MovePartRequest) -> Option<Group> {
        match self.move_part(request) {
            Ok(group) => Some(group),
            Err(err) => {
                tracing::debug!(part = %request.part, error = %err, "part move rejected");
                None
            }
        }
    }
}

impl TimingCommitter for Rundown {
    fn commit_timing_change(&mut self, part: PartId, change: &TimingChange) -> Result<(), CommitError> {
        self.apply_timing_change(part, change)
    }
}

/// Reason a part move was refused
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MoveError {
    /// Group not in the rundown
    #[error("Group not found: {0}")]
    UnknownGroup(GroupId),

    /// Part not in the source group
    #[error("Part not found: {0}")]
    UnknownPart(PartId),

    /// The part is on air and the destination group is also on air
    #[error("Cannot move a playing part into another playing group")]
    PlaybackGuard,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::GroupPlayhead;
    use cueline_timeline::{EnableSpec, TimeExpr, TimedElement};

    fn names(group: &Group) -> Vec<&str> {
        group.parts.iter().map(|p| p.name.as_str()).collect()
    }

    fn show() -> (Rundown, GroupId, Vec<PartId>) {
        let parts = vec![Part::new("P1"), Part::new("P2"), Part::new("P3")];
        let ids = parts.iter().map(|p| p.id).collect();
        let mut group = Group::new("G");
        group.parts = parts;
        let mut rundown = Rundown::new("Show");
        let gid = rundown.add_group(group);
        (rundown, gid, ids)
    }

    #[test]
    fn test_move_within_group() {
        let (mut rundown, gid, ids) = show();
        let group = rundown
            .move_part(&MovePartRequest {
                from_group: gid,
                part: ids[2],
                to_group: Some(gid),
                position: 0,
            })
            .unwrap();
        assert_eq!(names(&group), vec!["P3", "P1", "P2"]);
        assert_eq!(rundown.groups[0], group);
    }

    #[test]
    fn test_move_between_groups_clamps() {
        let (mut rundown, gid, ids) = show();
        let other = rundown.add_group(Group::new("Other").with_part(Part::new("Q1")));
        let group = rundown
            .move_part(&MovePartRequest {
                from_group: gid,
                part: ids[0],
                to_group: Some(other),
                position: 99,
            })
            .unwrap();
        assert_eq!(names(&group), vec!["Q1", "P1"]);
        assert_eq!(names(&rundown.groups[0]), vec!["P2", "P3"]);
    }

    #[test]
    fn test_move_to_top_level() {
        let (mut rundown, gid, ids) = show();
        let group = rundown
            .move_part(&MovePartRequest {
                from_group: gid,
                part: ids[1],
                to_group: None,
                position: 1,
            })
            .unwrap();
        assert!(group.transparent);
        assert_eq!(names(&group), vec!["P2"]);
        assert_eq!(rundown.groups.len(), 2);
        assert_eq!(rundown.group_index(group.id), Some(1));
    }

    #[test]
    fn test_empty_transparent_source_removed() {
        let mut rundown = Rundown::new("Show");
        let solo = Part::new("Solo");
        let solo_id = solo.id;
        let tid = rundown.add_group(Group::transparent(solo));
        let gid = rundown.add_group(Group::new("G").with_part(Part::new("P1")));

        let group = rundown
            .move_part(&MovePartRequest {
                from_group: tid,
                part: solo_id,
                to_group: Some(gid),
                position: 1,
            })
            .unwrap();
        assert_eq!(names(&group), vec!["P1", "Solo"]);
        assert_eq!(rundown.groups.len(), 1);
        assert!(rundown.group(tid).is_none());
    }

    #[test]
    fn test_playback_guard() {
        let (mut rundown, gid, ids) = show();
        rundown.groups[0].playhead = Some(GroupPlayhead {
            part_id: ids[0],
            playhead_time: 0,
            part_end_time: 1000,
        });
        let mut live = Group::new("Live").with_part(Part::new("L1"));
        live.playhead = Some(GroupPlayhead {
            part_id: live.parts[0].id,
            playhead_time: 0,
            part_end_time: 1000,
        });
        let live_id = rundown.add_group(live);
        let before = rundown.clone();

        let request = MovePartRequest {
            from_group: gid,
            part: ids[0],
            to_group: Some(live_id),
            position: 0,
        };
        assert_eq!(rundown.move_part(&request), Err(MoveError::PlaybackGuard));
        assert!(rundown.attempt_move_part(&request).is_none());
        assert_eq!(rundown, before);

        // A part that is not on air may move freely
        let request = MovePartRequest { part: ids[1], ..request };
        assert!(rundown.move_part(&request).is_ok());
    }

    #[test]
    fn test_unknown_ids_rejected() {
        let (mut rundown, gid, _) = show();
        let ghost = PartId::new();
        assert_eq!(
            rundown.move_part(&MovePartRequest {
                from_group: gid,
                part: ghost,
                to_group: None,
                position: 0,
            }),
            Err(MoveError::UnknownPart(ghost))
        );
        let missing = GroupId::new();
        assert!(matches!(
            rundown.move_part(&MovePartRequest {
                from_group: missing,
                part: ghost,
                to_group: None,
                position: 0,
            }),
            Err(MoveError::UnknownGroup(_))
        ));
    }

    #[test]
    fn test_apply_timing_change() {
        let part = Part::new("P").with_element(TimedElement::new("a", "l", EnableSpec::new(0, 1000)));
        let pid = part.id;
        let mut rundown = Rundown::new("Show");
        rundown.add_group(Group::new("G").with_part(part));

        let change = TimingChange {
            element_id: "a".into(),
            start: TimeExpr::Millis(2500),
            duration: Some(TimeExpr::Millis(1000)),
        };
        rundown.commit_timing_change(pid, &change).unwrap();
        let (_, part) = rundown.find_part(pid).unwrap();
        assert_eq!(part.timeline[0].enable.single(), Some(&EnableSpec::new(2500, 1000)));

        let missing = TimingChange {
            element_id: "ghost".into(),
            ..change
        };
        assert!(matches!(
            rundown.commit_timing_change(pid, &missing),
            Err(CommitError::Rejected { .. })
        ));
    }
}
