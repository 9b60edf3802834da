// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parts and groups.

use cueline_timeline::{ElementId, Time, TimedElement};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartId(pub Uuid);

impl PartId {
    /// Create a new random part ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PartId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PartId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Unique identifier for a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupId(pub Uuid);

impl GroupId {
    /// Create a new random group ID
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A container of timed elements played together
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    /// Unique part ID
    #[serde(default)]
    pub id: PartId,
    /// Part name
    pub name: String,
    /// Timed elements in input order
    #[serde(default)]
    pub timeline: Vec<TimedElement>,
}

impl Part {
    /// Create an empty part
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PartId::new(),
            name: name.into(),
            timeline: Vec::new(),
        }
    }

    /// Add an element
    pub fn with_element(mut self, element: TimedElement) -> Self {
        self.timeline.push(element);
        self
    }

    /// Get an element by ID
    pub fn element(&self, id: &ElementId) -> Option<&TimedElement> {
        self.timeline.iter().find(|e| &e.id == id)
    }

    /// Get a mutable element by ID
    pub fn element_mut(&mut self, id: &ElementId) -> Option<&mut TimedElement> {
        self.timeline.iter_mut().find(|e| &e.id == id)
    }
}

/// What a group is currently playing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupPlayhead {
    /// The part on air
    pub part_id: PartId,
    /// Current position within the part
    pub playhead_time: Time,
    /// When the part ends
    pub part_end_time: Time,
}

/// An ordered list of parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    /// Unique group ID
    #[serde(default)]
    pub id: GroupId,
    /// Group name
    pub name: String,
    /// Parts in play order
    #[serde(default)]
    pub parts: Vec<Part>,
    /// Transparent groups wrap a single top-level part
    #[serde(default)]
    pub transparent: bool,
    /// Playout state, if playing
    #[serde(default)]
    pub playhead: Option<GroupPlayhead>,
}

impl Group {
    /// Create an empty group
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            parts: Vec::new(),
            transparent: false,
            playhead: None,
        }
    }

    /// Create a transparent group holding `part`
    pub fn transparent(part: Part) -> Self {
        Self {
            id: GroupId::new(),
            name: part.name.clone(),
            parts: vec![part],
            transparent: true,
            playhead: None,
        }
    }

    /// Add a part
    pub fn with_part(mut self, part: Part) -> Self {
        self.parts.push(part);
        self
    }

    /// Whether the group is on air
    pub fn is_playing(&self) -> bool {
        self.playhead.is_some()
    }

    /// Whether `part` is the one on air in this group
    pub fn is_part_playing(&self, part: PartId) -> bool {
        self.playhead.is_some_and(|p| p.part_id == part)
    }

    /// Position of a part
    pub fn part_index(&self, part: PartId) -> Option<usize> {
        self.parts.iter().position(|p| p.id == part)
    }

    /// Get a part by ID
    pub fn part(&self, part: PartId) -> Option<&Part> {
        self.parts.iter().find(|p| p.id == part)
    }

    /// Get a mutable part by ID
    pub fn part_mut(&mut self, part: PartId) -> Option<&mut Part> {
        self.parts.iter_mut().find(|p| p.id == part)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cueline_timeline::EnableSpec;

    #[test]
    fn test_transparent_wraps_part() {
        let part = Part::new("Intro");
        let id = part.id;
        let group = Group::transparent(part);
        assert!(group.transparent);
        assert_eq!(group.name, "Intro");
        assert_eq!(group.part_index(id), Some(0));
    }

    #[test]
    fn test_playing_part() {
        let part = Part::new("Live");
        let id = part.id;
        let mut group = Group::new("Show").with_part(part);
        assert!(!group.is_playing());

        group.playhead = Some(GroupPlayhead {
            part_id: id,
            playhead_time: 1200,
            part_end_time: 8000,
        });
        assert!(group.is_playing());
        assert!(group.is_part_playing(id));
        assert!(!group.is_part_playing(PartId::new()));
    }

    #[test]
    fn test_load_group_from_ron() {
        let text = r#"(
            name: "Opening",
            parts: [
                (name: "Titles", timeline: [
                    (id: ("bg"), layer: ("ccg-1"), enable: Single((start: Millis(0)))),
                ]),
            ],
        )"#;
        let group: Group = ron::from_str(text).unwrap();
        assert!(!group.transparent);
        assert_eq!(group.parts.len(), 1);
        let bg = group.parts[0].element(&"bg".into()).unwrap();
        assert_eq!(bg.enable.single(), Some(&EnableSpec::open_ended(0)));
    }
}
