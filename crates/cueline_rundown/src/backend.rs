// SPDX-License-Identifier: MIT OR Apache-2.0
//! Interfaces to whatever persists rundown changes.

use crate::model::{Group, GroupId, PartId};
use cueline_timeline::{ElementId, TimeExpr, TimedElement};
use serde::{Deserialize, Serialize};

/// New timing for one element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingChange {
    /// Element to update
    pub element_id: ElementId,
    /// New start
    pub start: TimeExpr,
    /// New duration (`None` is open-ended)
    pub duration: Option<TimeExpr>,
}

impl TimingChange {
    /// Timing of a single-instance element
    pub fn from_element(element: &TimedElement) -> Option<Self> {
        let spec = element.enable.single()?;
        Some(Self {
            element_id: element.id.clone(),
            start: spec.start.clone(),
            duration: spec.duration.clone(),
        })
    }
}

/// Receives timing changes after a drag is released
pub trait TimingCommitter {
    /// Persist a timing change; called once per changed element
    fn commit_timing_change(&mut self, part: PartId, change: &TimingChange) -> Result<(), CommitError>;
}

/// Arguments of a part move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovePartRequest {
    /// Group the part is in now
    pub from_group: GroupId,
    /// Part to move
    pub part: PartId,
    /// Destination group, or `None` for the top level
    pub to_group: Option<GroupId>,
    /// Index in the destination group, or among groups for the top level
    pub position: usize,
}

/// Performs part moves on behalf of the reorder state machine
pub trait PartMover {
    /// Try to move a part; returns the updated destination group, or `None` when rejected
    fn attempt_move_part(&mut self, request: &MovePartRequest) -> Option<Group>;
}

/// Error from a timing commit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommitError {
    /// The backend refused the change
    #[error("Change to #{element} rejected: {reason}")]
    Rejected {
        /// Element whose change was refused
        element: ElementId,
        /// Why
        reason: String,
    },

    /// The backend could not be reached
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}
