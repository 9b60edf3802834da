// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rundown editing for Cueline.
//!
//! This crate provides:
//! - Parts and groups, with playout state
//! - Drag-and-drop reordering of parts across groups
//! - Per-part timeline drag sessions
//! - Traits for the backend that persists changes
//!
//! ## Architecture
//!
//! Sessions and the reorder state machine are explicit single-owner values
//! driven by discrete events. Persisting changes goes through
//! [`TimingCommitter`] and [`PartMover`]; [`Rundown`] implements both in memory.

pub mod model;
pub mod backend;
pub mod rundown;
pub mod reorder;
pub mod session;

pub use model::{Part, PartId, Group, GroupId, GroupPlayhead};
pub use backend::{TimingChange, TimingCommitter, MovePartRequest, PartMover, CommitError};
pub use rundown::{Rundown, MoveError};
pub use reorder::{PartReorder, ReorderState, DragItem, HoverTarget, HoverOutcome};
pub use session::{
    TimelineDragSession, DragConfig, ModifierKey, Modifiers, SessionError,
    DEFAULT_SNAP_DISTANCE_PX,
};
