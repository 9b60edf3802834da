// SPDX-License-Identifier: MIT OR Apache-2.0
//! Timeline engine for the Cueline rundown editor.
//!
//! This crate turns a part's timed elements into concrete intervals:
//! - Enable expressions referencing other elements
//! - Resolution with cycle detection and a reusable cache
//! - Snap points for edge alignment
//! - Drag movement with snapping and revert on failure
//!
//! ## Architecture
//!
//! Everything here is a pure function over owned values. The caller keeps
//! the [`ResolverCache`] between calls; a cold cache gives the same results.

pub mod element;
pub mod content;
pub mod expression;
pub mod cache;
pub mod resolver;
pub mod snap;
pub mod movement;

pub use element::{ElementId, LayerId, Time, TimeExpr, EnableSpec, Enable, TimedElement};
pub use content::{
    ElementContent, ContentDescription, DeviceKind,
    CasparCgContent, TemplateType, AtemContent, AtemTransition,
};
pub use expression::{Expression, ReferenceProperty, SyntaxError, Unresolvable};
pub use cache::{ResolverCache, CacheStats, DEFAULT_CACHE_CAPACITY};
pub use resolver::{
    resolve, total_duration, sorted_layers,
    ResolvedInstance, ResolvedObject, ResolvedTimeline, Mapping, Mappings, ResolveError,
};
pub use snap::{SnapPoint, build_snap_points, nearest_snap_point};
pub use movement::{
    MoveKind, MovementRequest, Movement, ChangedObject,
    apply_movement, apply_movement_or_revert,
};
