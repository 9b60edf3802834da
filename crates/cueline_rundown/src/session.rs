// SPDX-License-Identifier: MIT OR Apache-2.0
//! Per-part timeline drag session.
//!
//! One session per part being edited. It owns the resolver cache, the
//! timeline resolved from the authoritative part, and at most one drag.

use crate::backend::{CommitError, TimingChange, TimingCommitter};
use crate::model::Part;
use cueline_timeline::{
    apply_movement_or_revert, build_snap_points, resolve, total_duration, CacheStats, ElementId,
    MoveKind, Movement, MovementRequest, ResolveError, ResolvedTimeline, ResolverCache, SnapPoint,
    Time, DEFAULT_CACHE_CAPACITY,
};
use serde::{Deserialize, Serialize};

/// Default snap threshold in pixels
pub const DEFAULT_SNAP_DISTANCE_PX: f64 = 10.0;

/// A modifier key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModifierKey {
    /// Shift
    Shift,
    /// Alt / Option
    Alt,
    /// Control / Command
    Ctrl,
}

/// Modifier keys held during a pointer event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    /// Shift held
    #[serde(default)]
    pub shift: bool,
    /// Alt held
    #[serde(default)]
    pub alt: bool,
    /// Ctrl held
    #[serde(default)]
    pub ctrl: bool,
}

impl Modifiers {
    /// No modifiers
    pub const NONE: Self = Self {
        shift: false,
        alt: false,
        ctrl: false,
    };

    /// Only Shift
    pub const SHIFT: Self = Self {
        shift: true,
        alt: false,
        ctrl: false,
    };

    /// Whether `key` is held
    pub fn is_held(&self, key: ModifierKey) -> bool {
        match key {
            ModifierKey::Shift => self.shift,
            ModifierKey::Alt => self.alt,
            ModifierKey::Ctrl => self.ctrl,
        }
    }
}

/// Drag settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DragConfig {
    /// Snap threshold in pixels
    pub snap_distance_px: f64,
    /// Holding any of these keys disables snapping
    pub bypass_snap: Vec<ModifierKey>,
    /// Resolver cache entries kept before flushing
    pub cache_capacity: usize,
}

impl Default for DragConfig {
    fn default() -> Self {
        Self {
            snap_distance_px: DEFAULT_SNAP_DISTANCE_PX,
            bypass_snap: vec![ModifierKey::Shift],
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl DragConfig {
    /// Whether `modifiers` disable snapping
    pub fn bypasses_snap(&self, modifiers: Modifiers) -> bool {
        self.bypass_snap.iter().any(|key| modifiers.is_held(*key))
    }
}

#[derive(Debug, Clone)]
struct DragContext {
    leader: ElementId,
    selected: Vec<ElementId>,
    ms_per_pixel: f64,
    movement: Movement,
}

/// Timeline editing state of one part
#[derive(Debug)]
pub struct TimelineDragSession {
    config: DragConfig,
    part: Part,
    anchor: Time,
    cache: ResolverCache,
    resolved: ResolvedTimeline,
    snap_points: Vec<SnapPoint>,
    drag: Option<DragContext>,
    /// Committed but not yet reflected in `part`
    pending: Option<Movement>,
}

impl TimelineDragSession {
    /// Create a session for `part`, resolving its timeline at `anchor`
    pub fn new(part: Part, anchor: Time, config: DragConfig) -> Result<Self, SessionError> {
        let mut cache = ResolverCache::with_capacity(config.cache_capacity);
        let resolved = resolve(&part.timeline, anchor, &mut cache)?;
        let snap_points = build_snap_points(&resolved);
        Ok(Self {
            config,
            part,
            anchor,
            cache,
            resolved,
            snap_points,
            drag: None,
            pending: None,
        })
    }

    /// The authoritative part
    pub fn part(&self) -> &Part {
        &self.part
    }

    /// Drag settings
    pub fn config(&self) -> &DragConfig {
        &self.config
    }

    /// Snap targets of the authoritative timeline
    pub fn snap_points(&self) -> &[SnapPoint] {
        &self.snap_points
    }

    /// Timeline to display: the drag in progress, then a pending commit, then the authoritative one
    pub fn resolved_timeline(&self) -> &ResolvedTimeline {
        if let Some(drag) = &self.drag {
            &drag.movement.resolved_timeline
        } else if let Some(pending) = &self.pending {
            &pending.resolved_timeline
        } else {
            &self.resolved
        }
    }

    /// Whether a drag is in progress
    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Whether a commit is waiting for the part to be updated
    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Resolver cache counters
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Start dragging `leader`, with `selected` following it.
    ///
    /// The pixel-to-time ratio is fixed here from the timeline's total
    /// duration and `track_width_px`.
    pub fn begin_drag(
        &mut self,
        leader: ElementId,
        selected: Vec<ElementId>,
        track_width_px: f64,
    ) -> Result<(), SessionError> {
        if self.drag.is_some() {
            return Err(SessionError::DragInProgress);
        }
        if self.pending.is_some() {
            return Err(SessionError::AwaitingBackend);
        }
        if self.resolved.object(&leader).is_none() {
            return Err(SessionError::UnknownElement(leader));
        }

        let ms_per_pixel = if track_width_px > 0.0 {
            total_duration(&self.resolved) as f64 / track_width_px
        } else {
            0.0
        };
        tracing::debug!(%leader, followers = selected.len(), ms_per_pixel, "timeline drag started");

        self.drag = Some(DragContext {
            leader,
            selected,
            ms_per_pixel,
            movement: Movement::unchanged(&self.resolved),
        });
        Ok(())
    }

    /// Update the drag with the pointer's travel since the drag began
    pub fn drag_to(&mut self, pixel_delta: f64, modifiers: Modifiers) -> Result<&Movement, SessionError> {
        let drag = self.drag.as_mut().ok_or(SessionError::NoActiveDrag)?;

        let snap_points: &[SnapPoint] = if self.config.bypasses_snap(modifiers) {
            &[]
        } else {
            &self.snap_points
        };
        let request = MovementRequest {
            timeline: &self.part.timeline,
            org_resolved: &self.resolved,
            snap_points,
            snap_distance: (self.config.snap_distance_px * drag.ms_per_pixel).round() as Time,
            pixel_delta,
            ms_per_pixel: drag.ms_per_pixel,
            move_kind: MoveKind::Active,
            leader: &drag.leader,
            selected: &drag.selected,
            anchor: self.anchor,
        };
        drag.movement = apply_movement_or_revert(&request, &mut self.cache);
        Ok(&drag.movement)
    }

    /// End the drag and commit every changed element.
    ///
    /// On success the moved timeline stays displayed until [`Self::sync_part`]
    /// receives the updated part. On failure the display reverts.
    pub fn release(&mut self, committer: &mut impl TimingCommitter) -> Result<Movement, SessionError> {
        let drag = self.drag.take().ok_or(SessionError::NoActiveDrag)?;
        let movement = drag.movement;

        for changed in &movement.changed_objects {
            let Some(change) = TimingChange::from_element(&changed.element) else {
                continue;
            };
            if let Err(err) = committer.commit_timing_change(self.part.id, &change) {
                tracing::warn!(part = %self.part.id, element = %change.element_id, error = %err, "timing commit failed, reverting");
                return Err(err.into());
            }
        }

        if !movement.is_empty() {
            tracing::debug!(part = %self.part.id, changed = movement.changed_objects.len(), "timing committed");
            self.pending = Some(movement.clone());
        }
        Ok(movement)
    }

    /// Abandon the drag; the display reverts
    pub fn cancel(&mut self) {
        if self.drag.take().is_some() {
            tracing::debug!(part = %self.part.id, "timeline drag cancelled");
        }
    }

    /// Receive the authoritative part. Returns whether the timeline was re-derived.
    ///
    /// While a commit is pending, an unchanged part is ignored so the display
    /// does not flash back before the backend catches up. A changed part
    /// clears the pending flag and cancels any drag in progress. A part that
    /// fails to resolve leaves the session untouched.
    pub fn sync_part(&mut self, part: Part) -> Result<bool, SessionError> {
        if part == self.part {
            return Ok(false);
        }
        let resolved = resolve(&part.timeline, self.anchor, &mut self.cache)?;
        self.cancel();
        self.pending = None;
        self.part = part;
        self.install(resolved);
        Ok(true)
    }

    /// Move the anchor (`now`) and re-derive the timeline
    pub fn set_anchor(&mut self, anchor: Time) -> Result<(), SessionError> {
        if anchor != self.anchor {
            let resolved = resolve(&self.part.timeline, anchor, &mut self.cache)?;
            self.anchor = anchor;
            self.install(resolved);
        }
        Ok(())
    }

    fn install(&mut self, resolved: ResolvedTimeline) {
        self.snap_points = build_snap_points(&resolved);
        self.resolved = resolved;
    }
}

/// Error from a drag session
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// Only one drag per part at a time
    #[error("A drag is already in progress")]
    DragInProgress,

    /// The previous drag's commit has not been reflected yet
    #[error("Waiting for the backend to confirm the previous change")]
    AwaitingBackend,

    /// No drag to update or release
    #[error("No drag in progress")]
    NoActiveDrag,

    /// Element not in the part's timeline
    #[error("Element not found: #{0}")]
    UnknownElement(ElementId),

    /// The part's timeline cannot be resolved
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// The backend refused a change
    #[error(transparent)]
    Commit(#[from] CommitError),
}
