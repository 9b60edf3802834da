// SPDX-License-Identifier: MIT OR Apache-2.0
//! Scripted editing sessions.
//!
//! A script is a RON file holding a rundown and the gestures to replay
//! against it. Parts and groups are referred to by name.

use crate::backend::MemoryBackend;
use crate::error::HostError;
use crate::settings::Settings;
use cueline_rundown::{
    GroupPlayhead, HoverOutcome, HoverTarget, Modifiers, Part, PartId, PartReorder, Rundown,
    SessionError, TimelineDragSession,
};
use cueline_timeline::{sorted_layers, total_duration, ElementId, Mappings, Time};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

fn default_row_height() -> f64 {
    40.0
}

/// One scripted gesture or backend event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    /// Grab an element in a part's timeline
    BeginDrag {
        /// Part name
        part: String,
        /// Element under the pointer
        leader: String,
        /// Co-selected elements
        #[serde(default)]
        selected: Vec<String>,
    },
    /// Move the pointer
    DragTo {
        /// Part name
        part: String,
        /// Horizontal travel since the drag began
        pixel_delta: f64,
        /// Held modifiers
        #[serde(default)]
        modifiers: Modifiers,
    },
    /// Release the pointer, committing the drag
    Release {
        /// Part name
        part: String,
    },
    /// Abandon the drag
    CancelDrag {
        /// Part name
        part: String,
    },
    /// Deliver the backend's current version of a part to its session
    SyncPart {
        /// Part name
        part: String,
    },
    /// Take the backend offline or bring it back
    SetOffline(bool),
    /// Move `now`
    SetAnchor(Time),
    /// Put a part on air in its group, or take the group off air
    SetPlayhead {
        /// Group name
        group: String,
        /// Part name, or `None` to stop
        part: Option<String>,
    },
    /// Grab a part in the rundown list
    BeginPartDrag {
        /// Part name
        part: String,
    },
    /// Hover over a row of the rundown list
    HoverPart {
        /// Group of the hovered row
        group: String,
        /// Position of the hovered part in the group
        part_index: usize,
        /// Pointer position from the top of the row
        pointer_offset: f64,
        /// Row height
        #[serde(default = "default_row_height")]
        row_height: f64,
    },
    /// Drop the dragged part
    DropPart,
    /// Abandon the part drag
    CancelPartDrag,
}

/// A rundown and the events to replay against it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Initial value of `now`
    #[serde(default)]
    pub anchor: Time,
    /// Layer display names
    #[serde(default)]
    pub mappings: Mappings,
    /// Initial rundown
    pub rundown: Rundown,
    /// Events in order
    pub events: Vec<Event>,
}

impl Script {
    /// Load a script from a file
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text, path)
    }

    /// Parse a script from RON text
    pub fn from_ron(text: &str, origin: &Path) -> Result<Self, HostError> {
        ron::from_str(text).map_err(|source| HostError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }
}

/// What replaying one event produced
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// A timeline drag started
    DragStarted,
    /// The timeline moved by `delta` milliseconds
    Dragged {
        /// Applied delta after snapping
        delta: Time,
        /// Elements whose start changed
        changed: usize,
    },
    /// The drag was committed
    Committed {
        /// Elements persisted
        changed: usize,
    },
    /// The session refused the event
    Refused(String),
    /// A part was delivered to its session
    Synced {
        /// Whether the timeline was re-derived
        rederived: bool,
    },
    /// A part drag started
    PartDragStarted,
    /// A hover was evaluated
    Hover(HoverOutcome),
    /// A part drag ended
    PartDropped,
    /// Nothing to report
    Done,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DragStarted => f.write_str("drag started"),
            Self::Dragged { delta, changed } => write!(f, "dragged {delta}ms, {changed} changed"),
            Self::Committed { changed } => write!(f, "committed {changed} changes"),
            Self::Refused(reason) => write!(f, "refused: {reason}"),
            Self::Synced { rederived } => write!(f, "synced (re-derived: {rederived})"),
            Self::PartDragStarted => f.write_str("part drag started"),
            Self::Hover(outcome) => write!(f, "hover: {outcome:?}"),
            Self::PartDropped => f.write_str("part dropped"),
            Self::Done => f.write_str("done"),
        }
    }
}

/// Replays scripts against an in-memory backend
#[derive(Debug)]
pub struct Replayer {
    settings: Settings,
    anchor: Time,
    mappings: Mappings,
    backend: MemoryBackend,
    sessions: IndexMap<PartId, TimelineDragSession>,
    reorder: PartReorder,
}

impl Replayer {
    /// Create a replayer for `script`'s rundown
    pub fn new(settings: Settings, script: &Script) -> Self {
        Self {
            settings,
            anchor: script.anchor,
            mappings: script.mappings.clone(),
            backend: MemoryBackend::new(script.rundown.clone()),
            sessions: IndexMap::new(),
            reorder: PartReorder::new(),
        }
    }

    /// Authoritative rundown
    pub fn rundown(&self) -> &Rundown {
        &self.backend.rundown
    }

    /// Timing changes accepted by the backend
    pub fn commits(&self) -> usize {
        self.backend.commits
    }

    /// Session of a part, if one was opened
    pub fn session(&self, part: &str) -> Option<&TimelineDragSession> {
        let part = self.find_part(part).ok()?;
        self.sessions.get(&part.id)
    }

    /// Replay every event of `script`
    pub fn run(&mut self, script: &Script) -> Result<Vec<Outcome>, HostError> {
        tracing::info!(
            rundown = %script.rundown.name,
            events = script.events.len(),
            "replaying script"
        );
        script.events.iter().map(|event| self.apply(event)).collect()
    }

    /// Replay one event
    pub fn apply(&mut self, event: &Event) -> Result<Outcome, HostError> {
        let outcome = match event {
            Event::BeginDrag {
                part,
                leader,
                selected,
            } => {
                let leader = ElementId::new(leader.as_str());
                if let Some(element) = self.find_part(part).ok().and_then(|p| p.element(&leader)) {
                    let content = element.content.describe().label;
                    tracing::info!(%leader, %content, "grabbed element");
                }
                let selected = selected.iter().map(|s| ElementId::new(s.as_str())).collect();
                let width = self.settings.track_width_px;
                match self.session_mut(part)?.begin_drag(leader, selected, width) {
                    Ok(()) => Outcome::DragStarted,
                    Err(err) => refused(&err),
                }
            }
            Event::DragTo {
                part,
                pixel_delta,
                modifiers,
            } => {
                let session = self.session_mut(part)?;
                match session.drag_to(*pixel_delta, *modifiers) {
                    Ok(movement) => Outcome::Dragged {
                        delta: movement.delta,
                        changed: movement.changed_objects.len(),
                    },
                    Err(err) => refused(&err),
                }
            }
            Event::Release { part } => {
                let id = self.session_mut(part)?.part().id;
                let session = self
                    .sessions
                    .get_mut(&id)
                    .ok_or_else(|| HostError::UnknownPart(part.clone()))?;
                match session.release(&mut self.backend) {
                    Ok(movement) => Outcome::Committed {
                        changed: movement.changed_objects.len(),
                    },
                    Err(err) => refused(&err),
                }
            }
            Event::CancelDrag { part } => {
                self.session_mut(part)?.cancel();
                Outcome::Done
            }
            Event::SyncPart { part } => {
                let latest = self.find_part(part)?.clone();
                let rederived = self.session_mut(part)?.sync_part(latest)?;
                Outcome::Synced { rederived }
            }
            Event::SetOffline(offline) => {
                self.backend.offline = *offline;
                Outcome::Done
            }
            Event::SetAnchor(anchor) => {
                self.anchor = *anchor;
                for session in self.sessions.values_mut() {
                    session.set_anchor(*anchor)?;
                }
                Outcome::Done
            }
            Event::SetPlayhead { group, part } => {
                let part = match part {
                    Some(name) => Some(self.find_part(name)?.id),
                    None => None,
                };
                let group = self
                    .backend
                    .rundown
                    .groups
                    .iter_mut()
                    .find(|g| &g.name == group)
                    .ok_or_else(|| HostError::UnknownGroup(group.clone()))?;
                group.playhead = part.map(|part_id| GroupPlayhead {
                    part_id,
                    playhead_time: 0,
                    part_end_time: 0,
                });
                Outcome::Done
            }
            Event::BeginPartDrag { part } => {
                let id = self.find_part(part)?.id;
                let rundown = &self.backend.rundown;
                let started = rundown
                    .groups
                    .iter()
                    .enumerate()
                    .find(|(_, g)| g.part(id).is_some())
                    .is_some_and(|(index, group)| self.reorder.begin(group, index, id));
                if started {
                    Outcome::PartDragStarted
                } else {
                    Outcome::Refused(format!("part '{part}' not in any group"))
                }
            }
            Event::HoverPart {
                group,
                part_index,
                pointer_offset,
                row_height,
            } => {
                let group_index = self
                    .backend
                    .rundown
                    .groups
                    .iter()
                    .position(|g| &g.name == group)
                    .ok_or_else(|| HostError::UnknownGroup(group.clone()))?;
                let hovered = self.backend.rundown.groups[group_index].clone();
                let target = HoverTarget {
                    group: &hovered,
                    group_index,
                    part_index: *part_index,
                    pointer_offset: *pointer_offset,
                    row_height: *row_height,
                };
                Outcome::Hover(self.reorder.hover(&target, &mut self.backend))
            }
            Event::DropPart => match self.reorder.drop() {
                Some(_) => Outcome::PartDropped,
                None => Outcome::Refused("no part drag in progress".to_string()),
            },
            Event::CancelPartDrag => {
                self.reorder.cancel();
                Outcome::Done
            }
        };

        tracing::info!(?event, %outcome, "event replayed");
        Ok(outcome)
    }

    fn find_part(&self, name: &str) -> Result<&Part, HostError> {
        self.backend
            .rundown
            .groups
            .iter()
            .flat_map(|g| g.parts.iter())
            .find(|p| p.name == name)
            .ok_or_else(|| HostError::UnknownPart(name.to_string()))
    }

    fn session_mut(&mut self, name: &str) -> Result<&mut TimelineDragSession, HostError> {
        let id = self.find_part(name)?.id;
        if !self.sessions.contains_key(&id) {
            let part = self.find_part(name)?.clone();
            let session = TimelineDragSession::new(part, self.anchor, self.settings.drag.clone())?;
            let resolved = session.resolved_timeline();
            let layers: Vec<String> = sorted_layers(resolved, &self.mappings)
                .into_iter()
                .map(|(layer, _)| {
                    self.mappings
                        .get(layer)
                        .map_or_else(|| layer.to_string(), |m| m.layer_name.clone())
                })
                .collect();
            tracing::info!(
                part = name,
                duration = total_duration(resolved),
                ?layers,
                "opened timeline"
            );
            self.sessions.insert(id, session);
        }
        self.sessions
            .get_mut(&id)
            .ok_or_else(|| HostError::UnknownPart(name.to_string()))
    }
}

fn refused(err: &SessionError) -> Outcome {
    tracing::warn!(error = %err, "event refused");
    Outcome::Refused(err.to_string())
}

/// Load and replay a script file
pub fn replay_file(path: &Path, settings: Settings) -> Result<Vec<Outcome>, HostError> {
    let script = Script::load(path)?;
    let mut replayer = Replayer::new(settings, &script);
    let outcomes = replayer.run(&script)?;
    for part in replayer.rundown().groups.iter().flat_map(|g| g.parts.iter()) {
        if let Some(session) = replayer.session(&part.name) {
            let stats = session.cache_stats();
            tracing::info!(
                part = %part.name,
                pending = session.is_pending(),
                cache_hit_rate = stats.hit_rate(),
                "session state"
            );
        }
    }
    tracing::info!(
        commits = replayer.commits(),
        groups = replayer.rundown().groups.len(),
        "script finished"
    );
    Ok(outcomes)
}
