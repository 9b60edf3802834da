// SPDX-License-Identifier: MIT OR Apache-2.0
//! In-memory backend standing in for the persistence layer.

use cueline_rundown::{
    CommitError, Group, MovePartRequest, PartMover, PartId, Rundown, TimingChange, TimingCommitter,
};

/// Backend holding the authoritative rundown
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    /// Authoritative rundown
    pub rundown: Rundown,
    /// Refuse every timing commit, as if the backend were offline
    pub offline: bool,
    /// Timing changes accepted so far
    pub commits: usize,
}

impl MemoryBackend {
    /// Create a backend for `rundown`
    pub fn new(rundown: Rundown) -> Self {
        Self {
            rundown,
            offline: false,
            commits: 0,
        }
    }
}

impl TimingCommitter for MemoryBackend {
    fn commit_timing_change(&mut self, part: PartId, change: &TimingChange) -> Result<(), CommitError> {
        if self.offline {
            return Err(CommitError::Unavailable("backend offline".to_string()));
        }
        self.rundown.commit_timing_change(part, change)?;
        self.commits += 1;
        tracing::info!(%part, element = %change.element_id, start = %change.start, "timing change stored");
        Ok(())
    }
}

impl PartMover for MemoryBackend {
    fn attempt_move_part(&mut self, request: &MovePartRequest) -> Option<Group> {
        let group = self.rundown.attempt_move_part(request)?;
        tracing::info!(part = %request.part, group = %group.name, "part moved");
        Some(group)
    }
}
