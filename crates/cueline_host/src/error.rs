// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host errors.

use cueline_rundown::SessionError;
use std::path::PathBuf;

/// Error raised by the host
#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// A file could not be read
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// A file is not valid RON for its type
    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        /// File path
        path: PathBuf,
        /// Underlying error
        source: ron::error::SpannedError,
    },

    /// Settings written by a newer version
    #[error("Settings version {found} is newer than supported version {supported}")]
    UnsupportedVersion {
        /// Version in the file
        found: u32,
        /// Newest supported version
        supported: u32,
    },

    /// A script names a part that does not exist
    #[error("Unknown part '{0}'")]
    UnknownPart(String),

    /// A script names a group that does not exist
    #[error("Unknown group '{0}'")]
    UnknownGroup(String),

    /// A part's timeline cannot be edited
    #[error(transparent)]
    Session(#[from] SessionError),
}
