// SPDX-License-Identifier: MIT OR Apache-2.0
//! Host settings, stored as RON.

use crate::error::HostError;
use cueline_rundown::DragConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current settings format version
pub const SETTINGS_FORMAT_VERSION: u32 = 1;

/// Log directives used when neither the settings nor `RUST_LOG` give any
pub const DEFAULT_LOG_FILTER: &str = "cueline_host=info,cueline_rundown=debug,cueline_timeline=info";

/// Host settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Settings format version
    pub version: u32,
    /// Timeline drag behaviour
    pub drag: DragConfig,
    /// `tracing` filter directives
    pub log_filter: String,
    /// Width of the timeline track in pixels
    pub track_width_px: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: SETTINGS_FORMAT_VERSION,
            drag: DragConfig::default(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            track_width_px: 1000.0,
        }
    }
}

impl Settings {
    /// Parse settings from RON text
    pub fn from_ron(text: &str, origin: &Path) -> Result<Self, HostError> {
        let settings: Settings = ron::from_str(text).map_err(|source| HostError::Parse {
            path: origin.to_path_buf(),
            source,
        })?;

        if settings.version > SETTINGS_FORMAT_VERSION {
            return Err(HostError::UnsupportedVersion {
                found: settings.version,
                supported: SETTINGS_FORMAT_VERSION,
            });
        }

        Ok(settings)
    }

    /// Load settings from a file
    pub fn load(path: &Path) -> Result<Self, HostError> {
        let text = std::fs::read_to_string(path).map_err(|source| HostError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text, path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cueline_rundown::ModifierKey;

    #[test]
    fn test_partial_settings_use_defaults() {
        let settings = Settings::from_ron(
            "(track_width_px: 1600.0, drag: (bypass_snap: [Alt]))",
            Path::new("inline"),
        )
        .unwrap();
        assert_eq!(settings.track_width_px, 1600.0);
        assert_eq!(settings.drag.bypass_snap, vec![ModifierKey::Alt]);
        assert_eq!(settings.drag.snap_distance_px, 10.0);
        assert_eq!(settings.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_newer_version_rejected() {
        let err = Settings::from_ron("(version: 99)", Path::new("inline")).unwrap_err();
        assert!(matches!(err, HostError::UnsupportedVersion { found: 99, .. }));
    }

    #[test]
    fn test_invalid_ron_reports_path() {
        let err = Settings::from_ron("(track_width_px: wide)", Path::new("host.ron")).unwrap_err();
        assert!(err.to_string().contains("host.ron"));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("cueline-settings-{}.ron", std::process::id()));
        std::fs::write(&path, "(log_filter: \"debug\")").unwrap();
        let settings = Settings::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(settings.log_filter, "debug");

        assert!(matches!(Settings::load(&path), Err(HostError::Io { .. })));
    }
}
