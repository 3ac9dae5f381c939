//! Session configuration
//!
//! Every field has a default, so a config file only needs the keys it
//! changes.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::capture::FacingMode;
use crate::processing::ProcessingOptions;
use crate::utils::error::AppResult;

/// Tunables for the session orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SessionConfig {
    /// Minimum clip length accepted by stop (inclusive)
    pub min_recording_secs: u64,

    /// Wait after a successful lens reload before recording starts
    pub lens_settle_ms: u64,

    /// Debounce before restoring the feed on focus regain
    pub focus_restore_delay_ms: u64,

    /// Debounce before restoring the feed when the page becomes visible
    pub visibility_restore_delay_ms: u64,

    /// Restore delay after closing the preview or cancelling processing
    pub dismiss_restore_delay_ms: u64,

    /// Restore delay after clearing a recording
    pub clear_restore_delay_ms: u64,

    /// Restore delay after a download
    pub download_restore_delay_ms: u64,

    /// Pause after a share cycle before the session resets
    pub share_reset_delay_ms: u64,

    /// Low-resolution warning floor
    pub min_surface_width: u32,
    pub min_surface_height: u32,

    /// Forward finished recordings straight to processing
    pub auto_share: bool,

    /// Open the microphone together with the camera
    pub capture_audio: bool,

    /// Camera used on first initialization
    pub initial_facing: FacingMode,

    /// Maximum entries kept by the debug log
    pub debug_log_capacity: usize,

    pub processing: ProcessingOptions,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            min_recording_secs: 3,
            lens_settle_ms: 500,
            focus_restore_delay_ms: 200,
            visibility_restore_delay_ms: 100,
            dismiss_restore_delay_ms: 100,
            clear_restore_delay_ms: 200,
            download_restore_delay_ms: 500,
            share_reset_delay_ms: 1000,
            min_surface_width: 640,
            min_surface_height: 480,
            auto_share: false,
            capture_audio: true,
            initial_facing: FacingMode::Front,
            debug_log_capacity: 200,
            processing: ProcessingOptions::default(),
        }
    }
}

impl SessionConfig {
    /// Load from a JSON file
    pub fn from_json_file(path: &Path) -> AppResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let config = serde_json::from_str(&text)?;
        Ok(config)
    }

    pub fn lens_settle(&self) -> Duration {
        Duration::from_millis(self.lens_settle_ms)
    }
}
