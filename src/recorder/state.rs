//! Recording state management
//!
//! Defines the recording state machine and the raw capture it produces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Current state of the recording system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    #[default]
    Idle,
    /// Currently recording
    Recording,
    /// Capture is being finalized
    Processing,
}

/// Bytes produced by a finished recording.
///
/// The data is immutable and reference counted, so handing a clone to the
/// processing pipeline never disturbs the original.
#[derive(Debug, Clone)]
pub struct RawCapture {
    pub id: Uuid,
    pub data: Arc<[u8]>,
    pub mime_type: String,
    /// Whole seconds recorded
    pub duration_seconds: u64,
    pub has_audio: bool,
    pub captured_at: DateTime<Utc>,
}

impl RawCapture {
    pub fn new(data: Vec<u8>, mime_type: impl Into<String>, duration_seconds: u64, has_audio: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            data: Arc::from(data),
            mime_type: mime_type.into(),
            duration_seconds,
            has_audio,
            captured_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Short container name used in analytics and file names
    pub fn video_format(&self) -> &'static str {
        if self.mime_type.contains("mp4") {
            "mp4"
        } else {
            "webm"
        }
    }
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum StopOutcome {
    /// Refused: below the minimum duration. Still recording.
    TooShort { elapsed_seconds: u64 },
    /// Capture finalized and available
    Finalized { duration_seconds: u64, size_bytes: usize },
}

/// Result of the record-button toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum ToggleOutcome {
    Started,
    Stopped { outcome: StopOutcome },
    /// Toggle pressed while finalizing
    Ignored,
}

/// Format whole seconds as `MM:SS`
pub fn format_time(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
