//! Side channels: analytics events and the debug log
//!
//! Both are fire-and-forget. Nothing returned from a sink is ever consulted
//! for control flow.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::VecDeque;

/// Analytics destination
pub trait EventSink: Send + Sync {
    /// Record one event. Implementations must not block or panic.
    fn record(&self, name: &str, metadata: Map<String, Value>);
}

/// Debug log destination
pub trait LogSink: Send + Sync {
    fn append(&self, message: &str);
}

/// Events the session reports
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum AnalyticsEvent {
    RecordingStarted {
        has_audio: bool,
        canvas_width: u32,
        canvas_height: u32,
    },
    RecordingCompleted {
        duration: u64,
        has_audio: bool,
    },
    ShareAttempt {
        video_duration: u64,
        video_format: String,
    },
    ShareCompleted {
        success: bool,
        video_duration: u64,
        video_format: String,
    },
    VideoDownloaded {
        video_duration: u64,
        video_format: String,
        file_size: usize,
    },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::RecordingStarted { .. } => "recording_started",
            AnalyticsEvent::RecordingCompleted { .. } => "recording_completed",
            AnalyticsEvent::ShareAttempt { .. } => "share_attempt",
            AnalyticsEvent::ShareCompleted { .. } => "share_completed",
            AnalyticsEvent::VideoDownloaded { .. } => "video_downloaded",
        }
    }

    /// Event fields as a JSON map, without the event name
    pub fn metadata(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("event");
                map
            }
            _ => Map::new(),
        }
    }
}

/// Writes analytics events to the `analytics` tracing target
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn record(&self, name: &str, metadata: Map<String, Value>) {
        let metadata = Value::Object(metadata);
        tracing::info!(target: "analytics", event = name, metadata = %metadata);
    }
}

/// Drops every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn record(&self, _name: &str, _metadata: Map<String, Value>) {}
}

/// A single debug log line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugLogEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// In-memory debug log for the settings panel, keeping the newest entries
pub struct DebugLog {
    entries: Mutex<VecDeque<DebugLogEntry>>,
    capacity: usize,
}

impl DebugLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::new()),
            capacity: capacity.max(1),
        }
    }

    pub fn entries(&self) -> Vec<DebugLogEntry> {
        self.entries.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
    }

    /// Newline-separated `[timestamp] message` lines, oldest first
    pub fn export(&self) -> String {
        self.entries
            .lock()
            .iter()
            .map(|e| format!("[{}] {}", e.timestamp.to_rfc3339(), e.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for DebugLog {
    fn default() -> Self {
        Self::new(200)
    }
}

impl LogSink for DebugLog {
    fn append(&self, message: &str) {
        let mut entries = self.entries.lock();
        entries.push_back(DebugLogEntry {
            timestamp: Utc::now(),
            message: message.to_string(),
        });
        while entries.len() > self.capacity {
            entries.pop_front();
        }
    }
}
