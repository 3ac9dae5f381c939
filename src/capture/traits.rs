//! Capture collaborator contracts
//!
//! Platform-agnostic traits for the device media API and the AR engine,
//! plus the stream, track, and surface types they exchange.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use super::state::FacingMode;

/// Lifecycle state of a single media track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackReadyState {
    Live,
    Ended,
}

/// Kind of media carried by a track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Audio,
    Video,
}

/// Snapshot of a media track as reported by the device API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInfo {
    /// Audio or video
    pub kind: TrackKind,

    /// Device label (may be empty when the platform hides it)
    pub label: String,

    /// Whether the track is still producing media
    pub ready_state: TrackReadyState,

    /// Whether the track is enabled
    pub enabled: bool,
}

impl TrackInfo {
    /// A live, enabled track
    pub fn live(kind: TrackKind, label: impl Into<String>) -> Self {
        Self {
            kind,
            label: label.into(),
            ready_state: TrackReadyState::Live,
            enabled: true,
        }
    }

    /// Whether this track can contribute media to a recording
    pub fn is_usable(&self) -> bool {
        self.ready_state == TrackReadyState::Live && self.enabled
    }

    /// Label suitable for logs
    pub fn display_label(&self) -> &str {
        if self.label.is_empty() {
            "Unknown"
        } else {
            &self.label
        }
    }
}

/// A camera (+ optional microphone) stream.
///
/// Streams are owned by the camera manager. Everyone else receives a
/// [`SharedStream`] clone and may only read track state from it.
pub trait MediaStream: Send + Sync + fmt::Debug {
    /// Stable identifier for logs
    fn id(&self) -> &str;

    /// Current snapshot of all tracks
    fn tracks(&self) -> Vec<TrackInfo>;

    fn video_tracks(&self) -> Vec<TrackInfo> {
        self.tracks()
            .into_iter()
            .filter(|t| t.kind == TrackKind::Video)
            .collect()
    }

    fn audio_tracks(&self) -> Vec<TrackInfo> {
        self.tracks()
            .into_iter()
            .filter(|t| t.kind == TrackKind::Audio)
            .collect()
    }
}

/// Read-only handle to a stream owned by the camera manager
pub type SharedStream = Arc<dyn MediaStream>;

/// Parameters for acquiring a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamRequest {
    /// Which physical camera to open
    pub facing_mode: FacingMode,

    /// Whether to also open the microphone
    pub include_audio: bool,
}

/// Result of a permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    /// The platform will ask the user on first acquisition
    Prompt,
}

/// Failures reported by the device media API
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("No camera device found")]
    NoDevice,

    #[error("Camera permission denied")]
    PermissionDenied,

    #[error("Requested constraints cannot be satisfied: {0}")]
    Overconstrained(String),

    #[error("Device error: {0}")]
    Other(String),
}

/// Device media API (camera/microphone acquisition)
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Whether the execution context allows camera access at all
    fn is_secure_context(&self) -> bool;

    /// Query camera and microphone permission without keeping a stream open
    async fn query_permission(&self) -> Result<PermissionStatus, DeviceError>;

    /// Explicitly ask the user for camera/microphone access
    async fn request_permission(&self) -> Result<PermissionStatus, DeviceError>;

    /// Acquire a new stream
    async fn open_stream(&self, request: StreamRequest) -> Result<SharedStream, DeviceError>;

    /// Stop every track of a stream previously returned by `open_stream`
    fn release(&self, stream: &SharedStream);
}

/// Identifies the on-screen element the AR engine renders into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTarget {
    pub id: String,
}

impl RenderTarget {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// The engine's rendered output, usable as a recording source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureSurface {
    /// Surface identifier
    pub id: String,

    /// Width in pixels
    pub width: u32,

    /// Height in pixels
    pub height: u32,
}

impl CaptureSurface {
    /// Whether either dimension is below the given floor
    pub fn is_below(&self, min_width: u32, min_height: u32) -> bool {
        self.width < min_width || self.height < min_height
    }
}

/// Failures reported by the AR engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("AR engine initialization failed: {0}")]
    Initialization(String),

    #[error("Lens reload failed: {0}")]
    Reload(String),

    #[error("Render target unavailable: {0}")]
    Target(String),
}

/// AR engine lifecycle contract. The rendering pipeline itself is opaque.
#[async_trait]
pub trait ArEngine: Send + Sync {
    /// Bind a stream to the engine and start rendering into `target`.
    /// Also used to re-point a running engine at a replacement stream.
    async fn initialize(&self, stream: SharedStream, target: &RenderTarget) -> Result<(), EngineError>;

    /// Restart the active effect without touching the camera stream
    async fn reload_effect(&self) -> Result<(), EngineError>;

    /// Re-attach the current source to `target` (after backgrounding etc.)
    fn rebind(&self, target: &RenderTarget) -> Result<(), EngineError>;

    /// The surface the engine renders into, if it has one yet
    fn output_surface(&self) -> Option<CaptureSurface>;
}
