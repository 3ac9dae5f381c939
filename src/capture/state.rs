//! Camera state management
//!
//! Defines the camera state machine and its error payloads.

use serde::{Deserialize, Serialize};

use super::traits::{DeviceError, EngineError};

/// Current state of the camera + AR engine pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraState {
    /// Nothing acquired yet
    #[default]
    Uninitialized,
    /// Acquiring a stream or starting the engine
    Initializing,
    /// Stream live and engine rendering
    Ready,
    /// Device or engine failure
    Error,
    /// The user or platform refused camera access
    PermissionDenied,
    /// Camera access needs a secure (https) context
    HttpsRequired,
}

impl CameraState {
    /// Whether this state blocks the main flow until the user acts
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            CameraState::Error | CameraState::PermissionDenied | CameraState::HttpsRequired
        )
    }
}

/// Physical camera selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacingMode {
    #[default]
    Front,
    Back,
}

impl FacingMode {
    pub fn opposite(self) -> Self {
        match self {
            FacingMode::Front => FacingMode::Back,
            FacingMode::Back => FacingMode::Front,
        }
    }
}

/// Error categories surfaced to the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CameraErrorKind {
    PermissionDenied,
    InsecureContext,
    DeviceUnavailable,
    Overconstrained,
    EngineInitFailure,
    Unknown,
}

/// Structured error attached to error-like camera states
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraErrorInfo {
    pub kind: CameraErrorKind,
    pub message: String,
}

impl CameraErrorInfo {
    pub fn new(kind: CameraErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn insecure_context() -> Self {
        Self::new(
            CameraErrorKind::InsecureContext,
            "Camera access requires a secure (HTTPS) connection",
        )
    }

    pub fn permission_denied() -> Self {
        Self::new(
            CameraErrorKind::PermissionDenied,
            "Camera and microphone access was denied. Allow access and try again.",
        )
    }

    /// The camera state a given error info belongs to
    pub fn state(&self) -> CameraState {
        match self.kind {
            CameraErrorKind::PermissionDenied => CameraState::PermissionDenied,
            CameraErrorKind::InsecureContext => CameraState::HttpsRequired,
            _ => CameraState::Error,
        }
    }
}

impl From<&DeviceError> for CameraErrorInfo {
    fn from(error: &DeviceError) -> Self {
        match error {
            DeviceError::NoDevice => Self::new(
                CameraErrorKind::DeviceUnavailable,
                "No camera found on this device",
            ),
            DeviceError::PermissionDenied => Self::permission_denied(),
            DeviceError::Overconstrained(detail) => Self::new(
                CameraErrorKind::Overconstrained,
                format!("The camera does not support the requested settings ({detail})"),
            ),
            DeviceError::Other(detail) => Self::new(CameraErrorKind::Unknown, detail.clone()),
        }
    }
}

impl From<&EngineError> for CameraErrorInfo {
    fn from(error: &EngineError) -> Self {
        Self::new(CameraErrorKind::EngineInitFailure, error.to_string())
    }
}
