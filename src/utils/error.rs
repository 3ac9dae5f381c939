//! Error types and handling
//!
//! Common error types used across the application.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::{CameraErrorInfo, CameraErrorKind, DeviceError, EngineError};
use crate::processing::{HandoffError, ProcessingError};
use crate::recorder::RecordingError;

/// Application-wide error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{}", .0.message)]
    Camera(CameraErrorInfo),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Recording(#[from] RecordingError),

    #[error(transparent)]
    Processing(#[from] ProcessingError),

    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error("Camera is not ready")]
    CameraNotReady,

    #[error("Another operation is in progress")]
    Busy,

    #[error("No recording available")]
    NoCapture,
}

impl AppError {
    /// Stable code for the presentation layer
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Camera(info) => match info.kind {
                CameraErrorKind::PermissionDenied => "PERMISSION_DENIED",
                CameraErrorKind::InsecureContext => "INSECURE_CONTEXT",
                CameraErrorKind::EngineInitFailure => "ENGINE_INIT_FAILURE",
                _ => "DEVICE_UNAVAILABLE",
            },
            AppError::Device(DeviceError::PermissionDenied) => "PERMISSION_DENIED",
            AppError::Device(_) => "DEVICE_UNAVAILABLE",
            AppError::Engine(_) => "ENGINE_INIT_FAILURE",
            AppError::Recording(_) => "RECORDING_ERROR",
            AppError::Processing(_) => "PROCESSING_ERROR",
            AppError::Handoff(_) => "HANDOFF_ERROR",
            AppError::CameraNotReady => "CAMERA_NOT_READY",
            AppError::Busy => "BUSY",
            AppError::NoCapture => "NO_CAPTURE",
        }
    }
}

/// Error response for frontend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        ErrorResponse {
            code: error.code().to_string(),
            message: error.to_string(),
        }
    }
}

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
