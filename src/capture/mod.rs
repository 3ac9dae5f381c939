//! Camera capture lifecycle
//!
//! This module owns the camera stream and drives the AR engine that renders it.

pub mod camera;
pub mod state;
pub mod traits;

pub use camera::CameraManager;
pub use state::{CameraErrorInfo, CameraErrorKind, CameraState, FacingMode};
pub use traits::{
    ArEngine, CaptureSurface, DeviceError, EngineError, MediaDevices, MediaStream,
    PermissionStatus, RenderTarget, SharedStream, StreamRequest, TrackInfo, TrackKind,
    TrackReadyState,
};
