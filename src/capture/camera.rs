//! Camera lifecycle manager
//!
//! Owns permission probing, the physical camera stream, facing-mode
//! switching, and the AR engine's initialize/reload/rebind calls.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::state::{CameraErrorInfo, CameraState, FacingMode};
use super::traits::{
    ArEngine, CaptureSurface, DeviceError, MediaDevices, PermissionStatus, RenderTarget,
    SharedStream, StreamRequest,
};

#[derive(Debug, Default)]
struct CameraInner {
    state: CameraState,
    facing_mode: FacingMode,
    /// Held while ready, and kept (possibly stale) across a camera switch
    stream: Option<SharedStream>,
    error_info: Option<CameraErrorInfo>,
    render_target: Option<RenderTarget>,
    include_audio: bool,
}

/// Manages the camera stream and the AR engine bound to it
pub struct CameraManager {
    devices: Arc<dyn MediaDevices>,
    engine: Arc<dyn ArEngine>,
    inner: Arc<RwLock<CameraInner>>,
    switching: AtomicBool,
}

impl CameraManager {
    /// Create a manager that will open `facing_mode` first
    pub fn new(
        devices: Arc<dyn MediaDevices>,
        engine: Arc<dyn ArEngine>,
        facing_mode: FacingMode,
    ) -> Self {
        Self {
            devices,
            engine,
            inner: Arc::new(RwLock::new(CameraInner {
                facing_mode,
                include_audio: true,
                ..Default::default()
            })),
            switching: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> CameraState {
        self.inner.read().state
    }

    pub fn is_ready(&self) -> bool {
        self.state() == CameraState::Ready
    }

    pub fn facing_mode(&self) -> FacingMode {
        self.inner.read().facing_mode
    }

    /// Borrow the current stream. Callers must not stop its tracks.
    pub fn stream(&self) -> Option<SharedStream> {
        self.inner.read().stream.clone()
    }

    pub fn error_info(&self) -> Option<CameraErrorInfo> {
        self.inner.read().error_info.clone()
    }

    /// The engine's rendered output, used as the recording source
    pub fn capture_surface(&self) -> Option<CaptureSurface> {
        self.engine.output_surface()
    }

    fn fail(&self, info: CameraErrorInfo) {
        let mut inner = self.inner.write();
        inner.state = info.state();
        inner.error_info = Some(info);
    }

    /// Check camera and microphone permission without holding a stream open.
    ///
    /// Only denial or an insecure context mutate the state.
    pub async fn check_permission(&self) -> bool {
        if !self.devices.is_secure_context() {
            tracing::error!("Camera access requires a secure context");
            self.fail(CameraErrorInfo::insecure_context());
            return false;
        }

        match self.devices.query_permission().await {
            Ok(PermissionStatus::Denied) | Err(DeviceError::PermissionDenied) => {
                tracing::warn!("Camera permission denied");
                self.fail(CameraErrorInfo::permission_denied());
                false
            }
            Ok(status) => {
                tracing::debug!("Camera permission status: {:?}", status);
                true
            }
            Err(e) => {
                // Probing is best-effort; acquisition will surface real failures
                tracing::warn!("Permission query failed, continuing: {}", e);
                true
            }
        }
    }

    /// Explicitly ask the user for access (from the permission-denied screen)
    pub async fn request_permission(&self) -> bool {
        if !self.devices.is_secure_context() {
            self.fail(CameraErrorInfo::insecure_context());
            return false;
        }

        match self.devices.request_permission().await {
            Ok(PermissionStatus::Granted) => {
                tracing::info!("Camera permission granted");
                let mut inner = self.inner.write();
                if inner.state == CameraState::PermissionDenied {
                    inner.state = CameraState::Uninitialized;
                    inner.error_info = None;
                }
                true
            }
            Ok(_) | Err(DeviceError::PermissionDenied) => {
                self.fail(CameraErrorInfo::permission_denied());
                false
            }
            Err(e) => {
                tracing::error!("Permission request failed: {}", e);
                self.fail(CameraErrorInfo::from(&e));
                false
            }
        }
    }

    /// Acquire a new camera (+ optional microphone) stream.
    ///
    /// On failure the state moves to the matching error state; any stream
    /// already held is left untouched.
    pub async fn request_stream(
        &self,
        facing_mode: FacingMode,
        include_audio: bool,
    ) -> Result<SharedStream, DeviceError> {
        {
            let mut inner = self.inner.write();
            if inner.state != CameraState::Ready {
                inner.state = CameraState::Initializing;
                inner.error_info = None;
            }
        }

        tracing::info!(
            "Requesting {:?} camera stream (audio: {})",
            facing_mode,
            include_audio
        );

        let request = StreamRequest {
            facing_mode,
            include_audio,
        };
        match self.devices.open_stream(request).await {
            Ok(stream) => {
                let mut inner = self.inner.write();
                inner.facing_mode = facing_mode;
                inner.include_audio = include_audio;
                Ok(stream)
            }
            Err(e) => {
                tracing::error!("Failed to acquire camera stream: {}", e);
                self.fail(CameraErrorInfo::from(&e));
                Err(e)
            }
        }
    }

    /// Hand a stream to the AR engine for first-time setup
    pub async fn initialize_engine(&self, stream: SharedStream, target: RenderTarget) -> bool {
        self.inner.write().state = CameraState::Initializing;

        tracing::info!("Initializing AR engine with stream {}", stream.id());

        match self.engine.initialize(stream.clone(), &target).await {
            Ok(()) => {
                let previous = {
                    let mut inner = self.inner.write();
                    let previous = inner.stream.replace(stream.clone());
                    inner.render_target = Some(target);
                    inner.state = CameraState::Ready;
                    inner.error_info = None;
                    previous
                };
                if let Some(old) = previous.filter(|old| !Arc::ptr_eq(old, &stream)) {
                    self.devices.release(&old);
                }
                tracing::info!("AR engine ready");
                true
            }
            Err(e) => {
                tracing::error!("AR engine initialization failed: {}", e);
                self.devices.release(&stream);
                let mut inner = self.inner.write();
                inner.stream = None;
                inner.state = CameraState::Error;
                inner.error_info = Some(CameraErrorInfo::from(&e));
                false
            }
        }
    }

    /// Switch to the opposite camera.
    ///
    /// Returns `None` on failure; the previous state stays visible (and the
    /// previous stream stale) so the caller can retry.
    pub async fn switch_camera(&self) -> Option<SharedStream> {
        let (old_stream, target, facing, include_audio) = {
            let inner = self.inner.read();
            if inner.state != CameraState::Ready {
                tracing::warn!("Cannot switch camera in state {:?}", inner.state);
                return None;
            }
            match (inner.stream.clone(), inner.render_target.clone()) {
                (Some(stream), Some(target)) => {
                    (stream, target, inner.facing_mode, inner.include_audio)
                }
                _ => {
                    tracing::warn!("Cannot switch camera without an active stream");
                    return None;
                }
            }
        };

        if self
            .switching
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Camera switch already in progress");
            return None;
        }

        let next_facing = facing.opposite();
        tracing::info!("Switching camera {:?} -> {:?}", facing, next_facing);

        self.inner.write().state = CameraState::Initializing;
        self.devices.release(&old_stream);

        let result = self.attach_new_stream(next_facing, include_audio, &target).await;

        {
            let mut inner = self.inner.write();
            match &result {
                Some(stream) => {
                    inner.stream = Some(stream.clone());
                    inner.facing_mode = next_facing;
                }
                None => {
                    tracing::warn!("Camera switch failed, keeping previous state");
                }
            }
            inner.state = CameraState::Ready;
        }

        self.switching.store(false, Ordering::SeqCst);
        result
    }

    async fn attach_new_stream(
        &self,
        facing_mode: FacingMode,
        include_audio: bool,
        target: &RenderTarget,
    ) -> Option<SharedStream> {
        let request = StreamRequest {
            facing_mode,
            include_audio,
        };
        let stream = match self.devices.open_stream(request).await {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!("Failed to open {:?} camera: {}", facing_mode, e);
                return None;
            }
        };

        if let Err(e) = self.engine.initialize(stream.clone(), target).await {
            tracing::error!("Failed to re-initialize AR engine: {}", e);
            self.devices.release(&stream);
            return None;
        }

        Some(stream)
    }

    /// Restart the active AR effect without touching the camera stream.
    ///
    /// Failure is logged and reported as `false`; it is never fatal.
    pub async fn reload_lens(&self) -> bool {
        if !self.is_ready() {
            tracing::warn!("Cannot reload lens - camera not ready");
            return false;
        }

        match self.engine.reload_effect().await {
            Ok(()) => {
                tracing::info!("Lens reloaded");
                true
            }
            Err(e) => {
                tracing::warn!("Lens reload failed: {}", e);
                false
            }
        }
    }

    /// Re-attach the current stream to the render target.
    ///
    /// Idempotent: a no-op beyond re-binding when already ready.
    pub fn restore_feed(&self) -> bool {
        let target = {
            let inner = self.inner.read();
            if inner.state != CameraState::Ready {
                tracing::debug!("Skipping feed restore in state {:?}", inner.state);
                return false;
            }
            match inner.render_target.clone() {
                Some(target) => target,
                None => return false,
            }
        };

        match self.engine.rebind(&target) {
            Ok(()) => {
                tracing::debug!("Camera feed re-bound to {}", target.id);
                true
            }
            Err(e) => {
                tracing::warn!("Failed to restore camera feed: {}", e);
                false
            }
        }
    }
}
