//! Session orchestrator
//!
//! Composes the camera manager, recording coordinator, and video processor
//! into the single lifecycle the presentation layer drives. Every sequence
//! re-checks state after each await, since the user may act while a step is
//! suspended.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use super::config::SessionConfig;
use super::events::{AnalyticsEvent, EventSink, LogSink};
use crate::capture::{
    ArEngine, CameraErrorInfo, CameraErrorKind, CameraManager, CameraState, FacingMode,
    MediaDevices, RenderTarget, SharedStream,
};
use crate::processing::{
    download_file_name, DownloadSink, ProcessingError, ProcessingEvent, ShareSurface,
    VideoNormalizer, VideoProcessor,
};
use crate::recorder::{
    format_time, RawCapture, RecordingChannel, RecordingCoordinator, RecordingError,
    RecordingState, StopOutcome, ToggleOutcome,
};
use crate::utils::error::{AppError, AppResult};

/// Render target id the engine draws the camera feed into
pub const FEED_TARGET: &str = "camera-feed";

/// External collaborators a session is wired to
#[derive(Clone)]
pub struct SessionCollaborators {
    pub devices: Arc<dyn MediaDevices>,
    pub engine: Arc<dyn ArEngine>,
    pub channel: Arc<dyn RecordingChannel>,
    pub normalizer: Arc<dyn VideoNormalizer>,
    pub share: Arc<dyn ShareSurface>,
    pub downloads: Arc<dyn DownloadSink>,
    pub events: Arc<dyn EventSink>,
    pub log: Arc<dyn LogSink>,
}

/// Status of the processing overlay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStatus {
    pub percent: u8,
    pub message: String,
    pub error: Option<String>,
}

/// How a finished recording reached the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum DeliveryOutcome {
    /// Handed to the native share surface
    Shared,
    /// Share unavailable or cancelled; the processed file was saved
    Downloaded { path: PathBuf },
    /// Processing failed; the original capture was saved instead
    RawDownloaded { path: PathBuf, error: String },
    /// The user dismissed processing; the result was discarded
    Cancelled,
}

/// Everything the presentation layer renders from
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub camera_state: CameraState,
    pub facing_mode: FacingMode,
    pub camera_error: Option<CameraErrorInfo>,
    pub recording_state: RecordingState,
    pub elapsed_seconds: u64,
    pub formatted_time: String,
    pub has_recording: bool,
    pub preview_visible: bool,
    pub auto_share: bool,
    pub processing: Option<ProcessingStatus>,
}

#[derive(Debug, Default)]
struct UiState {
    preview_visible: bool,
    auto_share: bool,
    processing: Option<ProcessingStatus>,
    /// Job whose events are still being acted on
    active_job: Option<Uuid>,
}

/// Drives one AR capture session
pub struct SessionOrchestrator {
    id: Uuid,
    config: SessionConfig,
    camera: CameraManager,
    recorder: RecordingCoordinator,
    processor: VideoProcessor,
    downloads: Arc<dyn DownloadSink>,
    events: Arc<dyn EventSink>,
    log: Arc<dyn LogSink>,
    ui: RwLock<UiState>,
    /// Set while a pre-recording sequence is suspended
    starting: AtomicBool,
    /// Bumped by every scheduled feed restore; only the latest one runs
    restore_generation: AtomicU64,
}

impl SessionOrchestrator {
    pub fn new(config: SessionConfig, collaborators: SessionCollaborators) -> Self {
        let camera = CameraManager::new(
            collaborators.devices,
            collaborators.engine,
            config.initial_facing,
        );
        let recorder = RecordingCoordinator::new(collaborators.channel)
            .with_min_duration(config.min_recording_secs)
            .with_min_surface(config.min_surface_width, config.min_surface_height);
        let processor = VideoProcessor::new(
            collaborators.normalizer,
            collaborators.share,
            config.processing.clone(),
        );

        let ui = UiState {
            auto_share: config.auto_share,
            ..Default::default()
        };

        Self {
            id: Uuid::new_v4(),
            config,
            camera,
            recorder,
            processor,
            downloads: collaborators.downloads,
            events: collaborators.events,
            log: collaborators.log,
            ui: RwLock::new(ui),
            starting: AtomicBool::new(false),
            restore_generation: AtomicU64::new(0),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn camera(&self) -> &CameraManager {
        &self.camera
    }

    pub fn recorder(&self) -> &RecordingCoordinator {
        &self.recorder
    }

    /// Log to tracing and the debug log
    fn note(&self, message: &str) {
        tracing::info!("{}", message);
        self.log.append(message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
        self.log.append(message);
    }

    fn emit(&self, event: AnalyticsEvent) {
        let mut metadata = event.metadata();
        metadata.insert("sessionId".to_string(), self.id.to_string().into());
        self.events.record(event.name(), metadata);
    }

    fn camera_error(&self) -> AppError {
        AppError::Camera(self.camera.error_info().unwrap_or_else(|| {
            CameraErrorInfo::new(CameraErrorKind::Unknown, "Camera initialization failed")
        }))
    }

    // -- camera -----------------------------------------------------------

    /// Acquire the camera and start the AR engine.
    ///
    /// A no-op when the camera is already ready.
    pub async fn initialize(&self) -> AppResult<()> {
        match self.camera.state() {
            CameraState::Ready => {
                tracing::debug!("Camera already initialized");
                return Ok(());
            }
            CameraState::Initializing => return Err(AppError::Busy),
            _ => {}
        }

        self.note("Initializing camera");

        if !self.camera.check_permission().await {
            let error = self.camera_error();
            self.warn(&format!("Camera unavailable: {}", error));
            return Err(error);
        }

        let facing = self.camera.facing_mode();
        let stream = match self
            .camera
            .request_stream(facing, self.config.capture_audio)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                self.warn(&format!("Failed to get camera stream: {}", e));
                return Err(self.camera_error());
            }
        };

        self.log_stream_tracks(&stream);

        if !self
            .camera
            .initialize_engine(stream, RenderTarget::new(FEED_TARGET))
            .await
        {
            let error = self.camera_error();
            self.warn(&format!("AR engine failed to start: {}", error));
            return Err(error);
        }

        self.note("Camera ready");
        Ok(())
    }

    fn log_stream_tracks(&self, stream: &SharedStream) {
        let video = stream.video_tracks();
        let audio = stream.audio_tracks();
        self.note(&format!(
            "Stream {}: {} video, {} audio tracks",
            stream.id(),
            video.len(),
            audio.len()
        ));
        if self.config.capture_audio && audio.is_empty() {
            self.warn("No audio tracks in stream - recordings will be silent");
        }
    }

    /// Ask for camera access again from the permission screen
    pub async fn request_permission(&self) -> AppResult<()> {
        if !self.camera.request_permission().await {
            return Err(self.camera_error());
        }
        self.initialize().await
    }

    /// Retry initialization from the error screen
    pub async fn retry(&self) -> AppResult<()> {
        self.initialize().await
    }

    fn ensure_camera_idle(&self) -> AppResult<()> {
        if !self.camera.is_ready() {
            return Err(AppError::CameraNotReady);
        }
        if self.recorder.state() == RecordingState::Recording
            || self.starting.load(Ordering::SeqCst)
        {
            return Err(AppError::Busy);
        }
        Ok(())
    }

    /// Switch between front and back cameras. Refused while recording.
    pub async fn switch_camera(&self) -> AppResult<bool> {
        if let Err(e) = self.ensure_camera_idle() {
            self.warn(&format!("Camera switch refused: {}", e));
            return Err(e);
        }

        let switched = self.camera.switch_camera().await.is_some();
        if switched {
            self.note(&format!(
                "Switched to {:?} camera",
                self.camera.facing_mode()
            ));
        } else {
            self.warn("Camera switch failed");
        }
        Ok(switched)
    }

    /// Manual lens refresh. Refused while recording.
    pub async fn reload_lens(&self) -> AppResult<bool> {
        if let Err(e) = self.ensure_camera_idle() {
            self.warn(&format!("Lens reload refused: {}", e));
            return Err(e);
        }
        Ok(self.camera.reload_lens().await)
    }

    // -- recording --------------------------------------------------------

    /// The record button
    pub async fn toggle_recording(&self) -> AppResult<ToggleOutcome> {
        match self.recorder.state() {
            RecordingState::Idle => {
                self.start_recording().await?;
                Ok(ToggleOutcome::Started)
            }
            RecordingState::Recording => self.stop_recording().await,
            RecordingState::Processing => {
                tracing::debug!("Record button ignored while finalizing");
                Ok(ToggleOutcome::Ignored)
            }
        }
    }

    /// Reload the lens, verify the stream, then start recording.
    pub async fn start_recording(&self) -> AppResult<()> {
        if !self.camera.is_ready() {
            self.warn("Cannot start recording - camera not ready");
            return Err(AppError::CameraNotReady);
        }
        match self.recorder.state() {
            RecordingState::Idle => {}
            RecordingState::Recording => {
                return Err(RecordingError::AlreadyRecording.into());
            }
            RecordingState::Processing => return Err(AppError::Busy),
        }

        if self
            .starting
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("Recording start already pending");
            return Err(AppError::Busy);
        }

        let result = self.run_start_sequence().await;
        self.starting.store(false, Ordering::SeqCst);
        result
    }

    async fn run_start_sequence(&self) -> AppResult<()> {
        // Fresh effect state for every clip
        self.note("Reloading lens before recording");
        if self.camera.reload_lens().await {
            tokio::time::sleep(self.config.lens_settle()).await;
        } else {
            self.warn("Lens reload failed - recording with current effect");
        }

        if !self.camera.is_ready() {
            self.warn("Camera lost while preparing to record");
            return Err(AppError::CameraNotReady);
        }
        if self.recorder.state() != RecordingState::Idle {
            return Err(AppError::Busy);
        }

        let stream = self.camera.stream();
        let has_audio = stream
            .as_ref()
            .map(|s| self.verify_tracks(s))
            .unwrap_or(false);

        let surface = self.camera.capture_surface();
        if let Err(e) = self.recorder.start(surface.as_ref(), stream) {
            self.warn(&format!("Failed to start recording: {}", e));
            return Err(e.into());
        }

        let (width, height) = surface
            .as_ref()
            .map(|s| (s.width, s.height))
            .unwrap_or_default();
        self.note("Recording started");
        self.emit(AnalyticsEvent::RecordingStarted {
            has_audio,
            canvas_width: width,
            canvas_height: height,
        });
        Ok(())
    }

    /// Check the stream's tracks right before recording.
    ///
    /// Only logs; returns whether a usable audio track exists.
    fn verify_tracks(&self, stream: &SharedStream) -> bool {
        let video = stream.video_tracks();
        if !video.iter().any(|t| t.is_usable()) {
            self.warn("No live video track in camera stream");
        }

        let audio = stream.audio_tracks();
        for track in audio.iter().filter(|t| !t.is_usable()) {
            self.warn(&format!(
                "Audio track {} not live (state: {:?}, enabled: {})",
                track.display_label(),
                track.ready_state,
                track.enabled
            ));
        }

        let has_audio = audio.iter().any(|t| t.is_usable());
        if self.config.capture_audio && !has_audio {
            self.warn("No usable audio track - recording will be silent");
        }
        has_audio
    }

    /// Stop recording, enforcing the minimum duration
    pub async fn stop_recording(&self) -> AppResult<ToggleOutcome> {
        let outcome = self.recorder.stop().await?;

        match outcome {
            StopOutcome::TooShort { elapsed_seconds } => {
                self.warn(&format!(
                    "Recording too short ({}s) - minimum {} seconds",
                    elapsed_seconds,
                    self.recorder.min_duration_secs()
                ));
            }
            StopOutcome::Finalized {
                duration_seconds,
                size_bytes,
            } => {
                self.note(&format!(
                    "Recording stopped: {}s, {} bytes",
                    duration_seconds, size_bytes
                ));
                let has_audio = self
                    .recorder
                    .raw_capture()
                    .map(|c| c.has_audio)
                    .unwrap_or(false);
                self.emit(AnalyticsEvent::RecordingCompleted {
                    duration: duration_seconds,
                    has_audio,
                });
                self.after_recording().await;
            }
        }

        Ok(ToggleOutcome::Stopped { outcome })
    }

    async fn after_recording(&self) {
        let auto_share = self.ui.read().auto_share;
        if !auto_share {
            self.ui.write().preview_visible = true;
            return;
        }

        self.note("Auto-share enabled - processing recording");
        if let Err(e) = self.process_and_share().await {
            self.warn(&format!("Auto-share failed: {}", e));
            self.ui.write().preview_visible = true;
        }
    }

    /// Discard the current recording
    pub async fn clear_recording(&self) -> AppResult<()> {
        self.recorder.clear()?;
        {
            let mut ui = self.ui.write();
            ui.preview_visible = false;
            ui.processing = None;
            ui.active_job = None;
        }
        self.note("Recording cleared");
        self.restore_after(self.config.clear_restore_delay_ms).await;
        Ok(())
    }

    // -- processing & handoff ---------------------------------------------

    /// Normalize the recording and offer it to the share surface.
    ///
    /// Falls back to downloading the processed file when sharing is not
    /// possible, and to downloading the original capture when processing
    /// fails.
    pub async fn process_and_share(&self) -> AppResult<DeliveryOutcome> {
        let raw = self.recorder.raw_capture().ok_or(AppError::NoCapture)?;

        if self.ui.read().active_job.is_some() {
            return Err(AppError::Busy);
        }

        let mut job = self
            .processor
            .start_job(raw.clone(), raw.duration_seconds);
        let job_id = job.id();
        {
            let mut ui = self.ui.write();
            ui.active_job = Some(job_id);
            ui.processing = Some(ProcessingStatus {
                percent: 0,
                message: "Preparing video...".to_string(),
                error: None,
            });
        }

        self.emit(AnalyticsEvent::ShareAttempt {
            video_duration: raw.duration_seconds,
            video_format: raw.video_format().to_string(),
        });

        while let Some(event) = job.next_event().await {
            if !self.is_active_job(job_id) {
                tracing::info!("Processing job {} dismissed; discarding result", job_id);
                return Ok(DeliveryOutcome::Cancelled);
            }

            match event {
                ProcessingEvent::Progress(progress) => {
                    if let Some(status) = self.ui.write().processing.as_mut() {
                        status.percent = progress.percent;
                        status.message = progress.message;
                    }
                }
                ProcessingEvent::Completed(file) => {
                    let shared = self.processor.share_video(&file).await;
                    if !self.is_active_job(job_id) {
                        return Ok(DeliveryOutcome::Cancelled);
                    }

                    let outcome = if shared {
                        DeliveryOutcome::Shared
                    } else {
                        self.note("Share unavailable - downloading processed video");
                        match self.downloads.save(&file.file_name, &file.data).await {
                            Ok(path) => DeliveryOutcome::Downloaded { path },
                            Err(e) => {
                                let message = format!("Failed to save processed video: {}", e);
                                self.warn(&message);
                                return self.fall_back_to_raw(&raw, message).await;
                            }
                        }
                    };

                    self.emit(AnalyticsEvent::ShareCompleted {
                        success: shared,
                        video_duration: raw.duration_seconds,
                        video_format: raw.video_format().to_string(),
                    });

                    self.finish_share_cycle(job_id).await;
                    return Ok(outcome);
                }
                ProcessingEvent::Failed(e) => {
                    let message = e.to_string();
                    self.warn(&format!("Video processing failed: {}", message));
                    return self.fall_back_to_raw(&raw, message).await;
                }
            }
        }

        if self.is_active_job(job_id) {
            self.ui.write().active_job = None;
        }
        Err(ProcessingError::Interrupted.into())
    }

    /// Detach from the job, record `message`, and save the original capture
    async fn fall_back_to_raw(&self, raw: &RawCapture, message: String) -> AppResult<DeliveryOutcome> {
        {
            let mut ui = self.ui.write();
            ui.active_job = None;
            if let Some(status) = ui.processing.as_mut() {
                status.error = Some(message.clone());
            }
        }

        self.note("Falling back to original recording");
        let path = self.save_raw(raw).await?;
        Ok(DeliveryOutcome::RawDownloaded {
            path,
            error: message,
        })
    }

    fn is_active_job(&self, job_id: Uuid) -> bool {
        self.ui.read().active_job == Some(job_id)
    }

    async fn finish_share_cycle(&self, job_id: Uuid) {
        tokio::time::sleep(Duration::from_millis(self.config.share_reset_delay_ms)).await;

        {
            let mut ui = self.ui.write();
            if ui.active_job != Some(job_id) {
                return;
            }
            ui.active_job = None;
            ui.processing = None;
            ui.preview_visible = false;
        }

        if let Err(e) = self.recorder.clear() {
            tracing::debug!("Recording not cleared after share: {}", e);
        }
        self.restore_after(0).await;
    }

    /// Save the original capture, unprocessed
    pub async fn download_video(&self) -> AppResult<PathBuf> {
        let raw = self.recorder.raw_capture().ok_or(AppError::NoCapture)?;
        self.save_raw(&raw).await
    }

    async fn save_raw(&self, raw: &RawCapture) -> AppResult<PathBuf> {
        let file_name = download_file_name(&raw.mime_type);
        let path = self.downloads.save(&file_name, &raw.data).await?;

        self.note(&format!("Video downloaded: {}", file_name));
        self.emit(AnalyticsEvent::VideoDownloaded {
            video_duration: raw.duration_seconds,
            video_format: raw.video_format().to_string(),
            file_size: raw.len(),
        });

        self.ui.write().preview_visible = false;
        self.restore_after(self.config.download_restore_delay_ms).await;
        Ok(path)
    }

    /// Dismiss the preview and bring the camera feed back
    pub async fn close_preview(&self) -> bool {
        self.ui.write().preview_visible = false;
        self.restore_after(self.config.dismiss_restore_delay_ms).await
    }

    /// Stop acting on the current job. The work itself runs to completion.
    pub async fn cancel_processing(&self) -> bool {
        {
            let mut ui = self.ui.write();
            if let Some(job_id) = ui.active_job.take() {
                tracing::info!("Processing job {} cancelled", job_id);
            }
            ui.processing = None;
        }
        self.restore_after(self.config.dismiss_restore_delay_ms).await
    }

    pub fn set_auto_share(&self, enabled: bool) {
        self.ui.write().auto_share = enabled;
        tracing::info!("Auto-share {}", if enabled { "enabled" } else { "disabled" });
    }

    // -- recovery ---------------------------------------------------------

    /// App regained focus
    pub async fn on_focus_gained(&self) -> bool {
        self.restore_after(self.config.focus_restore_delay_ms).await
    }

    /// Page visibility changed
    pub async fn on_visibility_changed(&self, visible: bool) -> bool {
        if !visible {
            return false;
        }
        self.restore_after(self.config.visibility_restore_delay_ms).await
    }

    /// Restore the feed after `delay_ms`, unless a later restore was
    /// scheduled in the meantime. Returns whether the feed was re-bound.
    async fn restore_after(&self, delay_ms: u64) -> bool {
        let generation = self.restore_generation.fetch_add(1, Ordering::SeqCst) + 1;

        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }

        if self.restore_generation.load(Ordering::SeqCst) != generation {
            tracing::debug!("Feed restore superseded");
            return false;
        }
        if !self.camera.is_ready() {
            return false;
        }
        self.camera.restore_feed()
    }

    // -- snapshot ---------------------------------------------------------

    pub fn snapshot(&self) -> SessionSnapshot {
        let elapsed_seconds = self.recorder.elapsed_seconds();
        let ui = self.ui.read();
        SessionSnapshot {
            session_id: self.id,
            camera_state: self.camera.state(),
            facing_mode: self.camera.facing_mode(),
            camera_error: self.camera.error_info(),
            recording_state: self.recorder.state(),
            elapsed_seconds,
            formatted_time: format_time(elapsed_seconds),
            has_recording: self.recorder.has_capture(),
            preview_visible: ui.preview_visible,
            auto_share: ui.auto_share,
            processing: ui.processing.clone(),
        }
    }
}
