//! Recording coordinator
//!
//! Drives a recording channel through the idle → recording → processing
//! lifecycle, tracks elapsed time, and enforces the minimum clip duration.

use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::channel::{RecordingChannel, RecordingError, RecordingResult};
use super::state::{RawCapture, RecordingState, StopOutcome, ToggleOutcome};
use crate::capture::{CaptureSurface, SharedStream};

/// Default minimum clip length in seconds
pub const MIN_RECORDING_SECS: u64 = 3;

/// Events emitted during recording
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordingEvent {
    /// Recording started
    Started,
    /// Stop refused because the clip is too short
    TooShort(u64),
    /// Recording finalized (duration in seconds)
    Stopped(u64),
    /// Capture discarded
    Cleared,
    /// Error occurred
    Error(String),
}

#[derive(Debug, Default)]
struct RecorderInner {
    state: RecordingState,
    started_at: Option<Instant>,
    /// Elapsed seconds frozen at stop
    frozen_elapsed: u64,
    has_audio: bool,
    raw_capture: Option<RawCapture>,
}

/// Owns the record/stop state machine over one recording channel
pub struct RecordingCoordinator {
    channel: Arc<dyn RecordingChannel>,
    inner: Arc<RwLock<RecorderInner>>,
    min_duration_secs: u64,
    min_surface: (u32, u32),
    event_tx: broadcast::Sender<RecordingEvent>,
}

impl RecordingCoordinator {
    /// Create a new recording coordinator
    pub fn new(channel: Arc<dyn RecordingChannel>) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            channel,
            inner: Arc::new(RwLock::new(RecorderInner::default())),
            min_duration_secs: MIN_RECORDING_SECS,
            min_surface: (640, 480),
            event_tx,
        }
    }

    pub fn with_min_duration(mut self, secs: u64) -> Self {
        self.min_duration_secs = secs;
        self
    }

    /// Resolution below which a low-resolution warning is logged
    pub fn with_min_surface(mut self, width: u32, height: u32) -> Self {
        self.min_surface = (width, height);
        self
    }

    /// Get the current recording state
    pub fn state(&self) -> RecordingState {
        self.inner.read().state
    }

    pub fn min_duration_secs(&self) -> u64 {
        self.min_duration_secs
    }

    /// Subscribe to recording events
    pub fn subscribe(&self) -> broadcast::Receiver<RecordingEvent> {
        self.event_tx.subscribe()
    }

    /// Whole seconds recorded: ticking while recording, frozen otherwise
    pub fn elapsed_seconds(&self) -> u64 {
        let inner = self.inner.read();
        match (inner.state, inner.started_at) {
            (RecordingState::Recording, Some(started)) => started.elapsed().as_secs(),
            _ => inner.frozen_elapsed,
        }
    }

    /// The finalized capture, if any. Cheap: the bytes are shared.
    pub fn raw_capture(&self) -> Option<RawCapture> {
        self.inner.read().raw_capture.clone()
    }

    pub fn has_capture(&self) -> bool {
        self.inner.read().raw_capture.is_some()
    }

    /// Start recording `surface` with optional audio.
    ///
    /// Rejected without any state change unless idle with a surface.
    pub fn start(
        &self,
        surface: Option<&CaptureSurface>,
        audio: Option<SharedStream>,
    ) -> RecordingResult<()> {
        match self.state() {
            RecordingState::Idle => {}
            RecordingState::Recording => return Err(RecordingError::AlreadyRecording),
            RecordingState::Processing => return Err(RecordingError::Busy),
        }

        let Some(surface) = surface else {
            tracing::error!("Capture surface required for recording");
            return Err(RecordingError::NoCaptureSurface);
        };

        let (min_width, min_height) = self.min_surface;
        if surface.is_below(min_width, min_height) {
            tracing::warn!(
                "Capture surface resolution low: {}x{}",
                surface.width,
                surface.height
            );
        }

        let has_audio = log_audio_tracks(audio.as_ref());

        self.channel.start(surface, audio)?;

        {
            let mut inner = self.inner.write();
            if inner.raw_capture.take().is_some() {
                tracing::debug!("Discarding previous capture");
            }
            inner.state = RecordingState::Recording;
            inner.started_at = Some(Instant::now());
            inner.frozen_elapsed = 0;
            inner.has_audio = has_audio;
        }

        let _ = self.event_tx.send(RecordingEvent::Started);
        tracing::info!(
            "Recording started on channel {} ({}x{})",
            self.channel.id(),
            surface.width,
            surface.height
        );
        Ok(())
    }

    /// Stop recording.
    ///
    /// Below the minimum duration the request is refused and recording
    /// continues. Otherwise the state passes through `Processing` while the
    /// channel finalizes, then returns to `Idle` with the capture stored.
    pub async fn stop(&self) -> RecordingResult<StopOutcome> {
        let elapsed = {
            let mut inner = self.inner.write();
            match inner.state {
                RecordingState::Recording => {}
                RecordingState::Processing => return Err(RecordingError::Busy),
                RecordingState::Idle => return Err(RecordingError::NotRecording),
            }

            let elapsed = inner
                .started_at
                .map(|t| t.elapsed().as_secs())
                .unwrap_or(0);
            if elapsed < self.min_duration_secs {
                drop(inner);
                tracing::warn!(
                    "Recording too short ({}s) - minimum {} seconds required",
                    elapsed,
                    self.min_duration_secs
                );
                let _ = self.event_tx.send(RecordingEvent::TooShort(elapsed));
                return Ok(StopOutcome::TooShort {
                    elapsed_seconds: elapsed,
                });
            }

            inner.state = RecordingState::Processing;
            inner.frozen_elapsed = elapsed;
            inner.started_at = None;
            elapsed
        };

        tracing::info!("Stopping recording after {}s", elapsed);

        let result = self.channel.stop().await;

        let mut inner = self.inner.write();
        if inner.state != RecordingState::Processing {
            tracing::warn!("Recorder state changed while finalizing; dropping output");
            return Err(RecordingError::NotRecording);
        }
        inner.state = RecordingState::Idle;

        let output = match result {
            Ok(output) if output.data.is_empty() => {
                drop(inner);
                tracing::error!("Recording produced no data");
                let _ = self
                    .event_tx
                    .send(RecordingEvent::Error(RecordingError::EmptyCapture.to_string()));
                return Err(RecordingError::EmptyCapture);
            }
            Ok(output) => output,
            Err(e) => {
                drop(inner);
                tracing::error!("Failed to finalize recording: {}", e);
                let _ = self.event_tx.send(RecordingEvent::Error(e.to_string()));
                return Err(e);
            }
        };

        let capture = RawCapture::new(output.data, output.mime_type, elapsed, inner.has_audio);
        let size_bytes = capture.len();
        inner.raw_capture = Some(capture);
        drop(inner);

        let _ = self.event_tx.send(RecordingEvent::Stopped(elapsed));
        tracing::info!("Recording finalized: {}s, {} bytes", elapsed, size_bytes);

        Ok(StopOutcome::Finalized {
            duration_seconds: elapsed,
            size_bytes,
        })
    }

    /// Start when idle, stop when recording, ignore while processing
    pub async fn toggle(
        &self,
        surface: Option<&CaptureSurface>,
        audio: Option<SharedStream>,
    ) -> RecordingResult<ToggleOutcome> {
        match self.state() {
            RecordingState::Idle => {
                self.start(surface, audio)?;
                Ok(ToggleOutcome::Started)
            }
            RecordingState::Recording => {
                let outcome = self.stop().await?;
                Ok(ToggleOutcome::Stopped { outcome })
            }
            RecordingState::Processing => {
                tracing::debug!("Toggle ignored while finalizing");
                Ok(ToggleOutcome::Ignored)
            }
        }
    }

    /// Discard the capture and return to a clean idle state
    pub fn clear(&self) -> RecordingResult<()> {
        {
            let mut inner = self.inner.write();
            match inner.state {
                RecordingState::Idle => {}
                RecordingState::Recording => return Err(RecordingError::AlreadyRecording),
                RecordingState::Processing => return Err(RecordingError::Busy),
            }
            *inner = RecorderInner::default();
        }

        let _ = self.event_tx.send(RecordingEvent::Cleared);
        tracing::info!("Recording cleared");
        Ok(())
    }
}

/// Log the audio tracks about to be recorded; returns whether any exist.
fn log_audio_tracks(audio: Option<&SharedStream>) -> bool {
    let Some(stream) = audio else {
        tracing::warn!("No audio stream provided - recording will be silent");
        return false;
    };

    let tracks = stream.audio_tracks();
    if tracks.is_empty() {
        tracing::warn!("Audio stream has no tracks - recording will be silent");
        return false;
    }

    tracing::info!("Audio stream has {} tracks", tracks.len());
    for (i, track) in tracks.iter().enumerate() {
        tracing::debug!(
            "Track {}: {}, state: {:?}, enabled: {}",
            i,
            track.display_label(),
            track.ready_state,
            track.enabled
        );
    }
    true
}
