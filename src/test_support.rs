//! In-memory collaborators for unit tests

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::capture::{
    ArEngine, CaptureSurface, DeviceError, EngineError, FacingMode, MediaDevices, MediaStream,
    PermissionStatus, RenderTarget, SharedStream, StreamRequest, TrackInfo, TrackKind,
};
use crate::processing::{
    DownloadSink, FinalizedFile, HandoffError, ProcessingError, ProcessingOptions,
    ProcessingProgress, ProgressReporter, ShareOutcome, ShareSurface, VideoNormalizer,
};
use crate::recorder::{ChannelOutput, RawCapture, RecordingChannel, RecordingError, RecordingResult};
use crate::session::events::EventSink;

pub fn surface(width: u32, height: u32) -> CaptureSurface {
    CaptureSurface {
        id: "canvas".to_string(),
        width,
        height,
    }
}

#[derive(Debug)]
pub struct FakeStream {
    id: String,
    tracks: Mutex<Vec<TrackInfo>>,
}

impl FakeStream {
    pub fn new(id: impl Into<String>, tracks: Vec<TrackInfo>) -> Self {
        Self {
            id: id.into(),
            tracks: Mutex::new(tracks),
        }
    }
}

impl MediaStream for FakeStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn tracks(&self) -> Vec<TrackInfo> {
        self.tracks.lock().clone()
    }
}

pub struct FakeDevices {
    secure: bool,
    microphone: bool,
    permission: Mutex<PermissionStatus>,
    open_failures: Mutex<VecDeque<DeviceError>>,
    opened: Mutex<Vec<StreamRequest>>,
    released: Mutex<Vec<String>>,
    counter: AtomicUsize,
}

impl FakeDevices {
    pub fn new() -> Self {
        Self {
            secure: true,
            microphone: true,
            permission: Mutex::new(PermissionStatus::Granted),
            open_failures: Mutex::new(VecDeque::new()),
            opened: Mutex::new(Vec::new()),
            released: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
        }
    }

    pub fn insecure(mut self) -> Self {
        self.secure = false;
        self
    }

    pub fn without_microphone(mut self) -> Self {
        self.microphone = false;
        self
    }

    pub fn with_permission(self, status: PermissionStatus) -> Self {
        *self.permission.lock() = status;
        self
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        *self.permission.lock() = status;
    }

    pub fn fail_next_open(&self, error: DeviceError) {
        self.open_failures.lock().push_back(error);
    }

    pub fn opened(&self) -> Vec<StreamRequest> {
        self.opened.lock().clone()
    }

    pub fn released(&self) -> Vec<String> {
        self.released.lock().clone()
    }
}

#[async_trait]
impl MediaDevices for FakeDevices {
    fn is_secure_context(&self) -> bool {
        self.secure
    }

    async fn query_permission(&self) -> Result<PermissionStatus, DeviceError> {
        Ok(*self.permission.lock())
    }

    async fn request_permission(&self) -> Result<PermissionStatus, DeviceError> {
        Ok(*self.permission.lock())
    }

    async fn open_stream(&self, request: StreamRequest) -> Result<SharedStream, DeviceError> {
        if let Some(error) = self.open_failures.lock().pop_front() {
            return Err(error);
        }
        if *self.permission.lock() == PermissionStatus::Denied {
            return Err(DeviceError::PermissionDenied);
        }

        self.opened.lock().push(request);
        let n = self.counter.fetch_add(1, Ordering::SeqCst);

        let camera = match request.facing_mode {
            FacingMode::Front => "Front Camera",
            FacingMode::Back => "Back Camera",
        };
        let mut tracks = vec![TrackInfo::live(TrackKind::Video, camera)];
        if request.include_audio && self.microphone {
            tracks.push(TrackInfo::live(TrackKind::Audio, "Microphone"));
        }

        Ok(Arc::new(FakeStream::new(format!("stream-{}", n), tracks)))
    }

    fn release(&self, stream: &SharedStream) {
        self.released.lock().push(stream.id().to_string());
    }
}

pub struct FakeEngine {
    init_failure: Mutex<Option<EngineError>>,
    reload_failure: Mutex<Option<EngineError>>,
    reload_delay: Duration,
    init_delay: Duration,
    initialized: AtomicBool,
    init_count: AtomicUsize,
    reload_count: AtomicUsize,
    rebind_count: AtomicUsize,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self {
            init_failure: Mutex::new(None),
            reload_failure: Mutex::new(None),
            reload_delay: Duration::ZERO,
            init_delay: Duration::ZERO,
            initialized: AtomicBool::new(false),
            init_count: AtomicUsize::new(0),
            reload_count: AtomicUsize::new(0),
            rebind_count: AtomicUsize::new(0),
        }
    }

    pub fn with_reload_delay(mut self, delay: Duration) -> Self {
        self.reload_delay = delay;
        self
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn fail_init(&self, error: EngineError) {
        *self.init_failure.lock() = Some(error);
    }

    pub fn fail_reload(&self, error: EngineError) {
        *self.reload_failure.lock() = Some(error);
    }

    pub fn init_count(&self) -> usize {
        self.init_count.load(Ordering::SeqCst)
    }

    pub fn reload_count(&self) -> usize {
        self.reload_count.load(Ordering::SeqCst)
    }

    pub fn rebind_count(&self) -> usize {
        self.rebind_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ArEngine for FakeEngine {
    async fn initialize(&self, _stream: SharedStream, _target: &RenderTarget) -> Result<(), EngineError> {
        self.init_count.fetch_add(1, Ordering::SeqCst);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        if let Some(error) = self.init_failure.lock().clone() {
            return Err(error);
        }
        self.initialized.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn reload_effect(&self) -> Result<(), EngineError> {
        self.reload_count.fetch_add(1, Ordering::SeqCst);
        if !self.reload_delay.is_zero() {
            tokio::time::sleep(self.reload_delay).await;
        }
        match self.reload_failure.lock().clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn rebind(&self, _target: &RenderTarget) -> Result<(), EngineError> {
        self.rebind_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn output_surface(&self) -> Option<CaptureSurface> {
        self.initialized
            .load(Ordering::SeqCst)
            .then(|| surface(1280, 720))
    }
}

pub struct FakeChannel {
    payload: Vec<u8>,
    mime_type: String,
    stop_delay: Duration,
    stop_failure: Mutex<Option<String>>,
    start_count: AtomicUsize,
    stop_count: AtomicUsize,
}

impl FakeChannel {
    pub fn new() -> Self {
        Self {
            payload: b"webm-bytes".repeat(8),
            mime_type: "video/webm;codecs=vp8,opus".to_string(),
            stop_delay: Duration::ZERO,
            stop_failure: Mutex::new(None),
            start_count: AtomicUsize::new(0),
            stop_count: AtomicUsize::new(0),
        }
    }

    pub fn with_stop_delay(mut self, delay: Duration) -> Self {
        self.stop_delay = delay;
        self
    }

    pub fn fail_stop(&self, message: &str) {
        *self.stop_failure.lock() = Some(message.to_string());
    }

    pub fn payload_len(&self) -> usize {
        self.payload.len()
    }

    pub fn start_count(&self) -> usize {
        self.start_count.load(Ordering::SeqCst)
    }

    pub fn stop_count(&self) -> usize {
        self.stop_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecordingChannel for FakeChannel {
    fn id(&self) -> &str {
        "fake"
    }

    fn start(&self, _surface: &CaptureSurface, _audio: Option<SharedStream>) -> RecordingResult<()> {
        self.start_count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> RecordingResult<ChannelOutput> {
        self.stop_count.fetch_add(1, Ordering::SeqCst);
        if !self.stop_delay.is_zero() {
            tokio::time::sleep(self.stop_delay).await;
        }
        if let Some(message) = self.stop_failure.lock().clone() {
            return Err(RecordingError::Channel(message));
        }
        Ok(ChannelOutput {
            data: self.payload.clone(),
            mime_type: self.mime_type.clone(),
        })
    }
}

/// Reports encoding progress at the given media times (ms), then succeeds
/// or fails.
pub struct FakeNormalizer {
    steps: Vec<u64>,
    step_delay: Duration,
    failure: Option<String>,
    calls: AtomicUsize,
    completed: AtomicUsize,
    last_duration: Mutex<Option<u64>>,
}

impl FakeNormalizer {
    pub fn new() -> Self {
        Self {
            steps: vec![0, 1000, 2000],
            step_delay: Duration::ZERO,
            failure: None,
            calls: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
            last_duration: Mutex::new(None),
        }
    }

    pub fn with_steps(mut self, steps: Vec<u64>) -> Self {
        self.steps = steps;
        self
    }

    pub fn with_step_delay(mut self, delay: Duration) -> Self {
        self.step_delay = delay;
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn last_duration(&self) -> Option<u64> {
        *self.last_duration.lock()
    }
}

#[async_trait]
impl VideoNormalizer for FakeNormalizer {
    async fn normalize(
        &self,
        raw: &RawCapture,
        duration_secs: u64,
        _options: &ProcessingOptions,
        progress: &ProgressReporter,
    ) -> Result<Vec<u8>, ProcessingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_duration.lock() = Some(duration_secs);

        for step in &self.steps {
            if !self.step_delay.is_zero() {
                tokio::time::sleep(self.step_delay).await;
            }
            progress.report(ProcessingProgress::encoding(*step, duration_secs * 1000));
        }
        self.completed.fetch_add(1, Ordering::SeqCst);

        if let Some(message) = &self.failure {
            return Err(ProcessingError::Encoding(message.clone()));
        }

        let mut out = b"mp4:".to_vec();
        out.extend_from_slice(&raw.data);
        Ok(out)
    }
}

pub struct FakeShare {
    outcome: Mutex<ShareOutcome>,
    shared: AtomicUsize,
}

impl FakeShare {
    pub fn new(outcome: ShareOutcome) -> Self {
        Self {
            outcome: Mutex::new(outcome),
            shared: AtomicUsize::new(0),
        }
    }

    pub fn set_outcome(&self, outcome: ShareOutcome) {
        *self.outcome.lock() = outcome;
    }

    pub fn shared_count(&self) -> usize {
        self.shared.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ShareSurface for FakeShare {
    fn can_share(&self, _file: &FinalizedFile) -> bool {
        *self.outcome.lock() != ShareOutcome::Unavailable
    }

    async fn share(&self, _file: &FinalizedFile) -> Result<ShareOutcome, HandoffError> {
        let outcome = *self.outcome.lock();
        if outcome == ShareOutcome::Shared {
            self.shared.fetch_add(1, Ordering::SeqCst);
        }
        Ok(outcome)
    }
}

#[derive(Default)]
pub struct MemoryDownloads {
    saved: Mutex<Vec<(String, Vec<u8>)>>,
    failures: Mutex<VecDeque<String>>,
}

impl MemoryDownloads {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn saved(&self) -> Vec<(String, Vec<u8>)> {
        self.saved.lock().clone()
    }

    /// Queue a failure for the next save that has none queued ahead of it
    pub fn fail_next_save(&self, message: &str) {
        self.failures.lock().push_back(message.to_string());
    }
}

#[async_trait]
impl DownloadSink for MemoryDownloads {
    async fn save(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, HandoffError> {
        if let Some(message) = self.failures.lock().pop_front() {
            return Err(HandoffError::Io(message));
        }
        self.saved.lock().push((file_name.to_string(), data.to_vec()));
        Ok(PathBuf::from(file_name))
    }
}

#[derive(Default)]
pub struct RecordingEventSink {
    events: Mutex<Vec<(String, Map<String, Value>)>>,
}

impl RecordingEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&self) -> Vec<String> {
        self.events.lock().iter().map(|(n, _)| n.clone()).collect()
    }

    /// Metadata of the most recent event with this name
    pub fn find(&self, name: &str) -> Option<Map<String, Value>> {
        self.events
            .lock()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.clone())
    }
}

impl EventSink for RecordingEventSink {
    fn record(&self, name: &str, metadata: Map<String, Value>) {
        self.events.lock().push((name.to_string(), metadata));
    }
}
