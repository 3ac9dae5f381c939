//! Video processing pipeline
//!
//! Turns a raw capture into a finalized, platform-compatible file. Each run
//! is a [`ProcessingJob`] backed by a finite event stream that ends with
//! exactly one terminal event.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

use super::handoff::{download_file_name, ShareOutcome, ShareSurface};
use super::types::{FinalizedFile, ProcessingError, ProcessingOptions, ProcessingProgress};
use crate::recorder::RawCapture;

/// Converts raw capture bytes into the configured output container
#[async_trait]
pub trait VideoNormalizer: Send + Sync {
    /// Normalize `raw`, reporting progress as encoding advances.
    ///
    /// `duration_secs` is the expected media length used for progress
    /// estimation. The capture must not be modified.
    async fn normalize(
        &self,
        raw: &RawCapture,
        duration_secs: u64,
        options: &ProcessingOptions,
        progress: &ProgressReporter,
    ) -> Result<Vec<u8>, ProcessingError>;
}

/// Events emitted by a processing job
#[derive(Debug, Clone)]
pub enum ProcessingEvent {
    Progress(ProcessingProgress),
    /// Terminal: output ready
    Completed(FinalizedFile),
    /// Terminal: job failed
    Failed(ProcessingError),
}

impl ProcessingEvent {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ProcessingEvent::Progress(_))
    }
}

/// Sending half of a job's event stream.
///
/// Never lets the reported percentage go backwards.
pub struct ProgressReporter {
    tx: mpsc::UnboundedSender<ProcessingEvent>,
    last: Mutex<Option<ProcessingProgress>>,
}

impl ProgressReporter {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ProcessingEvent>) -> Self {
        Self {
            tx,
            last: Mutex::new(None),
        }
    }

    /// Report progress. Regressions and exact repeats are dropped.
    pub fn report(&self, progress: ProcessingProgress) {
        let mut last = self.last.lock();
        if let Some(previous) = last.as_ref() {
            if progress.percent < previous.percent || *previous == progress {
                return;
            }
        }
        *last = Some(progress.clone());
        // A dropped job means nobody is listening
        let _ = self.tx.send(ProcessingEvent::Progress(progress));
    }

    /// Last reported percentage
    pub fn percent(&self) -> u8 {
        self.last.lock().as_ref().map(|p| p.percent).unwrap_or(0)
    }

    fn finish(self, result: Result<FinalizedFile, ProcessingError>) {
        let event = match result {
            Ok(file) => ProcessingEvent::Completed(file),
            Err(e) => ProcessingEvent::Failed(e),
        };
        let _ = self.tx.send(event);
    }
}

/// Handle to one processing run. Never reused across attempts.
///
/// Dropping the handle does not abort the work; its result is discarded.
pub struct ProcessingJob {
    id: Uuid,
    events: mpsc::UnboundedReceiver<ProcessingEvent>,
    progress_percent: u8,
    status_message: String,
    error: Option<ProcessingError>,
    output: Option<FinalizedFile>,
    finished: bool,
}

impl ProcessingJob {
    fn new(events: mpsc::UnboundedReceiver<ProcessingEvent>) -> Self {
        Self {
            id: Uuid::new_v4(),
            events,
            progress_percent: 0,
            status_message: String::new(),
            error: None,
            output: None,
            finished: false,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn progress_percent(&self) -> u8 {
        self.progress_percent
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn error(&self) -> Option<&ProcessingError> {
        self.error.as_ref()
    }

    pub fn output(&self) -> Option<&FinalizedFile> {
        self.output.as_ref()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Next event, applied to the job's fields. `None` after the terminal
    /// event. A stream that closes early yields `Failed(Interrupted)`.
    pub async fn next_event(&mut self) -> Option<ProcessingEvent> {
        if self.finished {
            return None;
        }

        let event = self
            .events
            .recv()
            .await
            .unwrap_or(ProcessingEvent::Failed(ProcessingError::Interrupted));

        match &event {
            ProcessingEvent::Progress(progress) => {
                self.progress_percent = progress.percent;
                self.status_message = progress.message.clone();
            }
            ProcessingEvent::Completed(file) => {
                self.finished = true;
                self.progress_percent = 100;
                self.output = Some(file.clone());
            }
            ProcessingEvent::Failed(e) => {
                self.finished = true;
                self.status_message = format!("Processing failed: {}", e);
                self.error = Some(e.clone());
            }
        }

        Some(event)
    }

    /// Drain the stream and return the outcome
    pub async fn wait(mut self) -> Result<FinalizedFile, ProcessingError> {
        while self.next_event().await.is_some() {}
        match (self.output.take(), self.error.take()) {
            (Some(file), _) => Ok(file),
            (None, Some(e)) => Err(e),
            (None, None) => Err(ProcessingError::Interrupted),
        }
    }
}

/// Normalizes captures and hands finished files to the share surface
pub struct VideoProcessor {
    normalizer: Arc<dyn VideoNormalizer>,
    share: Arc<dyn ShareSurface>,
    options: ProcessingOptions,
}

impl VideoProcessor {
    pub fn new(
        normalizer: Arc<dyn VideoNormalizer>,
        share: Arc<dyn ShareSurface>,
        options: ProcessingOptions,
    ) -> Self {
        Self {
            normalizer,
            share,
            options,
        }
    }

    pub fn options(&self) -> &ProcessingOptions {
        &self.options
    }

    /// Spawn a processing run for `raw` and return its handle
    pub fn start_job(&self, raw: RawCapture, declared_duration_secs: u64) -> ProcessingJob {
        let (tx, rx) = mpsc::unbounded_channel();
        let job = ProcessingJob::new(rx);
        let reporter = ProgressReporter::new(tx);
        let normalizer = self.normalizer.clone();
        let options = self.options.clone();
        let job_id = job.id;

        tokio::spawn(async move {
            let result = run_job(
                normalizer.as_ref(),
                &options,
                &raw,
                declared_duration_secs,
                &reporter,
            )
            .await;
            match &result {
                Ok(file) => tracing::info!("Job {} produced {} bytes", job_id, file.len()),
                Err(e) => tracing::error!("Job {} failed: {}", job_id, e),
            }
            reporter.finish(result);
        });

        job
    }

    /// Normalize `raw`, calling `on_progress` for every progress update.
    ///
    /// The reported percentages are non-decreasing and end at 100 on success.
    pub async fn process_video<F>(
        &self,
        raw: &RawCapture,
        declared_duration_secs: u64,
        mut on_progress: F,
    ) -> Result<FinalizedFile, ProcessingError>
    where
        F: FnMut(&ProcessingProgress),
    {
        let mut job = self.start_job(raw.clone(), declared_duration_secs);
        while let Some(event) = job.next_event().await {
            if let ProcessingEvent::Progress(progress) = &event {
                on_progress(progress);
            }
        }
        job.wait().await
    }

    /// Offer `file` to the native share surface.
    ///
    /// `false` means the caller should fall back to download.
    pub async fn share_video(&self, file: &FinalizedFile) -> bool {
        if !self.share.can_share(file) {
            tracing::info!("Native sharing not available for {}", file.mime_type);
            return false;
        }

        match self.share.share(file).await {
            Ok(ShareOutcome::Shared) => {
                tracing::info!("Shared {}", file.file_name);
                true
            }
            Ok(ShareOutcome::Cancelled) => {
                tracing::info!("Share cancelled by user");
                false
            }
            Ok(ShareOutcome::Unavailable) => {
                tracing::info!("Share surface unavailable");
                false
            }
            Err(e) => {
                tracing::warn!("Share failed: {}", e);
                false
            }
        }
    }
}

async fn run_job(
    normalizer: &dyn VideoNormalizer,
    options: &ProcessingOptions,
    raw: &RawCapture,
    declared_duration_secs: u64,
    reporter: &ProgressReporter,
) -> Result<FinalizedFile, ProcessingError> {
    reporter.report(ProcessingProgress::preparing());

    if raw.is_empty() {
        return Err(ProcessingError::EmptyCapture);
    }

    let duration = options.effective_duration(declared_duration_secs);
    tracing::info!(
        "Processing {} bytes of {} ({}s, declared {}s)",
        raw.len(),
        raw.mime_type,
        duration,
        declared_duration_secs
    );

    let data = normalizer.normalize(raw, duration, options, reporter).await?;
    if data.is_empty() {
        return Err(ProcessingError::Encoding("Normalizer produced no data".to_string()));
    }

    reporter.report(ProcessingProgress::finalizing());
    let file = FinalizedFile::new(
        data,
        options.format,
        download_file_name(options.format.mime_type()),
    );
    reporter.report(ProcessingProgress::complete());

    Ok(file)
}
