//! Video processing module
//!
//! Normalizes finished captures and hands them to the share surface or a
//! download sink.

pub mod ffmpeg;
pub mod handoff;
pub mod pipeline;
pub mod types;

pub use ffmpeg::FfmpegNormalizer;
pub use handoff::{
    download_file_name, DirectoryDownloads, DownloadSink, HandoffError, NoShareSurface,
    ShareOutcome, ShareSurface,
};
pub use pipeline::{ProcessingEvent, ProcessingJob, ProgressReporter, VideoNormalizer, VideoProcessor};
pub use types::{
    FinalizedFile, OutputFormat, ProcessingError, ProcessingOptions, ProcessingProgress,
    ProcessingQuality, ProcessingStage,
};
