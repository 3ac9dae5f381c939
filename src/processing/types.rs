//! Processing types and configuration
//!
//! This module defines the types used for normalizing a raw capture,
//! progress tracking, and error handling.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

/// Output container options
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Mp4,
    Webm,
}

impl OutputFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "mp4",
            OutputFormat::Webm => "webm",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "video/mp4",
            OutputFormat::Webm => "video/webm",
        }
    }

    /// Get the FFmpeg video codec for this format
    pub fn video_codec(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "libx264",
            OutputFormat::Webm => "libvpx-vp9",
        }
    }

    pub fn audio_codec(&self) -> &'static str {
        match self {
            OutputFormat::Mp4 => "aac",
            OutputFormat::Webm => "libopus",
        }
    }
}

/// Encoding quality levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingQuality {
    Low,
    #[default]
    Medium,
    High,
}

impl ProcessingQuality {
    /// Get the CRF value for H.264/VP9 encoding
    /// Lower values = higher quality, larger files
    pub fn crf(&self) -> u8 {
        match self {
            ProcessingQuality::Low => 28,
            ProcessingQuality::Medium => 23,
            ProcessingQuality::High => 18,
        }
    }

    /// Get the FFmpeg preset for H.264 encoding
    pub fn h264_preset(&self) -> &'static str {
        match self {
            ProcessingQuality::Low => "faster",
            ProcessingQuality::Medium => "medium",
            ProcessingQuality::High => "slow",
        }
    }
}

/// Normalization options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProcessingOptions {
    /// Output container
    pub format: OutputFormat,
    /// Quality level
    pub quality: ProcessingQuality,
    /// FFmpeg executable (name on PATH or absolute path)
    pub ffmpeg_path: String,
    /// Duration assumed for progress estimation when none is declared
    pub fallback_duration_secs: u64,
    /// Audio bitrate passed to FFmpeg
    pub audio_bitrate: String,
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Mp4,
            quality: ProcessingQuality::Medium,
            ffmpeg_path: "ffmpeg".to_string(),
            fallback_duration_secs: 5,
            audio_bitrate: "128k".to_string(),
        }
    }
}

impl ProcessingOptions {
    /// Declared duration, or the fallback when the capture reported none
    pub fn effective_duration(&self, declared_seconds: u64) -> u64 {
        if declared_seconds == 0 {
            self.fallback_duration_secs.max(1)
        } else {
            declared_seconds
        }
    }
}

/// Processing progress stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ProcessingStage {
    /// Setting up the encoder
    Preparing,
    /// Staging the raw capture
    Loading,
    /// Encoding video frames
    Encoding,
    /// Finalizing output file
    Finalizing,
    /// Processing completed successfully
    Complete,
}

/// Processing progress information
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingProgress {
    /// Progress percentage (0 to 100)
    pub percent: u8,
    /// Current stage
    pub stage: ProcessingStage,
    /// Human-readable status
    pub message: String,
}

impl ProcessingProgress {
    pub fn preparing() -> Self {
        Self {
            percent: 0,
            stage: ProcessingStage::Preparing,
            message: "Preparing video...".to_string(),
        }
    }

    pub fn loading() -> Self {
        Self {
            percent: 5,
            stage: ProcessingStage::Loading,
            message: "Loading video...".to_string(),
        }
    }

    /// Encoding progress from encoded media time against the expected total
    pub fn encoding(encoded_ms: u64, total_ms: u64) -> Self {
        let percent = if total_ms > 0 {
            let ratio = (encoded_ms as f64 / total_ms as f64).min(1.0);
            10 + (ratio * 85.0) as u8
        } else {
            10
        };
        Self {
            percent,
            stage: ProcessingStage::Encoding,
            message: format!("Converting video... {}%", percent),
        }
    }

    pub fn finalizing() -> Self {
        Self {
            percent: 95,
            stage: ProcessingStage::Finalizing,
            message: "Finalizing video...".to_string(),
        }
    }

    pub fn complete() -> Self {
        Self {
            percent: 100,
            stage: ProcessingStage::Complete,
            message: "Video ready!".to_string(),
        }
    }
}

/// A normalized video ready for sharing or download
#[derive(Debug, Clone)]
pub struct FinalizedFile {
    pub data: Arc<[u8]>,
    pub mime_type: String,
    pub file_name: String,
}

impl FinalizedFile {
    pub fn new(data: Vec<u8>, format: OutputFormat, file_name: impl Into<String>) -> Self {
        Self {
            data: Arc::from(data),
            mime_type: format.mime_type().to_string(),
            file_name: file_name.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Processing errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("Raw capture is empty")]
    EmptyCapture,

    #[error("Processing ended without a result")]
    Interrupted,

    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<std::io::Error> for ProcessingError {
    fn from(e: std::io::Error) -> Self {
        ProcessingError::Io(e.to_string())
    }
}
