//! Share and download handoff
//!
//! Collaborator contracts for getting a finished video to the user: a native
//! share surface (optional on most platforms) and a download sink that always
//! works.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

use super::types::FinalizedFile;

/// Handoff errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandoffError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Share failed: {0}")]
    Share(String),
}

impl From<std::io::Error> for HandoffError {
    fn from(e: std::io::Error) -> Self {
        HandoffError::Io(e.to_string())
    }
}

/// How a share attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShareOutcome {
    /// Handed to the OS share sheet
    Shared,
    /// User dismissed the share sheet
    Cancelled,
    /// Platform cannot share this file
    Unavailable,
}

/// Native/OS share surface
#[async_trait]
pub trait ShareSurface: Send + Sync {
    /// Whether the platform can share this file at all
    fn can_share(&self, file: &FinalizedFile) -> bool;

    async fn share(&self, file: &FinalizedFile) -> Result<ShareOutcome, HandoffError>;
}

/// Share surface for platforms without one
#[derive(Debug, Default, Clone, Copy)]
pub struct NoShareSurface;

#[async_trait]
impl ShareSurface for NoShareSurface {
    fn can_share(&self, _file: &FinalizedFile) -> bool {
        false
    }

    async fn share(&self, _file: &FinalizedFile) -> Result<ShareOutcome, HandoffError> {
        Ok(ShareOutcome::Unavailable)
    }
}

/// Direct download destination
#[async_trait]
pub trait DownloadSink: Send + Sync {
    /// Save `data` under `file_name`, returning where it landed
    async fn save(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, HandoffError>;
}

/// Saves downloads into a directory on disk
#[derive(Debug, Clone)]
pub struct DirectoryDownloads {
    dir: PathBuf,
}

impl DirectoryDownloads {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }
}

#[async_trait]
impl DownloadSink for DirectoryDownloads {
    async fn save(&self, file_name: &str, data: &[u8]) -> Result<PathBuf, HandoffError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.dir.join(file_name);
        tokio::fs::write(&path, data).await?;
        tracing::info!("Saved {} bytes to {:?}", data.len(), path);
        Ok(path)
    }
}

/// File extension for a video MIME type
pub fn extension_for_mime(mime_type: &str) -> &'static str {
    if mime_type.contains("mp4") {
        "mp4"
    } else {
        "webm"
    }
}

/// Download file name: `ar-video-<unix millis>.<ext>`
pub fn download_file_name(mime_type: &str) -> String {
    format!(
        "ar-video-{}.{}",
        Utc::now().timestamp_millis(),
        extension_for_mime(mime_type)
    )
}
