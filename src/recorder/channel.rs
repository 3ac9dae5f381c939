//! Recording channel contract
//!
//! A channel turns a capture surface (plus optional audio) into encoded bytes.
//! In a browser this is the media recorder; natively it is whatever encoder
//! the host wires in.

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::{CaptureSurface, SharedStream};

/// Recording errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordingError {
    #[error("Recording already in progress")]
    AlreadyRecording,

    #[error("Not currently recording")]
    NotRecording,

    #[error("Recording is still being finalized")]
    Busy,

    #[error("No capture surface available")]
    NoCaptureSurface,

    #[error("Recording produced no data")]
    EmptyCapture,

    #[error("Recording channel error: {0}")]
    Channel(String),
}

pub type RecordingResult<T> = Result<T, RecordingError>;

/// Encoded bytes handed back when a channel finishes
#[derive(Debug, Clone)]
pub struct ChannelOutput {
    pub data: Vec<u8>,
    /// Container MIME type, e.g. `video/webm;codecs=vp8,opus`
    pub mime_type: String,
}

/// A capture encoder bound to one surface and an optional audio source
#[async_trait]
pub trait RecordingChannel: Send + Sync {
    /// Channel identifier for logs
    fn id(&self) -> &str;

    /// Begin encoding frames from `surface`, mixing in `audio` if given
    fn start(&self, surface: &CaptureSurface, audio: Option<SharedStream>) -> RecordingResult<()>;

    /// Stop encoding and return everything captured since `start`
    async fn stop(&self) -> RecordingResult<ChannelOutput>;
}
