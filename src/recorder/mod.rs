//! Recording lifecycle module
//!
//! This module implements the record/stop state machine:
//! - RecordingChannel trait for the capture encoder
//! - RecordingCoordinator to drive it and enforce the minimum duration
//! - RawCapture holding the finished bytes

pub mod channel;
pub mod coordinator;
pub mod state;

pub use channel::{ChannelOutput, RecordingChannel, RecordingError, RecordingResult};
pub use coordinator::{RecordingCoordinator, RecordingEvent, MIN_RECORDING_SECS};
pub use state::{format_time, RawCapture, RecordingState, StopOutcome, ToggleOutcome};
