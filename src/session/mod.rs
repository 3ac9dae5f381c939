//! Session orchestration
//!
//! Ties the camera, recorder, and processing pipeline into one lifecycle,
//! with configuration and the analytics/debug-log side channels.

pub mod config;
pub mod events;
pub mod orchestrator;

pub use config::SessionConfig;
pub use events::{
    AnalyticsEvent, DebugLog, DebugLogEntry, EventSink, LogSink, NullEventSink, TracingEventSink,
};
pub use orchestrator::{
    DeliveryOutcome, ProcessingStatus, SessionCollaborators, SessionOrchestrator, SessionSnapshot,
};
