//! Netramaya - capture, record, and share AR camera clips.
//!
//! This is the main library crate. It provides the camera and recording
//! lifecycle, the video processing pipeline, and the session orchestrator
//! that ties them together.

pub mod capture;
pub mod processing;
pub mod recorder;
pub mod session;
pub mod utils;

#[cfg(test)]
mod test_support;

pub use session::{SessionCollaborators, SessionConfig, SessionOrchestrator};
pub use utils::error::{AppError, AppResult};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging.
///
/// Honors `RUST_LOG`; defaults to debug output for this crate. Calling it
/// again after a subscriber is installed does nothing.
pub fn init_tracing() {
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "netramaya=debug,netramaya_lib=debug,analytics=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
