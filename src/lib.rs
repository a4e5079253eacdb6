//! camera2-session: capture session lifecycle for a platform camera service
//!
//! This crate opens a camera device, negotiates a capture format against the
//! device's declared capabilities, configures a capture session with a
//! texture-backed preview output, runs a repeating capture request and relays
//! frames with the correct rotation and transform. Every failure path funnels
//! into one teardown.
//!
//! # Features
//! - Capture format negotiation (size by area, fps range by bound distance)
//! - Stabilization and focus mode selection
//! - Single-outcome creation callbacks
//! - Camera-thread confinement with a command-queue actor
//! - Flash toggling and still capture on a running session
//!
//! # Usage
//! ```rust,ignore
//! use camera2_session::{CameraThread, SessionOptions, SessionRequest};
//!
//! let thread = CameraThread::spawn("camera-thread", manager)?;
//! let request = SessionRequest::new("0", 1280, 720, 30);
//! let session = thread
//!     .open_session(request, SessionOptions::default(), helper, events)
//!     .await?;
//! session.set_flash(true).await?;
//! session.stop().await?;
//! ```
pub mod config;
pub mod errors;
pub mod invariant_ppt;
pub mod session;
pub mod timing;
pub mod types;

// Testing utilities - fake camera backend for offline testing
pub mod testing;

pub use config::CameraSessionConfig;
pub use errors::{CameraError, ErrorKind};
pub use session::{
    Camera2Session, CameraEvents, CameraThread, CreateSessionCallback, FlashOutcome,
    SessionHandle, SessionId, SessionOptions, SessionRequest, SessionState,
};
pub use timing::SessionStats;
pub use types::{CameraCapabilities, CaptureFormat, FramerateRange, Size};

/// Initialize logging for the camera session library
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camera2_session=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
    }
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "camera2-session");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }

    #[test]
    fn test_init_logging_is_repeatable() {
        init_logging();
        init_logging();
    }
}
